//! Transient user-facing notifications emitted by the quote store.

use std::fmt::{Display, Formatter};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

/// One short-lived message for whatever front end is listening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NoticeLevel,
    pub message: String,
    /// Clock time in epoch milliseconds.
    pub at_ms: i64,
}

impl Display for Notification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.message)
    }
}

pub(crate) const MSG_ADD_SYNCED: &str = "Quote added and synced with server!";
pub(crate) const MSG_ADD_LOCAL_ONLY: &str = "Failed to sync quote with server, saved locally.";
pub(crate) const MSG_IMPORT_OK: &str = "Quotes imported successfully!";
pub(crate) const MSG_FETCH_FAILED: &str = "Failed to fetch quotes from server.";
pub(crate) const MSG_SYNC_OK: &str = "Synced with server successfully!";
pub(crate) const MSG_KEPT_LOCAL: &str = "Conflicts resolved: Local versions kept.";
pub(crate) const MSG_KEPT_SERVER: &str = "Conflicts resolved: Server versions kept.";
pub(crate) const MSG_NOTHING_TO_RESOLVE: &str = "No conflicts to resolve.";

pub(crate) fn sync_conflicts_message(count: usize) -> String {
    format!("Synced with server. {count} conflict(s) resolved (server data used).")
}

pub(crate) fn import_unsynced_message(count: usize) -> String {
    format!("{count} imported quote(s) could not be synced with server.")
}
