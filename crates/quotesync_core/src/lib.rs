//! Core domain logic for quotesync.
//! This crate is the single source of truth for quote store invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod service;
pub mod storage;
pub mod sync;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, SyncConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::conflict::ConflictRecord;
pub use model::quote::{Quote, QuoteId, QuoteValidationError, ALL_CATEGORIES};
pub use remote::{HttpRemoteClient, OfflineRemote, RemoteClient, RemoteError, RemoteResult};
pub use service::notification::{NoticeLevel, Notification};
pub use service::quote_store::{
    Capabilities, Pick, QuoteStore, Resolution, StoreError, StoreResult, EXPORT_FILE_NAME,
    NO_QUOTES_SENTINEL,
};
pub use storage::{KeyValueStore, KvError, MemoryKeyValueStore, SqliteKeyValueStore};
pub use sync::{SyncOutcome, SyncReport, SyncScheduler};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
