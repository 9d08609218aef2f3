//! Remote source-of-truth capability.
//!
//! # Responsibility
//! - Define the fetch/register contract used by sync, add and import.
//! - Provide the HTTP implementation and an always-offline implementation.
//!
//! # Invariants
//! - Every `RemoteError` variant means "remote unavailable" to callers;
//!   none of them is fatal for the store.
//! - Fetched quotes always carry an id.

use crate::model::quote::{Quote, QuoteId};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod http;
mod offline;

pub use http::HttpRemoteClient;
pub use offline::OfflineRemote;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Connection, DNS, TLS or timeout failure.
    Transport(String),
    /// Endpoint answered with a non-2xx status.
    Status(u16),
    /// Response body did not match the expected shape.
    Decode(String),
}

impl RemoteError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "remote_transport",
            Self::Status(_) => "remote_status",
            Self::Decode(_) => "remote_decode",
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "remote unavailable: {message}"),
            Self::Status(status) => write!(f, "remote unavailable: HTTP status {status}"),
            Self::Decode(message) => write!(f, "remote returned malformed data: {message}"),
        }
    }
}

impl Error for RemoteError {}

/// Remote quote source.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetches at most `limit` quotes from the remote.
    async fn fetch_quotes(&self, limit: usize) -> RemoteResult<Vec<Quote>>;

    /// Registers one quote and returns the id the remote assigned.
    async fn register_quote(&self, text: &str, category: &str) -> RemoteResult<QuoteId>;
}
