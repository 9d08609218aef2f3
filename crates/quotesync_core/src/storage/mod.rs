//! Key-value storage capability and implementations.
//!
//! # Responsibility
//! - Define the storage contract the quote store persists through.
//! - Provide a durable SQLite backend and an in-memory session backend.
//!
//! # Invariants
//! - Values are opaque UTF-8 strings (JSON for structured data).
//! - `set` overwrites; `remove` of a missing key is not an error.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

/// Durable key holding the JSON array of quotes.
pub const KEY_QUOTES: &str = "quotes";
/// Durable key holding the last category selector.
pub const KEY_LAST_CATEGORY_FILTER: &str = "lastCategoryFilter";
/// Session key holding the last rendered quote line.
pub const KEY_LAST_QUOTE: &str = "lastQuote";
/// Session key holding the JSON array of outstanding conflicts.
pub const KEY_CONFLICTS: &str = "conflicts";

pub type KvResult<T> = Result<T, KvError>;

#[derive(Debug)]
pub enum KvError {
    Db(DbError),
    MissingTable(&'static str),
    /// A previous holder of the backend lock panicked.
    Poisoned,
}

impl KvError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Db(err) => err.code(),
            Self::MissingTable(_) => "kv_missing_table",
            Self::Poisoned => "kv_poisoned",
        }
    }
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingTable(table) => write!(f, "required table `{table}` is missing"),
            Self::Poisoned => write!(f, "key-value backend lock poisoned"),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for KvError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// String key-value storage used for durable and session-scoped data.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> KvResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> KvResult<()>;
    fn remove(&self, key: &str) -> KvResult<()>;
}
