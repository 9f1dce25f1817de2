//! Key-value storage backing story persistence.
//!
//! # Responsibility
//! - Define the byte-blob storage contract used by the story repository.
//! - Provide SQLite-backed and in-memory implementations.
//!
//! # Invariants
//! - `set` replaces the whole value for a key or leaves the prior value
//!   untouched; partial writes are never observable.
//! - Keys are non-blank strings.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

pub type KvResult<T> = Result<T, KvError>;

/// Error for key-value storage operations.
#[derive(Debug)]
pub enum KvError {
    /// Statement-level SQLite failure.
    Sqlite(rusqlite::Error),
    InvalidKey(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "story storage query failed: {err}"),
            Self::InvalidKey(key) => write!(f, "invalid storage key: `{key}`"),
            Self::MissingRequiredTable(table) => {
                write!(f, "missing required table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Byte-blob storage addressed by string keys.
///
/// Implementations are used from a single thread; no method needs to be
/// safe against concurrent callers.
pub trait KeyValueStore {
    /// Returns the stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>>;
    /// Stores `value` under `key`, overwriting any prior value.
    fn set(&mut self, key: &str, value: &[u8]) -> KvResult<()>;
    /// Removes the key. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> KvResult<()>;
}

pub(crate) fn validate_key(key: &str) -> KvResult<()> {
    if key.trim().is_empty() {
        return Err(KvError::InvalidKey(key.to_string()));
    }
    Ok(())
}
