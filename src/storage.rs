use ::redis::RedisError;
use async_trait::async_trait;
use color_eyre::Report;
use serde::{Serialize, de::DeserializeOwned};
use std::error::Error as StdError;
use std::fmt;

mod memory;
mod redis;

pub use memory::MemoryStorage;
pub use redis::RedisStorage;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Error type for storage operations.
#[derive(Debug)]
pub struct StorageError {
    error: Report,
}

impl StorageError {
    pub fn msg<T>(message: T) -> Self
    where
        T: fmt::Debug + fmt::Display + Send + Sync + 'static,
    {
        Self {
            error: Report::msg(message),
        }
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.source()
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl From<RedisError> for StorageError {
    fn from(error: RedisError) -> Self {
        Self {
            error: Report::new(error),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        Self {
            error: Report::new(error),
        }
    }
}

/// A single value stored at a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub key: String,
    pub value: Vec<u8>,
}

impl StorageEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates an entry holding the JSON encoding of `value`.
    pub fn json<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self {
            key: key.into(),
            value: serde_json::to_vec(value)?,
        })
    }

    /// Decodes the stored value as JSON.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.value)?)
    }
}

/// Path-namespaced key/value storage shared with the rest of the platform.
///
/// Paths use `/` as separator (e.g. `certs/1f-2a`). Values are opaque bytes.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Loads the entry stored at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>>;

    /// Writes the entry, replacing any previous value at the same key.
    async fn put(&self, entry: &StorageEntry) -> Result<()>;

    /// Deletes the entry stored at `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Lists the keys under `prefix`, relative to it and sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Checks if an entry exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
