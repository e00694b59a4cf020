//! Durable local settings storage.
//!
//! A small string key-value layer: trim-slider contexts and the auth
//! credential pair are stored as JSON strings under short keys. Values are
//! opaque to this layer; callers own the encoding.

pub mod error;
pub mod file;

use async_trait::async_trait;

pub use error::{StorageError, StorageResult};
pub use file::FileSettingsStore;

/// Storage interface for settings persistence.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key has never been written.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// Must be atomic - either fully succeeds or has no effect.
    async fn put(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove the value stored under `key`, if any.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}
