//! File-based settings storage implementation.
//!
//! Each key is stored as `{dir}/{key}.json`. Writes go through a temp file
//! plus rename so a crash never leaves a half-written value behind.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::SettingsStore;
use super::error::{StorageError, StorageResult};

/// File-based implementation of [`SettingsStore`].
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    dir: PathBuf,
}

impl FileSettingsStore {
    /// Create a store rooted at `dir`.
    ///
    /// The directory is created on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the file path for a key.
    fn value_path(&self, key: &str) -> StorageResult<PathBuf> {
        // Keys become file names; restrict them to a path-safe charset.
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(StorageError::invalid_key(key));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Ensure the storage directory exists.
    async fn ensure_dir(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::file_io(&self.dir, e))
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.value_path(key)?;

        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::file_io(&path, e)),
        }
    }

    async fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        let final_path = self.value_path(key)?;
        self.ensure_dir().await?;

        let temp_path = self.dir.join(format!("{key}.json.tmp"));

        // Write to temp file first
        fs::write(&temp_path, value.as_bytes())
            .await
            .map_err(|e| StorageError::file_io(&temp_path, e))?;

        // Atomic rename
        fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| StorageError::file_io(&final_path, e))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.value_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::file_io(&path, e)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
