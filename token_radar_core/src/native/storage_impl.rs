// JSON-file storage backend

use crate::error::CoreError;
use crate::storage_trait::{StorageBackend, StorageResult};
use async_trait::async_trait;
use log::debug;
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;

/// One `<key>.json` file per key under `base_dir`.
///
/// Writes go to `<key>.json.tmp` first and are renamed into place, so a crash
/// mid-write leaves the previous document intact.
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    fn get_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json.tmp", key))
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn save<T: Serialize + Sync>(&self, key: &str, data: &T) -> StorageResult<()> {
        let path = self.get_path(key);
        let tmp = self.temp_path(key);

        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| CoreError::Io(format!("Failed to create {:?}: {}", self.base_dir, e)))?;

        let json = serde_json::to_vec_pretty(data)?;
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| CoreError::Io(format!("Failed to write {:?}: {}", tmp, e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| CoreError::Io(format!("Failed to move {:?} into place: {}", tmp, e)))?;

        debug!("Saved {} to {:?}", key, path);
        Ok(())
    }

    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<Option<T>> {
        let path = self.get_path(key);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("No stored document for {} at {:?}", key, path);
            return Ok(None);
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CoreError::Io(format!("Failed to read {:?}: {}", path, e)))?;
        let data = serde_json::from_slice(&bytes)?;
        debug!("Loaded {} from {:?}", key, path);
        Ok(Some(data))
    }
}
