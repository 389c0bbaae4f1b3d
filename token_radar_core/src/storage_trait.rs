// Storage abstraction for the small amount of state that must survive a
// restart (bonded snapshot, bonded token store).

use crate::error::CoreError;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, CoreError>;

/// Key/value document store. One JSON document per key.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Save data with a key, replacing any previous document
    async fn save<T: Serialize + Sync>(&self, key: &str, data: &T) -> StorageResult<()>;

    /// Load data by key; `None` if the key was never written
    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<Option<T>>;
}

/// Standard storage keys used across the application
pub mod keys {
    pub const BONDED_SNAPSHOT: &str = "bonded_snapshot";
    pub const BONDED_TOKENS: &str = "bonded_tokens";
}
