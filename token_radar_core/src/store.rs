// Upsert-by-mint store for bonded tokens.

use crate::error::CoreError;
use crate::models::ClassifiedToken;
use crate::storage_trait::{keys, StorageBackend};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: ClassifiedToken,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Whole collection lives in one document under `bonded_tokens`.
pub struct TokenStore<S: StorageBackend> {
    storage: Arc<S>,
    capacity: usize,
}

impl<S: StorageBackend> TokenStore<S> {
    pub fn new(storage: Arc<S>, capacity: usize) -> Self {
        Self {
            storage,
            capacity: capacity.max(1),
        }
    }

    async fn load_all(&self) -> Result<BTreeMap<String, StoredToken>, CoreError> {
        Ok(self
            .storage
            .load(keys::BONDED_TOKENS)
            .await?
            .unwrap_or_default())
    }

    /// Insert or refresh each token. Returns how many mints were new.
    pub async fn upsert_all(
        &self,
        tokens: &[ClassifiedToken],
        now: DateTime<Utc>,
    ) -> Result<usize, CoreError> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let mut all = self.load_all().await?;
        let mut inserted = 0;
        for token in tokens {
            match all.get_mut(token.mint()) {
                Some(existing) => {
                    existing.token = token.clone();
                    existing.last_seen = now;
                }
                None => {
                    all.insert(
                        token.mint().to_string(),
                        StoredToken {
                            token: token.clone(),
                            first_seen: now,
                            last_seen: now,
                        },
                    );
                    inserted += 1;
                }
            }
        }

        if all.len() > self.capacity {
            let mut by_age: Vec<(DateTime<Utc>, String)> =
                all.values().map(|s| (s.last_seen, s.token.mint().to_string())).collect();
            by_age.sort();
            let excess = all.len() - self.capacity;
            for (_, mint) in by_age.into_iter().take(excess) {
                all.remove(&mint);
            }
        }

        self.storage.save(keys::BONDED_TOKENS, &all).await?;
        debug!("Upserted {} tokens ({} new, {} stored)", tokens.len(), inserted, all.len());
        Ok(inserted)
    }

    /// Number of stored mints.
    pub async fn len(&self) -> Result<usize, CoreError> {
        Ok(self.load_all().await?.len())
    }
}
