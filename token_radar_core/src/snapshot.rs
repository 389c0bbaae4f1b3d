// Persisted set of mints already seen bonded, so restarts don't re-announce.

use crate::error::CoreError;
use crate::models::{BondingEvent, ClassifiedToken};
use crate::storage_trait::{keys, StorageBackend};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BondedSnapshot {
    /// mint -> first time it was seen bonded
    #[serde(default)]
    seen: BTreeMap<String, DateTime<Utc>>,
    /// False until an observation contains at least one bonded token. That
    /// observation only seeds the set and emits no events.
    #[serde(default)]
    baseline_taken: bool,
}

impl BondedSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn contains(&self, mint: &str) -> bool {
        self.seen.contains_key(mint)
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline_taken
    }

    pub fn first_seen(&self, mint: &str) -> Option<DateTime<Utc>> {
        self.seen.get(mint).copied()
    }

    /// Record every bonded token in `tokens` and return an event for each mint
    /// not seen before. Unbonded tokens are ignored. Keeps at most `capacity`
    /// mints, dropping the longest-known first.
    pub fn observe(
        &mut self,
        tokens: &[ClassifiedToken],
        now: DateTime<Utc>,
        capacity: usize,
    ) -> Vec<BondingEvent> {
        let announce = self.baseline_taken;
        let mut events = Vec::new();
        for token in tokens.iter().filter(|t| t.is_bonded()) {
            if self.seen.contains_key(token.mint()) {
                continue;
            }
            self.seen.insert(token.mint().to_string(), now);
            if announce {
                events.push(BondingEvent::from_token(token, now));
            }
        }

        if !announce && !self.seen.is_empty() {
            info!("Bonded snapshot baseline: {} mints", self.seen.len());
            self.baseline_taken = true;
        }
        self.prune(capacity);
        events
    }

    fn prune(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        if self.seen.len() <= capacity {
            return;
        }
        let mut by_age: Vec<(DateTime<Utc>, String)> =
            self.seen.iter().map(|(m, t)| (*t, m.clone())).collect();
        by_age.sort();
        let excess = self.seen.len() - capacity;
        for (_, mint) in by_age.into_iter().take(excess) {
            self.seen.remove(&mint);
        }
        debug!("Pruned {} mints from bonded snapshot", excess);
    }

    pub async fn load<S: StorageBackend>(storage: &S) -> Result<Self, CoreError> {
        let snapshot: Option<Self> = storage.load(keys::BONDED_SNAPSHOT).await?;
        Ok(snapshot.unwrap_or_default())
    }

    pub async fn save<S: StorageBackend>(&self, storage: &S) -> Result<(), CoreError> {
        storage.save(keys::BONDED_SNAPSHOT, self).await
    }
}
