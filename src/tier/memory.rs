//! In-memory tier
//!
//! A `moka` cache weighted by byte length. The count limit is folded into the
//! same weight budget: every entry weighs at least `cost_limit / count_limit`,
//! so staying under the byte budget also keeps the entry count under its
//! limit. The price is that entries smaller than that floor use up more of
//! the byte budget than their length, so a cache of mostly small images holds
//! fewer bytes than `cost_limit` (but never more than `count_limit` entries).
//! Which entry gets evicted is moka's decision.

use crate::config::MemoryConfig;
use crate::error::StashResult;
use crate::tier::{validate_key, MemoryStore};
use bytes::Bytes;
use moka::sync::Cache;
use tracing::trace;

/// Default maximum number of cached images
pub const DEFAULT_COUNT_LIMIT: u64 = 500;

/// Default maximum total size of cached images (100 MiB)
pub const DEFAULT_COST_LIMIT: u64 = 100 * 1024 * 1024;

/// Bounded, cost-aware in-process image cache
pub struct MemoryTier {
    entries: Cache<String, Bytes>,
    count_limit: u64,
    cost_limit: u64,
}

impl MemoryTier {
    /// Create a cache holding at most `count_limit` entries and
    /// `cost_limit` bytes.
    ///
    /// Each entry is charged at least `cost_limit / count_limit` bytes.
    pub fn new(count_limit: u64, cost_limit: u64) -> Self {
        let count_limit = count_limit.max(1);
        let cost_limit = cost_limit.max(1);
        let min_weight = (cost_limit / count_limit).max(1);

        let entries = Cache::builder()
            .max_capacity(cost_limit)
            .weigher(move |_key: &String, blob: &Bytes| -> u32 {
                let weight = (blob.len() as u64).max(min_weight);
                u32::try_from(weight).unwrap_or(u32::MAX)
            })
            .build();

        Self {
            entries,
            count_limit,
            cost_limit,
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(config.count_limit, config.cost_limit_bytes)
    }

    pub fn count_limit(&self) -> u64 {
        self.count_limit
    }

    pub fn cost_limit(&self) -> u64 {
        self.cost_limit
    }

    /// Number of entries, as of the last maintenance pass
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Total weight of all entries, as of the last maintenance pass
    pub fn weighted_size(&self) -> u64 {
        self.entries.weighted_size()
    }

    /// Apply pending evictions so counts and sizes are exact
    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new(DEFAULT_COUNT_LIMIT, DEFAULT_COST_LIMIT)
    }
}

impl MemoryStore for MemoryTier {
    fn set(&self, key: &str, blob: Bytes) -> StashResult<()> {
        validate_key(key)?;
        trace!("memory set {} ({} bytes)", key, blob.len());
        self.entries.insert(key.to_string(), blob);
        Ok(())
    }

    fn get(&self, key: &str) -> StashResult<Option<Bytes>> {
        validate_key(key)?;
        Ok(self.entries.get(key))
    }

    fn remove(&self, key: &str) -> StashResult<()> {
        validate_key(key)?;
        self.entries.invalidate(key);
        Ok(())
    }
}
