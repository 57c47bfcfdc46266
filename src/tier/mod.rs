//! Storage tiers
//!
//! Three independently failing layers, fastest first:
//!
//! | Tier | Backing | Miss | Failure |
//! |------|---------|------|---------|
//! | Memory | bounded in-process cache | `Ok(None)` | empty key only |
//! | Disk | one file per key | `Ok(None)` | key, path or IO |
//! | Network | HTTP GET | n/a | locator, transport or status |
//!
//! The traits below are the seams the resolver is built on; each has one
//! production implementation in this module tree.

pub mod disk;
pub mod memory;
pub mod network;

pub use disk::DiskTier;
pub use memory::MemoryTier;
pub use network::{HttpClient, HttpResponse, NetworkTier, UreqClient};

use crate::error::{StashError, StashResult};
use async_trait::async_trait;
use bytes::Bytes;

/// Reject empty keys before any tier does work
pub fn validate_key(key: &str) -> StashResult<()> {
    if key.is_empty() {
        return Err(StashError::EmptyKey);
    }
    Ok(())
}

/// Bounded in-process byte cache
pub trait MemoryStore: Send + Sync {
    /// Store or overwrite the bytes for `key`
    fn set(&self, key: &str, blob: Bytes) -> StashResult<()>;

    /// Look up the bytes for `key`; a miss is `Ok(None)`
    fn get(&self, key: &str) -> StashResult<Option<Bytes>>;

    /// Drop the entry for `key`, if any
    fn remove(&self, key: &str) -> StashResult<()>;
}

/// Durable per-key byte store
#[async_trait]
pub trait DiskStore: Send + Sync {
    /// Atomically persist the bytes for `key`
    async fn save(&self, key: &str, blob: &Bytes) -> StashResult<()>;

    /// Read the bytes for `key`; a missing file is `Ok(None)`
    async fn retrieve_image(&self, key: &str) -> StashResult<Option<Bytes>>;

    /// Delete the file for `key`, if any
    async fn remove_image(&self, key: &str) -> StashResult<()>;
}

/// Remote source of image bytes
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch the raw bytes behind `locator`
    async fn fetch_image(&self, locator: &str) -> StashResult<Bytes>;
}
