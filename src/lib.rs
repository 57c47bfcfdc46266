//! imagestash - tiered image resolution
//!
//! Resolves images by key through an in-memory cache, an on-disk store and
//! an HTTP source, writing network and disk hits back into the faster tiers.

pub mod config;
pub mod error;
pub mod image;
pub mod logging;
pub mod resolver;
pub mod tier;

pub use error::{ErrorKind, StashError, StashResult};
pub use image::{Image, ImageCodec, ImageFormat, SniffingCodec};
pub use resolver::{ImageRequest, LoadKind, LoadState, Resolution, Resolver, TierSource, Tiers};
pub use tier::{DiskStore, DiskTier, ImageSource, MemoryStore, MemoryTier, NetworkTier};
