//! On-disk tier
//!
//! One file per key at `<directory>/<key>.cache` holding the raw image bytes,
//! with no header. Writes go to a sibling temp file that is renamed into place,
//! so readers only ever see complete files.

use crate::config::{ConfigManager, DiskConfig};
use crate::error::{StashError, StashResult};
use crate::tier::{validate_key, DiskStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// File extension for cached images
pub const CACHE_EXTENSION: &str = "cache";

/// Temp file names are fixed length so they fit wherever `<key>.cache` does
const TEMP_PREFIX: &str = ".stash-";
const TEMP_EXTENSION: &str = "tmp";

/// Durable per-key image store
#[derive(Debug, Clone)]
pub struct DiskTier {
    directory: PathBuf,
}

impl DiskTier {
    /// Create a store rooted at `directory`. The directory is created on the
    /// first save.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Create a store in the configured (or platform default) cache directory
    pub fn from_config(config: &DiskConfig) -> StashResult<Self> {
        Ok(Self::new(ConfigManager::cache_dir(config)?))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> StashResult<PathBuf> {
        validate_key(key)?;
        validate_file_stem(key)?;
        Ok(self
            .directory
            .join(format!("{}.{}", key, CACHE_EXTENSION)))
    }

    /// Remove every cached image file, returning how many were removed.
    ///
    /// Leftover temp files from interrupted saves are removed too but not
    /// counted. A save racing with `clear` may fail.
    pub async fn clear(&self) -> StashResult<usize> {
        let mut entries = match fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StashError::io("reading cache directory", e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StashError::io("reading cache entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == CACHE_EXTENSION) {
                fs::remove_file(&path).await.map_err(|e| {
                    StashError::io(format!("removing cache file {}", path.display()), e)
                })?;
                removed += 1;
            } else if is_temp_file(&path) {
                match fs::remove_file(&path).await {
                    Ok(()) => debug!("Removed stale temp file {}", path.display()),
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(StashError::io(
                            format!("removing temp file {}", path.display()),
                            e,
                        ))
                    }
                }
            }
        }

        info!("Removed {} cached images from {}", removed, self.directory.display());
        Ok(removed)
    }

    async fn ensure_directory(&self) -> StashResult<()> {
        fs::create_dir_all(&self.directory).await.map_err(|e| {
            StashError::io(
                format!("creating cache directory {}", self.directory.display()),
                e,
            )
        })
    }
}

fn is_temp_file(path: &Path) -> bool {
    let named_like_temp = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(TEMP_PREFIX));
    named_like_temp && path.extension().is_some_and(|ext| ext == TEMP_EXTENSION)
}

/// A key must map to exactly one file directly inside the cache directory.
fn validate_file_stem(key: &str) -> StashResult<()> {
    if key == "." || key == ".." {
        return Err(StashError::invalid_path(key, "must not be a relative directory"));
    }
    if key.contains('/') || key.contains('\\') || key.contains('\0') {
        return Err(StashError::invalid_path(
            key,
            "must not contain path separators or NUL",
        ));
    }
    Ok(())
}

#[async_trait]
impl DiskStore for DiskTier {
    async fn save(&self, key: &str, blob: &Bytes) -> StashResult<()> {
        let path = self.path_for(key)?;
        self.ensure_directory().await?;

        let temp_path = self.directory.join(format!(
            "{}{}.{}",
            TEMP_PREFIX,
            Uuid::new_v4().simple(),
            TEMP_EXTENSION
        ));

        fs::write(&temp_path, blob).await.map_err(|e| {
            StashError::io(format!("writing temp file {}", temp_path.display()), e)
        })?;

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StashError::io(
                format!("moving cache file into place at {}", path.display()),
                e,
            ));
        }

        debug!("Image for key {} saved at {}", key, path.display());
        Ok(())
    }

    async fn retrieve_image(&self, key: &str) -> StashResult<Option<Bytes>> {
        let path = self.path_for(key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cache file for key {} at {}", key, path.display());
                Ok(None)
            }
            Err(e) => Err(StashError::io(
                format!("reading cache file {}", path.display()),
                e,
            )),
        }
    }

    async fn remove_image(&self, key: &str) -> StashResult<()> {
        let path = self.path_for(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cache file for key {} at {}", key, path.display());
                Ok(())
            }
            Err(e) => Err(StashError::io(
                format!("removing cache file {}", path.display()),
                e,
            )),
        }
    }
}
