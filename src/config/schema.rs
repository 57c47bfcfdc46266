//! Configuration schema for imagestash
//!
//! Configuration is stored at `~/.config/imagestash/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// In-memory tier settings
    pub memory: MemoryConfig,

    /// On-disk tier settings
    pub disk: DiskConfig,

    /// Network tier settings
    pub network: NetworkConfig,
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// In-memory tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum number of cached images
    pub count_limit: u64,

    /// Maximum total size of cached images in bytes
    pub cost_limit_bytes: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            count_limit: 500,
            cost_limit_bytes: 100 * 1024 * 1024,
        }
    }
}

/// On-disk tier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    /// Cache directory (default: `<cache_dir>/imagestash`)
    pub directory: Option<PathBuf>,
}

/// Network tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Largest accepted response body in bytes
    pub max_body_bytes: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_body_bytes: 20 * 1024 * 1024,
            user_agent: concat!("imagestash/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
