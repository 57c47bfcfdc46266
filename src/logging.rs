//! Logging setup
//!
//! imagestash only emits `tracing` events. Host applications that already
//! install a subscriber can skip this module entirely.

use crate::config::GeneralConfig;
use tracing_subscriber::EnvFilter;

/// Build the event filter: `RUST_LOG` wins, otherwise `imagestash=<log_level>`
pub fn env_filter(general: &GeneralConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("imagestash={}", general.log_level)))
}

/// Install a global fmt subscriber.
///
/// Returns `false` if a global subscriber was already set.
pub fn init(general: &GeneralConfig) -> bool {
    let filter = env_filter(general);

    let result = match general.log_format.as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init(),
    };

    result.is_ok()
}
