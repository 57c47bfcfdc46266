//! Resolution state

use crate::error::StashError;
use crate::image::Image;
use std::fmt;
use std::sync::Arc;

/// Which tier produced an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierSource {
    Memory,
    Disk,
    Network,
}

impl fmt::Display for TierSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::Disk => "disk",
            Self::Network => "network",
        };
        write!(f, "{}", name)
    }
}

/// Payload-free discriminant of [`LoadState`], for comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Idle,
    Loading,
    Success,
    Failed,
}

impl fmt::Display for LoadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Progress of a resolution
///
/// Compare states with [`LoadState::kind`]; the payloads are deliberately
/// not part of equality.
#[derive(Debug, Clone, Default)]
pub enum LoadState {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Both cache tiers missed; the network fetch is in flight
    Loading,
    /// An image was produced
    Success { image: Image, source: TierSource },
    /// The network tier failed
    Failed(Arc<StashError>),
}

impl LoadState {
    pub(crate) fn success(image: Image, source: TierSource) -> Self {
        Self::Success { image, source }
    }

    pub(crate) fn failed(error: StashError) -> Self {
        Self::Failed(Arc::new(error))
    }

    pub fn kind(&self) -> LoadKind {
        match self {
            Self::Idle => LoadKind::Idle,
            Self::Loading => LoadKind::Loading,
            Self::Success { .. } => LoadKind::Success,
            Self::Failed(_) => LoadKind::Failed,
        }
    }

    /// `Success` and `Failed` end a resolution
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Failed(_))
    }

    pub fn image(&self) -> Option<&Image> {
        match self {
            Self::Success { image, .. } => Some(image),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<TierSource> {
        match self {
            Self::Success { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&StashError> {
        match self {
            Self::Failed(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}
