//! Animation error types

use crate::timeline::TimelineKey;
use thiserror::Error;

/// Errors raised by the animation engine
///
/// Everything else the engine encounters at runtime (negative deltas, missing
/// fields, dropped targets) degrades to a defined no-op instead.
#[derive(Error, Debug)]
pub enum AnimationError {
    /// The timeline is already driven by another sync binding
    #[error("timeline {0} is already synced to a parent timeline")]
    AlreadySynced(TimelineKey),

    /// Binding the timeline would make it drive itself
    #[error("syncing timeline {child} into {parent} would create a cycle")]
    SyncCycle {
        parent: TimelineKey,
        child: TimelineKey,
    },

    /// Failed to parse engine configuration
    #[error("invalid engine configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Failed to read engine configuration
    #[error("failed to read engine configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
