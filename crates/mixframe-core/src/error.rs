//! Error types for frame construction and access.

use thiserror::Error;

/// Errors raised by frame construction and plane lookups.
///
/// Both variants signal misuse by the producing stage rather than a transient
/// condition, so nothing in this crate retries on them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Plane index {index} out of range (frame has {len} planes)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result type alias for frame operations.
pub type Result<T> = std::result::Result<T, FrameError>;
