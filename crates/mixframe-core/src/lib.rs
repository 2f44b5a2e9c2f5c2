//! Mixframe Core - the frame type that flows through the compositing pipeline
//!
//! This crate provides:
//! - Writable, exclusively owned frames for producers ([`MutableFrame`])
//! - Shared, read-only frames with identity comparison ([`ImmutableFrame`])
//! - Sample buffers with owned or external backing ([`Buffer`], [`ConstBuffer`])
//! - Pixel format descriptors and per-frame geometry

pub mod buffer;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod pixel_format;

pub use buffer::{Buffer, ConstBuffer, ExternalStorage};
pub use error::{FrameError, Result};
pub use frame::{FrameVisitor, ImmutableFrame, MutableFrame, StreamTag};
pub use geometry::{Coord, FrameGeometry, GeometryKind, Rect, Vec2};
pub use pixel_format::{PixelFormat, PixelFormatDesc, PlaneDesc};

/// Compile-time limits shared by producers and consumers.
pub mod limits {
    /// Planes stored inline before a plane list spills to the heap
    /// (ycbcra is the widest format at four planes).
    pub const MAX_INLINE_PLANES: usize = 4;
}
