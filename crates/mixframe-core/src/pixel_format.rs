//! Pixel format descriptors.
//!
//! A [`PixelFormatDesc`] lists the image planes a frame carries. Producers
//! build one per stream and every frame from that stream reuses it.

use crate::error::{FrameError, Result};
use crate::limits::MAX_INLINE_PLANES;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

/// Pixel layout of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit grayscale, one plane
    Gray,
    /// Packed 8-bit BGRA
    Bgra,
    /// Packed 8-bit RGBA
    Rgba,
    /// Packed 8-bit ARGB
    Argb,
    /// Packed 8-bit ABGR
    Abgr,
    /// Planar Y, Cb, Cr
    Ycbcr,
    /// Planar Y, Cb, Cr, A
    Ycbcra,
    /// 8-bit luma used as a key/alpha source
    Luma,
    /// Packed 8-bit BGR
    Bgr,
    /// Packed 8-bit RGB
    Rgb,
    /// No valid format. Carried by empty frames.
    #[default]
    Invalid,
}

impl PixelFormat {
    /// Bytes per pixel in each plane, or 0 for [`PixelFormat::Invalid`].
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray | Self::Luma | Self::Ycbcr | Self::Ycbcra => 1,
            Self::Bgr | Self::Rgb => 3,
            Self::Bgra | Self::Rgba | Self::Argb | Self::Abgr => 4,
            Self::Invalid => 0,
        }
    }

    /// Number of planes for this format.
    pub fn plane_count(self) -> usize {
        match self {
            Self::Invalid => 0,
            Self::Ycbcr => 3,
            Self::Ycbcra => 4,
            _ => 1,
        }
    }

    pub fn is_planar(self) -> bool {
        matches!(self, Self::Ycbcr | Self::Ycbcra)
    }
}

/// Layout of one image plane.
///
/// `stride` is the number of bytes per pixel; `linesize` and `size` are
/// derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlaneDesc {
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    /// Bytes per row
    pub linesize: usize,
    /// Total bytes in the plane
    pub size: usize,
}

impl PlaneDesc {
    #[inline]
    pub const fn new(width: usize, height: usize, stride: usize) -> Self {
        Self {
            width,
            height,
            stride,
            linesize: width * stride,
            size: width * height * stride,
        }
    }
}

/// Describes the planes of a frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelFormatDesc {
    pub format: PixelFormat,
    pub planes: SmallVec<[PlaneDesc; MAX_INLINE_PLANES]>,
}

impl PixelFormatDesc {
    /// Create a descriptor from explicit planes.
    pub fn new(format: PixelFormat, planes: impl IntoIterator<Item = PlaneDesc>) -> Self {
        Self {
            format,
            planes: planes.into_iter().collect(),
        }
    }

    /// The "no format" sentinel: [`PixelFormat::Invalid`] with no planes.
    pub fn invalid() -> Self {
        Self {
            format: PixelFormat::Invalid,
            planes: SmallVec::new(),
        }
    }

    /// Single-plane descriptor for a packed (non-planar) format.
    pub fn packed(format: PixelFormat, width: usize, height: usize) -> Result<Self> {
        if format.is_planar() || format == PixelFormat::Invalid {
            debug!(?format, "Rejected packed descriptor for non-packed format");
            return Err(FrameError::InvalidArgument(format!(
                "{format:?} is not a packed pixel format"
            )));
        }
        let plane = PlaneDesc::new(width, height, format.bytes_per_pixel());
        Ok(Self::new(format, [plane]))
    }

    /// Planar Y/Cb/Cr descriptor with an optional full-resolution alpha plane.
    pub fn ycbcr(
        width: usize,
        height: usize,
        chroma_width: usize,
        chroma_height: usize,
        alpha: bool,
    ) -> Self {
        let luma = PlaneDesc::new(width, height, 1);
        let chroma = PlaneDesc::new(chroma_width, chroma_height, 1);
        let mut desc = Self::new(PixelFormat::Ycbcr, [luma, chroma, chroma]);
        if alpha {
            desc.format = PixelFormat::Ycbcra;
            desc.planes.push(luma);
        }
        desc
    }

    #[inline]
    pub fn is_invalid(&self) -> bool {
        self.format == PixelFormat::Invalid && self.planes.is_empty()
    }

    #[inline]
    pub fn plane(&self, index: usize) -> Option<&PlaneDesc> {
        self.planes.get(index)
    }

    /// Sum of all plane sizes in bytes.
    pub fn total_size(&self) -> usize {
        self.planes.iter().map(|p| p.size).sum()
    }
}

impl Default for PixelFormatDesc {
    fn default() -> Self {
        Self::invalid()
    }
}
