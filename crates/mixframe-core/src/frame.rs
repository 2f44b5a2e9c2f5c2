//! Frames flowing from producers through the mixer to consumers.
//!
//! A producer fills a [`MutableFrame`] it owns exclusively, then hands it to
//! the mixer, which finalizes it into an [`ImmutableFrame`]. Immutable frames
//! share one storage block between all holders, and compare by the identity
//! of that block rather than by pixel content, so a consumer can tell "same
//! frame as last render" in O(1).

use crate::buffer::{Buffer, ConstBuffer};
use crate::error::{FrameError, Result};
use crate::geometry::FrameGeometry;
use crate::limits::MAX_INLINE_PLANES;
use crate::pixel_format::{PixelFormatDesc, PlaneDesc};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{self, AtomicUsize};
use std::sync::Arc;
use tracing::{debug, trace};

/// Returned for every plane lookup on an empty frame.
static EMPTY_PLANE: ConstBuffer<u8> = ConstBuffer::empty();

static NEXT_STREAM_TAG: AtomicUsize = AtomicUsize::new(1);

/// Identity of the stream a frame was produced by.
///
/// Tags compare by identity only; they carry no other information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamTag(NonZeroUsize);

impl StreamTag {
    /// Allocate a tag distinct from every other tag allocated by this process.
    pub fn new() -> Self {
        let id = NEXT_STREAM_TAG.fetch_add(1, atomic::Ordering::Relaxed);
        // Counter starts at 1 and would need 2^64 allocations to wrap.
        Self(NonZeroUsize::new(id).unwrap_or(NonZeroUsize::MIN))
    }

    /// Use an identity managed by the caller, e.g. a producer's address.
    #[inline]
    pub const fn from_raw(id: NonZeroUsize) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn as_raw(self) -> NonZeroUsize {
        self.0
    }
}

impl Default for StreamTag {
    fn default() -> Self {
        Self::new()
    }
}

fn check_planes(desc: &PixelFormatDesc, lens: impl ExactSizeIterator<Item = usize>) -> Result<()> {
    if lens.len() != desc.planes.len() {
        debug!(
            expected = desc.planes.len(),
            actual = lens.len(),
            "Rejected frame with mismatched plane count"
        );
        return Err(FrameError::InvalidArgument(format!(
            "format declares {} planes but {} buffers were supplied",
            desc.planes.len(),
            lens.len()
        )));
    }
    for (index, (len, plane)) in lens.zip(desc.planes.iter()).enumerate() {
        if len < plane.size {
            debug!(index, len, size = plane.size, "Rejected undersized plane buffer");
            return Err(FrameError::InvalidArgument(format!(
                "plane {index} holds {len} bytes, format requires {}",
                plane.size
            )));
        }
    }
    Ok(())
}

/// A writable frame owned by exactly one pipeline stage.
///
/// Not `Clone`: buffers are never duplicated implicitly. Ownership moves with
/// the value, and [`MutableFrame::finalize`] consumes it.
pub struct MutableFrame {
    tag: StreamTag,
    image_data: SmallVec<[Buffer<u8>; MAX_INLINE_PLANES]>,
    audio_data: Buffer<i32>,
    desc: PixelFormatDesc,
    geometry: FrameGeometry,
}

impl MutableFrame {
    /// Create a frame from one buffer per plane of `desc`.
    ///
    /// Fails with [`FrameError::InvalidArgument`] if the buffer count differs
    /// from the plane count, or a buffer is smaller than its plane.
    pub fn new(
        tag: StreamTag,
        image_data: impl IntoIterator<Item = Buffer<u8>>,
        audio_data: Buffer<i32>,
        desc: PixelFormatDesc,
    ) -> Result<Self> {
        let image_data: SmallVec<[Buffer<u8>; MAX_INLINE_PLANES]> =
            image_data.into_iter().collect();
        check_planes(&desc, image_data.iter().map(|b| b.len()))?;

        Ok(Self {
            tag,
            image_data,
            audio_data,
            desc,
            geometry: FrameGeometry::default(),
        })
    }

    pub fn image_data(&self, index: usize) -> Result<&Buffer<u8>> {
        let len = self.image_data.len();
        self.image_data
            .get(index)
            .ok_or(FrameError::IndexOutOfRange { index, len })
    }

    pub fn image_data_mut(&mut self, index: usize) -> Result<&mut Buffer<u8>> {
        let len = self.image_data.len();
        self.image_data
            .get_mut(index)
            .ok_or(FrameError::IndexOutOfRange { index, len })
    }

    #[inline]
    pub fn audio_data(&self) -> &Buffer<i32> {
        &self.audio_data
    }

    #[inline]
    pub fn audio_data_mut(&mut self) -> &mut Buffer<i32> {
        &mut self.audio_data
    }

    /// Width of plane 0, or 0 if the format declares no planes.
    pub fn width(&self) -> usize {
        self.desc.plane(0).map_or(0, |p| p.width)
    }

    /// Height of plane 0, or 0 if the format declares no planes.
    pub fn height(&self) -> usize {
        self.desc.plane(0).map_or(0, |p| p.height)
    }

    #[inline]
    pub fn stream_tag(&self) -> StreamTag {
        self.tag
    }

    #[inline]
    pub fn pixel_format_desc(&self) -> &PixelFormatDesc {
        &self.desc
    }

    #[inline]
    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    #[inline]
    pub fn geometry_mut(&mut self) -> &mut FrameGeometry {
        &mut self.geometry
    }

    pub fn set_geometry(&mut self, geometry: FrameGeometry) {
        self.geometry = geometry;
    }

    /// Convert into a shareable [`ImmutableFrame`]. Pixel and audio data move
    /// into the new frame without being copied.
    ///
    /// The source is consumed, so it cannot be touched afterwards:
    ///
    /// ```compile_fail
    /// use mixframe_core::{Buffer, MutableFrame, PixelFormat, PixelFormatDesc, StreamTag};
    ///
    /// let desc = PixelFormatDesc::packed(PixelFormat::Gray, 1, 1).unwrap();
    /// let frame = MutableFrame::new(StreamTag::new(), vec![Buffer::zeroed(1)], Buffer::new(), desc).unwrap();
    /// let shared = frame.finalize();
    /// let _ = frame.width();
    /// ```
    pub fn finalize(self) -> ImmutableFrame {
        let Self {
            tag,
            image_data,
            audio_data,
            desc,
            geometry,
        } = self;

        trace!(tag = ?tag, planes = image_data.len(), "Finalizing frame");

        ImmutableFrame::from_data(FrameData {
            tag: Some(tag),
            image_data: image_data.into_iter().map(Buffer::freeze).collect(),
            audio_data: audio_data.freeze(),
            desc,
            geometry,
        })
    }
}

impl fmt::Debug for MutableFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableFrame")
            .field("tag", &self.tag)
            .field("format", &self.desc.format)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("planes", &self.image_data.len())
            .field("audio_samples", &self.audio_data.len())
            .finish()
    }
}

struct FrameData {
    tag: Option<StreamTag>,
    image_data: SmallVec<[ConstBuffer<u8>; MAX_INLINE_PLANES]>,
    audio_data: ConstBuffer<i32>,
    desc: PixelFormatDesc,
    geometry: FrameGeometry,
}

/// A read-only frame shared by any number of holders.
///
/// Cloning is an atomic reference count bump. Equality, ordering and hashing
/// use the address of the shared storage block: clones of one frame are
/// equal, while two frames built separately are never equal even if their
/// pixels match.
#[derive(Clone)]
pub struct ImmutableFrame {
    inner: Arc<FrameData>,
}

impl ImmutableFrame {
    fn from_data(data: FrameData) -> Self {
        Self {
            inner: Arc::new(data),
        }
    }

    /// An empty frame with no planes, no audio and an invalid format.
    ///
    /// A tag marks "no data yet from this stream"; `None` gives the
    /// placeholder used before any stream exists.
    pub fn empty(tag: Option<StreamTag>) -> Self {
        trace!(tag = ?tag, "Creating empty frame");
        Self::from_data(FrameData {
            tag,
            image_data: SmallVec::new(),
            audio_data: ConstBuffer::empty(),
            desc: PixelFormatDesc::invalid(),
            geometry: FrameGeometry::default(),
        })
    }

    /// Create a frame from buffers that are already read-only.
    pub fn new(
        tag: StreamTag,
        image_data: impl IntoIterator<Item = ConstBuffer<u8>>,
        audio_data: ConstBuffer<i32>,
        desc: PixelFormatDesc,
    ) -> Self {
        Self::from_data(FrameData {
            tag: Some(tag),
            image_data: image_data.into_iter().collect(),
            audio_data,
            desc,
            geometry: FrameGeometry::default(),
        })
    }

    /// Create a frame from writable buffers, freezing them without copying.
    pub fn freeze(
        tag: StreamTag,
        image_data: impl IntoIterator<Item = Buffer<u8>>,
        audio_data: ConstBuffer<i32>,
        desc: PixelFormatDesc,
    ) -> Self {
        trace!(tag = ?tag, "Freezing plane buffers");
        Self::new(
            tag,
            image_data.into_iter().map(Buffer::freeze),
            audio_data,
            desc,
        )
    }

    /// Plane `index` of the frame.
    ///
    /// Frames without a tag, and empty frames, return a shared zero-length
    /// buffer for any index. Every other frame fails with
    /// [`FrameError::IndexOutOfRange`] past its last plane.
    pub fn image_data(&self, index: usize) -> Result<&ConstBuffer<u8>> {
        if !self.is_valid() || self.is_empty() {
            return Ok(&EMPTY_PLANE);
        }
        let len = self.inner.image_data.len();
        self.inner
            .image_data
            .get(index)
            .ok_or(FrameError::IndexOutOfRange { index, len })
    }

    #[inline]
    pub fn audio_data(&self) -> &ConstBuffer<i32> {
        &self.inner.audio_data
    }

    fn primary_plane(&self) -> Option<&PlaneDesc> {
        self.inner.tag.and(self.inner.desc.plane(0))
    }

    /// Width of plane 0; 0 for untagged or plane-less frames.
    pub fn width(&self) -> usize {
        self.primary_plane().map_or(0, |p| p.width)
    }

    pub fn height(&self) -> usize {
        self.primary_plane().map_or(0, |p| p.height)
    }

    /// Byte size of plane 0.
    pub fn size(&self) -> usize {
        self.primary_plane().map_or(0, |p| p.size)
    }

    #[inline]
    pub fn pixel_format_desc(&self) -> &PixelFormatDesc {
        &self.inner.desc
    }

    #[inline]
    pub fn stream_tag(&self) -> Option<StreamTag> {
        self.inner.tag
    }

    #[inline]
    pub fn geometry(&self) -> &FrameGeometry {
        &self.inner.geometry
    }

    /// True if the frame belongs to a stream, even one that has not produced
    /// data yet.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.inner.tag.is_some()
    }

    /// True for frames built by [`ImmutableFrame::empty`].
    pub fn is_empty(&self) -> bool {
        self.inner.image_data.is_empty() && self.inner.desc.is_invalid()
    }

    /// Address of the shared storage block. Clones report the same address.
    #[inline]
    pub fn storage_ptr(&self) -> *const () {
        Arc::as_ptr(&self.inner).cast()
    }

    pub fn accept<V: FrameVisitor + ?Sized>(&self, visitor: &mut V) {
        visitor.visit(self);
    }
}

impl Default for ImmutableFrame {
    fn default() -> Self {
        Self::empty(None)
    }
}

impl From<MutableFrame> for ImmutableFrame {
    fn from(frame: MutableFrame) -> Self {
        frame.finalize()
    }
}

impl PartialEq for ImmutableFrame {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ImmutableFrame {}

impl PartialOrd for ImmutableFrame {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ImmutableFrame {
    fn cmp(&self, other: &Self) -> Ordering {
        self.storage_ptr().cmp(&other.storage_ptr())
    }
}

impl Hash for ImmutableFrame {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.storage_ptr().hash(state);
    }
}

impl fmt::Debug for ImmutableFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmutableFrame")
            .field("storage", &self.storage_ptr())
            .field("tag", &self.inner.tag)
            .field("format", &self.inner.desc.format)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("planes", &self.inner.image_data.len())
            .finish()
    }
}

/// Consumer-side hook for pulling data out of a frame.
pub trait FrameVisitor {
    fn visit(&mut self, frame: &ImmutableFrame);
}
