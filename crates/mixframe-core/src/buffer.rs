//! Sample buffers backing frame planes and audio.
//!
//! [`Buffer`] is the writable, exclusively owned form a producer fills in.
//! [`ConstBuffer`] is the read-only form held by shared frames. Freezing a
//! `Buffer` moves its storage behind an `Arc` and never copies samples.

use bytemuck::Pod;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Memory not allocated by this crate, e.g. a mapped device buffer or a
/// pooled allocation owned by a producer.
///
/// Implementations must return slices of the same length on every call.
pub trait ExternalStorage<T>: Send + Sync + 'static {
    /// Read-only view of the samples.
    fn as_slice(&self) -> &[T];

    /// Writable view of the samples.
    fn as_mut_slice(&mut self) -> &mut [T];
}

enum Storage<T: 'static> {
    Owned(Vec<T>),
    External(Box<dyn ExternalStorage<T>>),
}

impl<T: 'static> Storage<T> {
    #[inline]
    fn as_slice(&self) -> &[T] {
        match self {
            Self::Owned(data) => data,
            Self::External(ext) => ext.as_slice(),
        }
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            Self::Owned(data) => data,
            Self::External(ext) => ext.as_mut_slice(),
        }
    }
}

/// A writable block of samples with a single owner.
pub struct Buffer<T: 'static> {
    storage: Storage<T>,
}

impl<T: 'static> Buffer<T> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            storage: Storage::Owned(Vec::new()),
        }
    }

    /// Take ownership of a vector of samples.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            storage: Storage::Owned(data),
        }
    }

    /// Wrap externally managed memory.
    pub fn from_external<S: ExternalStorage<T>>(storage: S) -> Self {
        Self {
            storage: Storage::External(Box::new(storage)),
        }
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the samples live in [`ExternalStorage`].
    pub fn is_external(&self) -> bool {
        matches!(self.storage, Storage::External(_))
    }

    /// Non-owning read-only view of the samples.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.storage.as_mut_slice()
    }

    /// Convert into a shareable read-only buffer without copying samples.
    pub fn freeze(self) -> ConstBuffer<T> {
        ConstBuffer {
            storage: ConstStorage::Shared(Arc::new(self.storage)),
        }
    }
}

impl<T: Pod> Buffer<T> {
    /// Allocate `len` zeroed samples.
    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![T::zeroed(); len])
    }

    /// The samples reinterpreted as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(self.as_mut_slice())
    }
}

impl<T: 'static> Default for Buffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> From<Vec<T>> for Buffer<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}

impl<T: 'static> Deref for Buffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: 'static> DerefMut for Buffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: 'static> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len())
            .field("external", &self.is_external())
            .finish()
    }
}

enum ConstStorage<T: 'static> {
    Static(&'static [T]),
    Shared(Arc<Storage<T>>),
}

/// A read-only block of samples. Cloning shares the storage.
pub struct ConstBuffer<T: 'static> {
    storage: ConstStorage<T>,
}

impl<T: 'static> ConstBuffer<T> {
    /// An empty buffer. Usable in `static` items.
    pub const fn empty() -> Self {
        Self {
            storage: ConstStorage::Static(&[]),
        }
    }

    /// Borrow samples that live for the whole program.
    pub const fn from_static(data: &'static [T]) -> Self {
        Self {
            storage: ConstStorage::Static(data),
        }
    }

    pub fn from_vec(data: Vec<T>) -> Self {
        Buffer::from_vec(data).freeze()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match &self.storage {
            ConstStorage::Static(data) => data,
            ConstStorage::Shared(storage) => storage.as_slice(),
        }
    }
}

impl<T: Pod> ConstBuffer<T> {
    /// The samples reinterpreted as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }
}

impl<T: 'static> Clone for ConstBuffer<T> {
    fn clone(&self) -> Self {
        let storage = match &self.storage {
            ConstStorage::Static(data) => ConstStorage::Static(*data),
            ConstStorage::Shared(storage) => ConstStorage::Shared(Arc::clone(storage)),
        };
        Self { storage }
    }
}

impl<T: 'static> Default for ConstBuffer<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: 'static> From<Buffer<T>> for ConstBuffer<T> {
    fn from(buffer: Buffer<T>) -> Self {
        buffer.freeze()
    }
}

impl<T: 'static> From<Vec<T>> for ConstBuffer<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}

impl<T: 'static> Deref for ConstBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: 'static> fmt::Debug for ConstBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = matches!(self.storage, ConstStorage::Shared(_));
        f.debug_struct("ConstBuffer")
            .field("len", &self.len())
            .field("shared", &shared)
            .finish()
    }
}
