//! Storage: host memory management with Arc-based sharing

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::Device;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Storage for tensor data
///
/// Storage wraps a flat byte buffer with reference counting, enabling zero-copy
/// views (transpose, slice, etc.) that share the underlying buffer. Cloning a
/// `Storage` never copies bytes.
///
/// The length, dtype and device are fixed at creation. Only the element bytes
/// are mutable, behind a lock, so in-place writes through one view are seen
/// by every other view of the same storage.
///
/// Memory is released when the last reference is dropped.
pub struct Storage {
    inner: Arc<StorageInner>,
}

struct StorageInner {
    /// Element bytes, `len * dtype.size_in_bytes()` long
    data: RwLock<Vec<u8>>,
    /// Number of elements (not bytes)
    len: usize,
    /// Element type
    dtype: DType,
    /// Device tag
    device: Device,
}

impl Storage {
    /// Create new zero-filled storage
    ///
    /// Allocates `len` elements of type `dtype`. Returns
    /// [`Error::OutOfMemory`] if the allocation cannot be satisfied.
    pub fn new(len: usize, dtype: DType, device: Device) -> Result<Self> {
        let size = len
            .checked_mul(dtype.size_in_bytes())
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| Error::OutOfMemory { size })?;
        data.resize(size, 0);
        Ok(Self::from_parts(data, len, dtype, device))
    }

    /// Create storage from existing data with inferred dtype
    pub fn from_slice<T: Element>(data: &[T], device: Device) -> Self {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        Self::from_parts(bytes.to_vec(), data.len(), T::DTYPE, device)
    }

    /// Create storage from raw bytes with explicit dtype
    ///
    /// `data.len()` must be a multiple of the dtype's element size.
    pub fn from_bytes(data: &[u8], dtype: DType, device: Device) -> Result<Self> {
        let elem_size = dtype.size_in_bytes();
        if data.len() % elem_size != 0 {
            return Err(Error::invalid_argument(
                "data",
                format!(
                    "{} bytes is not a whole number of {dtype} elements",
                    data.len()
                ),
            ));
        }
        Ok(Self::from_parts(
            data.to_vec(),
            data.len() / elem_size,
            dtype,
            device,
        ))
    }

    fn from_parts(data: Vec<u8>, len: usize, dtype: DType, device: Device) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                data: RwLock::new(data),
                len,
                dtype,
                device,
            }),
        }
    }

    /// Get the number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len
    }

    /// Check if storage is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    /// Get the device
    #[inline]
    pub fn device(&self) -> Device {
        self.inner.device
    }

    /// Get size in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.inner.len * self.inner.dtype.size_in_bytes()
    }

    /// Get the reference count
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Check if this is the only reference
    #[inline]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Check whether two handles refer to the same buffer
    #[inline]
    pub fn same_storage(&self, other: &Storage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Copy all bytes out of the storage
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.data.read().clone()
    }

    /// Copy all elements out of the storage
    ///
    /// Returns [`Error::DTypeMismatch`] if `T` does not match the storage dtype.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.dtype() {
            return Err(Error::DTypeMismatch {
                lhs: self.dtype(),
                rhs: T::DTYPE,
            });
        }
        let data = self.inner.data.read();
        Ok(data
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    /// Shared access to the bytes
    ///
    /// Never hold this guard while acquiring [`Self::write`] on the same storage.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.inner.data.read()
    }

    /// Exclusive access to the bytes
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.inner.data.write()
    }
}

impl Clone for Storage {
    /// Clone increments the reference count (zero-copy)
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("ptr", &format_args!("{:p}", Arc::as_ptr(&self.inner)))
            .field("len", &self.inner.len)
            .field("dtype", &self.inner.dtype)
            .field("device", &self.inner.device)
            .field("refs", &Arc::strong_count(&self.inner))
            .finish()
    }
}
