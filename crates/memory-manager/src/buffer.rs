// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The buffer abstraction shared by images, tensors and the pool.
//!
//! A [`Buffer`] is a byte region tagged with a [`MemorySpace`]. It either
//! owns its memory (obtained through [`Buffer::allocate`]) or borrows
//! caller memory (installed through [`Buffer::adopt`]). Only owners ever
//! release memory:
//!
//! ```text
//!            allocate(size)            free() / drop
//!   Empty ─────────────────► Owned ───────────────────► Empty
//!     │
//!     │ adopt(ptr, size)               free() is a no-op
//!     └────────────────────► Adopted ──────────────────► Adopted
//! ```
//!
//! Two implementors exist: [`PlainBuffer`], which calls the aligned
//! allocator directly, and [`PooledBuffer`](crate::PooledBuffer), which
//! leases its memory from a [`BufferPool`](crate::BufferPool).

use crate::{AlignedBuffer, MemoryError, MemorySpace};
use std::fmt;
use std::ptr::NonNull;

/// Direction of a cache synchronisation around device access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheSync {
    /// Flush host writes so the device observes them.
    ToDevice,
    /// Invalidate host caches so device writes become visible.
    FromDevice,
}

/// A memory-space tagged byte buffer.
pub trait Buffer: Send + Sync + fmt::Debug {
    /// The memory space this buffer belongs to.
    fn memory_space(&self) -> MemorySpace;

    /// Allocates `size` bytes, releasing any memory this buffer owned before.
    ///
    /// On success the buffer owns the new memory and the base pointer is
    /// returned. On failure the buffer is left empty.
    fn allocate(&mut self, size: usize) -> Result<NonNull<u8>, MemoryError>;

    /// Points the buffer at caller memory without copying. The buffer does
    /// not take ownership; [`free`](Buffer::free) will not release it.
    ///
    /// Rejects a null pointer or a zero size with
    /// [`MemoryError::InvalidArgument`], leaving the state unchanged.
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `size` initialised bytes
    /// for as long as this buffer (or anything viewing it) is used.
    unsafe fn adopt(&mut self, ptr: *mut u8, size: usize) -> Result<(), MemoryError>;

    /// Releases owned memory and resets the buffer to empty. A no-op for
    /// adopted memory and for empty buffers.
    fn free(&mut self);

    /// Synchronises device caches around accelerator access.
    ///
    /// Host memory needs no synchronisation, so the default does nothing.
    fn sync_cache(&self, direction: CacheSync) -> Result<(), MemoryError> {
        let _ = direction;
        Ok(())
    }

    /// Base address, or null if the buffer is empty.
    fn as_ptr(&self) -> *mut u8;

    /// Size in bytes (0 if empty).
    fn size(&self) -> usize;

    /// `true` if this buffer is responsible for releasing its memory.
    fn is_owner(&self) -> bool;

    /// Returns a fresh, empty buffer of the same concrete kind in `space`.
    fn create_like(&self, space: MemorySpace) -> Box<dyn Buffer>;

    /// `true` if no memory is attached.
    fn is_empty(&self) -> bool {
        self.as_ptr().is_null()
    }

    /// Returns the buffer contents, or an empty slice if no memory is attached.
    fn as_bytes(&self) -> &[u8] {
        let ptr = self.as_ptr();
        if ptr.is_null() {
            return &[];
        }
        // SAFETY: allocated memory is zero-initialised and `size` long;
        // adopted memory is covered by the `adopt` contract.
        unsafe { std::slice::from_raw_parts(ptr, self.size()) }
    }

    /// Returns the buffer contents mutably.
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        let ptr = self.as_ptr();
        if ptr.is_null() {
            return &mut [];
        }
        // SAFETY: as in `as_bytes`; `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(ptr, self.size()) }
    }
}

enum PlainMemory {
    Empty,
    Owned(AlignedBuffer),
    Adopted { ptr: NonNull<u8>, size: usize },
}

/// A buffer that allocates directly from the aligned allocator.
///
/// Memory for every space is backed by host RAM; the space tag decides
/// pool bucketing and which operations are meaningful.
pub struct PlainBuffer {
    space: MemorySpace,
    memory: PlainMemory,
}

// SAFETY: owned memory is an AlignedBuffer (Send + Sync); adopted memory is
// only reachable through the `adopt` contract, which makes the caller
// responsible for its validity across threads.
unsafe impl Send for PlainBuffer {}
// SAFETY: see above; shared access never mutates the bookkeeping.
unsafe impl Sync for PlainBuffer {}

impl PlainBuffer {
    /// Creates an empty buffer in `space`.
    pub fn new(space: MemorySpace) -> Self {
        Self {
            space,
            memory: PlainMemory::Empty,
        }
    }

    /// Creates a buffer in `space` and allocates `size` bytes.
    pub fn with_size(space: MemorySpace, size: usize) -> Result<Self, MemoryError> {
        let mut buffer = Self::new(space);
        buffer.allocate(size)?;
        Ok(buffer)
    }
}

impl Buffer for PlainBuffer {
    fn memory_space(&self) -> MemorySpace {
        self.space
    }

    fn allocate(&mut self, size: usize) -> Result<NonNull<u8>, MemoryError> {
        if !self.space.is_valid() {
            return Err(MemoryError::UnsupportedMemorySpace {
                op: "allocate",
                space: self.space,
            });
        }
        self.free();
        self.memory = PlainMemory::Empty;
        let aligned = AlignedBuffer::allocate(size).map_err(|e| {
            tracing::error!("{} buffer: {e}", self.space);
            e
        })?;
        // SAFETY: AlignedBuffer pointers are never null.
        let ptr = unsafe { NonNull::new_unchecked(aligned.as_ptr()) };
        self.memory = PlainMemory::Owned(aligned);
        Ok(ptr)
    }

    unsafe fn adopt(&mut self, ptr: *mut u8, size: usize) -> Result<(), MemoryError> {
        let Some(ptr) = NonNull::new(ptr) else {
            tracing::error!("adopt rejected: null pointer");
            return Err(MemoryError::InvalidArgument("cannot adopt a null pointer".into()));
        };
        if size == 0 {
            tracing::error!("adopt rejected: zero size");
            return Err(MemoryError::InvalidArgument("cannot adopt a zero-sized region".into()));
        }
        self.free();
        self.memory = PlainMemory::Adopted { ptr, size };
        Ok(())
    }

    fn free(&mut self) {
        tracing::trace!(
            "free {} buffer, owner: {}, data: {:p}",
            self.space,
            self.is_owner(),
            self.as_ptr()
        );
        if let PlainMemory::Owned(_) = self.memory {
            self.memory = PlainMemory::Empty;
        }
    }

    fn as_ptr(&self) -> *mut u8 {
        match &self.memory {
            PlainMemory::Empty => std::ptr::null_mut(),
            PlainMemory::Owned(aligned) => aligned.as_ptr(),
            PlainMemory::Adopted { ptr, .. } => ptr.as_ptr(),
        }
    }

    fn size(&self) -> usize {
        match &self.memory {
            PlainMemory::Empty => 0,
            PlainMemory::Owned(aligned) => aligned.size(),
            PlainMemory::Adopted { size, .. } => *size,
        }
    }

    fn is_owner(&self) -> bool {
        matches!(self.memory, PlainMemory::Owned(_))
    }

    fn create_like(&self, space: MemorySpace) -> Box<dyn Buffer> {
        Box::new(PlainBuffer::new(space))
    }
}

impl fmt::Debug for PlainBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainBuffer")
            .field("space", &self.space)
            .field("size", &self.size())
            .field("owner", &self.is_owner())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let b = PlainBuffer::new(MemorySpace::Host);
        assert!(b.is_empty());
        assert_eq!(b.size(), 0);
        assert!(!b.is_owner());
        assert!(b.as_bytes().is_empty());
    }

    #[test]
    fn test_allocate_owns() {
        let mut b = PlainBuffer::new(MemorySpace::Host);
        let ptr = b.allocate(100).unwrap();
        assert_eq!(ptr.as_ptr(), b.as_ptr());
        assert_eq!(b.size(), 100);
        assert!(b.is_owner());
        assert_eq!(b.as_ptr() as usize % crate::MALLOC_ALIGN, 0);
    }

    #[test]
    fn test_free_resets_owned() {
        let mut b = PlainBuffer::with_size(MemorySpace::Host, 64).unwrap();
        b.free();
        assert!(b.is_empty());
        assert_eq!(b.size(), 0);
        // A second free is harmless.
        b.free();
        assert!(b.is_empty());
    }

    #[test]
    fn test_adopt_borrows() {
        let mut data = vec![7u8; 32];
        let mut b = PlainBuffer::new(MemorySpace::Host);
        unsafe { b.adopt(data.as_mut_ptr(), data.len()).unwrap() };
        assert!(!b.is_owner());
        assert_eq!(b.size(), 32);
        assert_eq!(b.as_ptr(), data.as_mut_ptr());

        // Freeing a borrower leaves the caller's memory attached and intact.
        b.free();
        assert_eq!(b.size(), 32);
        assert!(b.as_bytes().iter().all(|&x| x == 7));
    }

    #[test]
    fn test_adopt_rejects_null_and_zero() {
        let mut b = PlainBuffer::with_size(MemorySpace::Host, 16).unwrap();
        let before = b.as_ptr();

        let err = unsafe { b.adopt(std::ptr::null_mut(), 16) }.unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));

        let mut data = [0u8; 4];
        let err = unsafe { b.adopt(data.as_mut_ptr(), 0) }.unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));

        // State unchanged.
        assert_eq!(b.as_ptr(), before);
        assert!(b.is_owner());
        assert_eq!(b.size(), 16);
    }

    #[test]
    fn test_allocate_invalid_space() {
        let mut b = PlainBuffer::new(MemorySpace::Invalid);
        let err = b.allocate(8).unwrap_err();
        assert!(matches!(err, MemoryError::UnsupportedMemorySpace { .. }));
        assert!(b.is_empty());
    }

    #[test]
    fn test_sync_cache_default_ok() {
        let b = PlainBuffer::with_size(MemorySpace::OpenCl, 8).unwrap();
        assert!(b.sync_cache(CacheSync::ToDevice).is_ok());
        assert!(b.sync_cache(CacheSync::FromDevice).is_ok());
    }

    #[test]
    fn test_create_like() {
        let b = PlainBuffer::with_size(MemorySpace::Host, 8).unwrap();
        let like = b.create_like(MemorySpace::CudaHost);
        assert!(like.is_empty());
        assert_eq!(like.memory_space(), MemorySpace::CudaHost);
    }

    #[test]
    fn test_bytes_mut() {
        let mut b = PlainBuffer::with_size(MemorySpace::Host, 4).unwrap();
        b.as_bytes_mut().copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(b.as_bytes(), &[1, 2, 3, 4]);
    }
}
