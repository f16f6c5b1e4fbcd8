// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Aligned heap allocation with an over-read margin.
//!
//! Vectorised kernels interleave the next iteration's loads with the
//! current arithmetic, so they may read a little past the logical end of
//! a buffer. Every [`AlignedBuffer`] therefore reserves
//! [`MALLOC_OVERREAD`] addressable bytes after its logical size, and its
//! base address is a multiple of [`MALLOC_ALIGN`].

use crate::MemoryError;
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

/// Alignment of every buffer, matched to the widest enabled SIMD unit.
pub const MALLOC_ALIGN: usize = if cfg!(target_feature = "avx512f") {
    64
} else if cfg!(target_feature = "avx") {
    32
} else {
    16
};

/// Extra addressable bytes past the logical end of every buffer.
pub const MALLOC_OVERREAD: usize = 64;

/// An owned, aligned, zero-initialised heap region.
///
/// Memory is released exactly once, when the value is dropped.
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    size: usize,
}

// SAFETY: AlignedBuffer uniquely owns its allocation; the raw pointer is
// never shared outside of borrows tied to `&self` / `&mut self`.
unsafe impl Send for AlignedBuffer {}
// SAFETY: shared access only hands out `&[u8]` or raw pointers.
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    /// Allocates `size` logical bytes (plus the over-read margin).
    ///
    /// Returns [`MemoryError::AllocationFailed`] if the layout is not
    /// representable or the system allocator returns null. Never aborts.
    pub fn allocate(size: usize) -> Result<Self, MemoryError> {
        let layout = Self::layout(size)?;
        // SAFETY: the layout has a non-zero size (the margin is always
        // added) and a power-of-two alignment.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(MemoryError::AllocationFailed { requested: size })?;
        tracing::trace!("aligned alloc {size} bytes at {ptr:p}");
        Ok(Self { ptr, size })
    }

    fn layout(size: usize) -> Result<Layout, MemoryError> {
        let total = size
            .checked_add(MALLOC_OVERREAD)
            .ok_or(MemoryError::AllocationFailed { requested: size })?;
        Layout::from_size_align(total, MALLOC_ALIGN)
            .map_err(|_| MemoryError::AllocationFailed { requested: size })
    }

    /// Returns the logical size in bytes (excluding the margin).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the aligned base address.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Returns the logical bytes.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the region is initialised (zeroed) and at least `size` long.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    /// Returns the logical bytes mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        tracing::trace!("aligned free {} bytes at {:p}", self.size, self.ptr);
        // SAFETY: this exact layout was validated in `allocate`.
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.size + MALLOC_OVERREAD, MALLOC_ALIGN);
            dealloc(self.ptr.as_ptr(), layout);
        }
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .finish()
    }
}
