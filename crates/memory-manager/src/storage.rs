// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Backing storage for structured views (images and tensors).
//!
//! A view either owns its buffer, adopts caller memory, or borrows a byte
//! range of another view's buffer. The three cases are one enum so the
//! borrow checker ties every borrowed view to its source:
//!
//! | variant    | releases memory | lifetime bound        |
//! |------------|-----------------|-----------------------|
//! | `Owned`    | yes (on drop)   | none                  |
//! | `Adopted`  | no              | the caller's slice    |
//! | `Borrowed` | no              | the source buffer     |

use crate::{Buffer, BufferPool, CacheSync, MemoryError, MemorySpace, PlainBuffer, PooledBuffer};
use std::marker::PhantomData;

/// Where a view's bytes live.
#[derive(Debug)]
pub enum Storage<'a> {
    /// A buffer this view owns and releases on drop.
    Owned(Box<dyn Buffer>),
    /// Caller memory, installed without copying.
    Adopted(PlainBuffer, PhantomData<&'a mut [u8]>),
    /// A read-only window `[offset, offset + len)` into another buffer.
    Borrowed {
        buffer: &'a dyn Buffer,
        offset: usize,
        len: usize,
    },
}

impl<'a> Storage<'a> {
    /// Wraps caller memory without copying; the slice stays borrowed for as
    /// long as the storage lives.
    pub fn adopt_slice(data: &'a mut [u8], space: MemorySpace) -> Result<Self, MemoryError> {
        let mut plain = PlainBuffer::new(space);
        // SAFETY: the slice is valid, initialised and exclusively borrowed
        // for 'a, which bounds the storage.
        unsafe { plain.adopt(data.as_mut_ptr(), data.len())? };
        Ok(Storage::Adopted(plain, PhantomData))
    }

    /// Borrows `[offset, offset + len)` of `buffer`, bounds-checked against
    /// the buffer size.
    pub fn borrow(buffer: &'a dyn Buffer, offset: usize, len: usize) -> Result<Self, MemoryError> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| MemoryError::InvalidArgument("view range overflows".into()))?;
        if end > buffer.size() {
            return Err(MemoryError::InvalidArgument(format!(
                "view [{offset}, {end}) exceeds buffer of {} bytes",
                buffer.size()
            )));
        }
        Ok(Storage::Borrowed {
            buffer,
            offset,
            len,
        })
    }

    /// The underlying buffer (the whole buffer, even for a borrowed window).
    pub fn buffer(&self) -> &dyn Buffer {
        match self {
            Storage::Owned(buffer) => &**buffer,
            Storage::Adopted(plain, _) => plain,
            Storage::Borrowed { buffer, .. } => *buffer,
        }
    }

    fn offset(&self) -> usize {
        match self {
            Storage::Borrowed { offset, .. } => *offset,
            _ => 0,
        }
    }

    /// Start of this storage's bytes, or null if the buffer is empty.
    pub fn as_ptr(&self) -> *mut u8 {
        let base = self.buffer().as_ptr();
        if base.is_null() {
            return base;
        }
        // SAFETY: `borrow` checked offset + len against the buffer size.
        unsafe { base.add(self.offset()) }
    }

    /// Number of bytes visible through this storage.
    pub fn len(&self) -> usize {
        match self {
            Storage::Borrowed { len, .. } => *len,
            _ => self.buffer().size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn memory_space(&self) -> MemorySpace {
        self.buffer().memory_space()
    }

    /// `true` only when dropping this storage releases memory.
    pub fn is_owner(&self) -> bool {
        match self {
            Storage::Owned(buffer) => buffer.is_owner(),
            _ => false,
        }
    }

    /// `true` for borrowed windows.
    pub fn is_borrowed(&self) -> bool {
        matches!(self, Storage::Borrowed { .. })
    }

    pub fn as_bytes(&self) -> &[u8] {
        let offset = self.offset();
        &self.buffer().as_bytes()[offset..offset + self.len()]
    }

    /// Mutable access to the bytes; `None` for borrowed windows.
    pub fn as_bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Storage::Owned(buffer) => Some(buffer.as_bytes_mut()),
            Storage::Adopted(plain, _) => Some(plain.as_bytes_mut()),
            Storage::Borrowed { .. } => None,
        }
    }

    pub fn sync_cache(&self, direction: CacheSync) -> Result<(), MemoryError> {
        self.buffer().sync_cache(direction)
    }

    /// Borrows a sub-range of this storage. `offset` is relative to the
    /// start of this storage.
    pub fn reborrow(&self, offset: usize, len: usize) -> Result<Storage<'_>, MemoryError> {
        let base = self.offset();
        if offset.saturating_add(len) > self.len() {
            return Err(MemoryError::InvalidArgument(format!(
                "view [{offset}, {}) exceeds storage of {} bytes",
                offset.saturating_add(len),
                self.len()
            )));
        }
        Storage::borrow(self.buffer(), base + offset, len)
    }
}

impl Storage<'static> {
    /// Wraps a raw caller pointer without copying.
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `size` initialised bytes
    /// for as long as the returned storage (or any view of it) is used.
    pub unsafe fn adopt_raw(
        ptr: *mut u8,
        size: usize,
        space: MemorySpace,
    ) -> Result<Self, MemoryError> {
        let mut plain = PlainBuffer::new(space);
        // SAFETY: forwarded caller contract.
        unsafe { plain.adopt(ptr, size)? };
        Ok(Storage::Adopted(plain, PhantomData))
    }
}

impl From<Box<dyn Buffer>> for Storage<'_> {
    fn from(buffer: Box<dyn Buffer>) -> Self {
        Storage::Owned(buffer)
    }
}

/// Which allocator a new view draws its buffer from.
#[derive(Debug, Clone, Default)]
pub enum BufferSource {
    /// Fresh aligned allocations ([`PlainBuffer`]).
    #[default]
    Plain,
    /// Leases from a pool ([`PooledBuffer`]).
    Pooled(BufferPool),
}

impl BufferSource {
    /// An empty buffer of this source's kind.
    pub fn create(&self, space: MemorySpace) -> Box<dyn Buffer> {
        match self {
            BufferSource::Plain => Box::new(PlainBuffer::new(space)),
            BufferSource::Pooled(pool) => Box::new(PooledBuffer::new(pool.clone(), space)),
        }
    }

    /// A buffer of this source's kind holding `size` bytes.
    pub fn allocate(&self, space: MemorySpace, size: usize) -> Result<Box<dyn Buffer>, MemoryError> {
        let mut buffer = self.create(space);
        buffer.allocate(size)?;
        Ok(buffer)
    }
}

/// Copies `rows` rows of `row_bytes` between two strided regions.
///
/// Equal strides copy the whole block at once; otherwise rows are copied
/// one by one.
pub fn copy_rows(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    row_bytes: usize,
    rows: usize,
) -> Result<(), MemoryError> {
    if rows == 0 || row_bytes == 0 {
        return Ok(());
    }
    if row_bytes > src_stride || row_bytes > dst_stride {
        return Err(MemoryError::InvalidArgument(format!(
            "row of {row_bytes} bytes exceeds stride ({src_stride} -> {dst_stride})"
        )));
    }
    let extent = |stride: usize| (rows - 1).checked_mul(stride).and_then(|n| n.checked_add(row_bytes));
    let src_end = extent(src_stride).filter(|&end| end <= src.len());
    let dst_end = extent(dst_stride).filter(|&end| end <= dst.len());
    let (Some(src_end), Some(dst_end)) = (src_end, dst_end) else {
        return Err(MemoryError::SizeMismatch {
            expected: rows * row_bytes,
            actual: src.len().min(dst.len()),
        });
    };

    if src_stride == dst_stride {
        dst[..dst_end].copy_from_slice(&src[..src_end]);
    } else {
        for (s, d) in src
            .chunks(src_stride)
            .zip(dst.chunks_mut(dst_stride))
            .take(rows)
        {
            d[..row_bytes].copy_from_slice(&s[..row_bytes]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adopt_slice_does_not_own() {
        let mut data = vec![3u8; 10];
        {
            let mut s = Storage::adopt_slice(&mut data, MemorySpace::Host).unwrap();
            assert!(!s.is_owner());
            assert_eq!(s.len(), 10);
            s.as_bytes_mut().unwrap()[0] = 42;
        }
        assert_eq!(data[0], 42);
    }

    #[test]
    fn test_adopt_empty_slice_rejected() {
        let mut data: Vec<u8> = Vec::new();
        let err = Storage::adopt_slice(&mut data, MemorySpace::Host).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[test]
    fn test_owned_storage() {
        let buffer = BufferSource::Plain.allocate(MemorySpace::Host, 16).unwrap();
        let s = Storage::from(buffer);
        assert!(s.is_owner());
        assert_eq!(s.len(), 16);
        assert!(!s.is_borrowed());
    }

    #[test]
    fn test_borrow_window() {
        let mut buffer = PlainBuffer::with_size(MemorySpace::Host, 8).unwrap();
        buffer.as_bytes_mut().copy_from_slice(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let view = Storage::borrow(&buffer, 2, 4).unwrap();
        assert_eq!(view.as_bytes(), &[2, 3, 4, 5]);
        assert_eq!(view.as_ptr(), unsafe { buffer.as_ptr().add(2) });
        assert!(!view.is_owner());
        assert!(view.is_borrowed());
    }

    #[test]
    fn test_borrow_out_of_range() {
        let buffer = PlainBuffer::with_size(MemorySpace::Host, 8).unwrap();
        assert!(Storage::borrow(&buffer, 4, 5).is_err());
        assert!(Storage::borrow(&buffer, usize::MAX, 2).is_err());
    }

    #[test]
    fn test_borrowed_is_read_only() {
        let buffer = PlainBuffer::with_size(MemorySpace::Host, 8).unwrap();
        let mut view = Storage::borrow(&buffer, 0, 8).unwrap();
        assert!(view.as_bytes_mut().is_none());
    }

    #[test]
    fn test_reborrow_accumulates_offset() {
        let mut buffer = PlainBuffer::with_size(MemorySpace::Host, 8).unwrap();
        buffer.as_bytes_mut().copy_from_slice(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let outer = Storage::borrow(&buffer, 2, 6).unwrap();
        let inner = outer.reborrow(1, 3).unwrap();
        assert_eq!(inner.as_bytes(), &[3, 4, 5]);
        assert!(outer.reborrow(4, 3).is_err());
    }

    #[test]
    fn test_pooled_source_returns_to_pool() {
        let pool = BufferPool::default();
        let source = BufferSource::Pooled(pool.clone());
        drop(source.allocate(MemorySpace::Host, 100).unwrap());
        let again = source.allocate(MemorySpace::Host, 100).unwrap();
        assert_eq!(again.size(), 100);
        assert_eq!(pool.stats().reuse_hits, 1);
    }

    #[test]
    fn test_copy_rows_same_stride() {
        let src = [1u8, 2, 3, 4, 5, 6];
        let mut dst = [0u8; 6];
        copy_rows(&src, 3, &mut dst, 3, 3, 2).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn test_copy_rows_different_stride() {
        // Two rows of 2 bytes, source padded to 4, destination packed.
        let src = [1u8, 2, 9, 9, 3, 4, 9, 9];
        let mut dst = [0u8; 4];
        copy_rows(&src, 4, &mut dst, 2, 2, 2).unwrap();
        assert_eq!(dst, [1, 2, 3, 4]);
    }

    #[test]
    fn test_copy_rows_too_short() {
        let src = [0u8; 4];
        let mut dst = [0u8; 8];
        let err = copy_rows(&src, 4, &mut dst, 4, 4, 2).unwrap_err();
        assert!(matches!(err, MemoryError::SizeMismatch { .. }));
    }
}
