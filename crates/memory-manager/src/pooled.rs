// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A [`Buffer`] that leases its memory from a [`BufferPool`].
//!
//! [`PooledBuffer`] is the RAII handle over a pool lease. Freeing or
//! dropping it hands the block back to the pool instead of the allocator,
//! so the next buffer of the same space and size reuses the memory:
//!
//! ```text
//! PooledBuffer::allocate(size)
//!       │
//!       ▼
//!   BufferPool::allocate ──► PoolLease (moved into the buffer)
//!       │
//!       │  free() / drop()
//!       ▼
//!   BufferPool::release(lease)  ──► block zeroed on next reuse
//! ```

use crate::{BlockId, Buffer, BufferPool, MemoryError, MemorySpace, PlainBuffer, PoolLease};
use std::fmt;
use std::ptr::NonNull;

enum PooledMemory {
    Empty,
    Leased(PoolLease),
    Adopted(PlainBuffer),
}

/// A pool-backed buffer. Dropping it returns the block to its pool.
pub struct PooledBuffer {
    pool: BufferPool,
    space: MemorySpace,
    memory: PooledMemory,
}

impl PooledBuffer {
    /// Creates an empty buffer in `space` bound to `pool`.
    pub fn new(pool: BufferPool, space: MemorySpace) -> Self {
        Self {
            pool,
            space,
            memory: PooledMemory::Empty,
        }
    }

    /// Creates a buffer and leases `size` bytes from `pool` right away.
    pub fn with_size(pool: BufferPool, space: MemorySpace, size: usize) -> Result<Self, MemoryError> {
        let mut buffer = Self::new(pool, space);
        buffer.allocate(size)?;
        Ok(buffer)
    }

    /// The pool block currently leased, if any.
    pub fn id(&self) -> Option<BlockId> {
        match &self.memory {
            PooledMemory::Leased(lease) => Some(lease.id()),
            _ => None,
        }
    }

    /// The pool this buffer leases from.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }
}

impl Buffer for PooledBuffer {
    fn memory_space(&self) -> MemorySpace {
        self.space
    }

    fn allocate(&mut self, size: usize) -> Result<NonNull<u8>, MemoryError> {
        self.free();
        self.memory = PooledMemory::Empty;
        let lease = self.pool.allocate(self.space, size)?;
        let Some(ptr) = NonNull::new(lease.as_ptr()) else {
            self.pool.release(lease);
            return Err(MemoryError::AllocationFailed { requested: size });
        };
        tracing::trace!("pooled {} buffer leased block {}", self.space, lease.id());
        self.memory = PooledMemory::Leased(lease);
        Ok(ptr)
    }

    unsafe fn adopt(&mut self, ptr: *mut u8, size: usize) -> Result<(), MemoryError> {
        let mut plain = PlainBuffer::new(self.space);
        // SAFETY: forwarded caller contract.
        unsafe { plain.adopt(ptr, size)? };
        self.free();
        self.memory = PooledMemory::Adopted(plain);
        Ok(())
    }

    fn free(&mut self) {
        match std::mem::replace(&mut self.memory, PooledMemory::Empty) {
            PooledMemory::Leased(lease) => self.pool.release(lease),
            other => self.memory = other,
        }
    }

    fn as_ptr(&self) -> *mut u8 {
        match &self.memory {
            PooledMemory::Empty => std::ptr::null_mut(),
            PooledMemory::Leased(lease) => lease.as_ptr(),
            PooledMemory::Adopted(plain) => plain.as_ptr(),
        }
    }

    fn size(&self) -> usize {
        match &self.memory {
            PooledMemory::Empty => 0,
            PooledMemory::Leased(lease) => lease.size(),
            PooledMemory::Adopted(plain) => plain.size(),
        }
    }

    fn is_owner(&self) -> bool {
        matches!(self.memory, PooledMemory::Leased(_))
    }

    fn create_like(&self, space: MemorySpace) -> Box<dyn Buffer> {
        Box::new(PooledBuffer::new(self.pool.clone(), space))
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.free();
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("space", &self.space)
            .field("id", &self.id())
            .field("size", &self.size())
            .field("owner", &self.is_owner())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_returns_block() {
        let pool = BufferPool::default();
        let id = {
            let b = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, 1024).unwrap();
            assert!(b.is_owner());
            b.id().unwrap()
        };
        let snap = pool.snapshot();
        assert!(!snap.spaces[0].buckets[0].blocks[0].in_use);

        let again = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, 1024).unwrap();
        assert_eq!(again.id(), Some(id));
        assert_eq!(pool.stats().reuse_hits, 1);
    }

    #[test]
    fn test_free_then_reallocate() {
        let pool = BufferPool::default();
        let mut b = PooledBuffer::new(pool.clone(), MemorySpace::Host);
        assert!(b.is_empty());
        b.allocate(64).unwrap();
        let first = b.id();
        b.free();
        assert!(b.is_empty());
        assert_eq!(b.id(), None);

        b.allocate(64).unwrap();
        assert_eq!(b.id(), first);
    }

    #[test]
    fn test_reallocate_releases_previous() {
        let pool = BufferPool::default();
        let mut b = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, 32).unwrap();
        b.allocate(48).unwrap();
        assert_eq!(b.size(), 48);
        assert_eq!(pool.stats().releases, 1);
        assert_eq!(pool.tracked_bytes(MemorySpace::Host), 80);
    }

    #[test]
    fn test_write_through_lease() {
        let pool = BufferPool::default();
        let mut b = PooledBuffer::with_size(pool, MemorySpace::Host, 4).unwrap();
        b.as_bytes_mut().copy_from_slice(&[9, 8, 7, 6]);
        assert_eq!(b.as_bytes(), &[9, 8, 7, 6]);
    }

    #[test]
    fn test_reused_block_is_zeroed_and_exclusive() {
        let pool = BufferPool::default();
        let mut first = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, 32).unwrap();
        first.as_bytes_mut().fill(0xAB);
        let id = first.id();
        drop(first);

        let mut second = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, 32).unwrap();
        assert_eq!(second.id(), id);
        assert!(second.as_bytes().iter().all(|&b| b == 0));
        second.as_bytes_mut().fill(0x11);

        let mut third = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, 32).unwrap();
        assert_ne!(third.id(), id);
        assert_ne!(third.as_ptr(), second.as_ptr());
        third.as_bytes_mut().fill(0x22);
        assert!(second.as_bytes().iter().all(|&b| b == 0x11));
    }

    #[test]
    fn test_adopt_is_not_pooled() {
        let pool = BufferPool::default();
        let mut data = vec![1u8; 16];
        let mut b = PooledBuffer::new(pool.clone(), MemorySpace::Host);
        unsafe { b.adopt(data.as_mut_ptr(), data.len()).unwrap() };
        assert!(!b.is_owner());
        assert_eq!(b.id(), None);
        drop(b);
        assert_eq!(pool.snapshot().num_blocks(), 0);
        assert_eq!(data[0], 1);
    }

    #[test]
    fn test_adopt_releases_lease() {
        let pool = BufferPool::default();
        let mut b = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, 16).unwrap();
        let mut data = [0u8; 8];
        unsafe { b.adopt(data.as_mut_ptr(), data.len()).unwrap() };
        assert_eq!(pool.stats().releases, 1);
        assert_eq!(b.size(), 8);
    }

    #[test]
    fn test_capacity_error_propagates() {
        let pool = BufferPool::new(crate::PoolConfig {
            capacity: crate::Capacity::from_bytes(100),
            max_expand_times: 0,
            idle_timeout_secs: 5,
        });
        let err = PooledBuffer::with_size(pool, MemorySpace::Host, 200).unwrap_err();
        assert!(err.is_allocation_failure());
    }

    #[test]
    fn test_create_like_shares_pool() {
        let pool = BufferPool::default();
        let b = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, 8).unwrap();
        let mut like = b.create_like(MemorySpace::OpenCl);
        assert!(like.is_empty());
        like.allocate(8).unwrap();
        assert_eq!(pool.tracked_bytes(MemorySpace::OpenCl), 8);
    }
}
