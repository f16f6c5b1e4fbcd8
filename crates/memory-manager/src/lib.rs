// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-manager
//!
//! Aligned allocation, memory-space tagged buffers and a reusable buffer
//! pool shared by the image and tensor crates.
//!
//! # Key Components
//!
//! - [`AlignedBuffer`]: SIMD-aligned, zeroed allocation with an over-read
//!   margin so vector kernels may read past the logical end.
//! - [`Buffer`]: the byte-buffer trait. [`PlainBuffer`] allocates directly;
//!   [`PooledBuffer`] leases from a [`BufferPool`].
//! - [`BufferPool`]: buckets blocks by `(MemorySpace, size)`, reuses idle
//!   blocks, evicts stale ones and grows or shrinks its capacity ceiling.
//! - [`Storage`]: owned, adopted or borrowed backing bytes for views.
//! - [`PoolConfig`], [`PoolStats`], [`PoolSnapshot`]: tuning, counters and
//!   debug dumps.
//!
//! # Ownership Model
//!
//! ```text
//! PooledBuffer::allocate(size)
//!       │
//!       ▼
//!   BufferPool ──► PoolLease (move-only, owned by the PooledBuffer)
//!       │
//!       │  drop()
//!       ▼
//!   BufferPool::release(lease) ──► idle, zeroed when reused
//! ```
//!
//! # Example
//! ```
//! use memory_manager::{Buffer, BufferPool, MemorySpace, PooledBuffer};
//!
//! let pool = BufferPool::default();
//!
//! let a = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, 4096).unwrap();
//! let id = a.id();
//! drop(a);
//!
//! let b = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, 4096).unwrap();
//! assert_eq!(b.id(), id);
//! assert_eq!(b.size(), 4096);
//! ```

mod aligned;
mod buffer;
mod capacity;
mod config;
mod error;
pub mod pool;
mod pooled;
mod space;
mod stats;
mod storage;

pub use aligned::{AlignedBuffer, MALLOC_ALIGN, MALLOC_OVERREAD};
pub use buffer::{Buffer, CacheSync, PlainBuffer};
pub use capacity::{Capacity, DEFAULT_CAPACITY_BYTES};
pub use config::PoolConfig;
pub use error::MemoryError;
pub use pool::{BlockId, BufferPool, PoolEntry, PoolLease};
pub use pooled::PooledBuffer;
pub use space::MemorySpace;
pub use stats::{BlockSnapshot, BucketSnapshot, PoolSnapshot, PoolStats, SpaceSnapshot};
pub use storage::{copy_rows, BufferSource, Storage};
