// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reusable buffer pool with idle eviction and capacity hysteresis.
//!
//! The [`BufferPool`] keeps every block it ever handed out, bucketed by
//! memory space and exact byte size:
//!
//! ```text
//! MemorySpace ──► size ──► BlockId ──► PoolEntry { buffer, in_use, last_changed }
//! ```
//!
//! 1. Releasing a lease only flips its block to idle; the memory stays
//!    resident so the next request of the same `(space, size)` reuses it
//!    (zeroed) without touching the allocator.
//! 2. Idle blocks older than the idle timeout are evicted at the start of
//!    every allocation in that space.
//! 3. Per-space tracked bytes are bounded by a capacity ceiling that doubles
//!    on demand (at most `max_expand_times` times) and halves again when a
//!    space's usage falls below half of it.
//!
//! # Thread Safety
//! `BufferPool` is a cheap `Clone` handle (`Arc` inside) and is
//! `Send + Sync`. Every operation runs under one pool-wide mutex; the lock
//! is never held across I/O, so hold times are bounded by bucket size.

use crate::{
    BlockSnapshot, Buffer, BucketSnapshot, MemoryError, MemorySpace, PlainBuffer, PoolConfig,
    PoolSnapshot, PoolStats, SpaceSnapshot,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant};

/// Identifies one block inside the pool. Ids are sequential and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One pooled block: the shared buffer, its in-use flag and the time of its
/// last state change.
#[derive(Debug)]
pub struct PoolEntry {
    buffer: Arc<PlainBuffer>,
    in_use: bool,
    last_changed: Instant,
}

impl PoolEntry {
    fn new(buffer: Arc<PlainBuffer>, in_use: bool) -> Self {
        Self {
            buffer,
            in_use,
            last_changed: Instant::now(),
        }
    }

    fn set_in_use(&mut self, in_use: bool) {
        self.in_use = in_use;
        self.last_changed = Instant::now();
    }

    /// `true` while the block is leased out.
    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    /// Time of the last lease or release.
    pub fn last_changed(&self) -> Instant {
        self.last_changed
    }

    /// Block size in bytes.
    pub fn size(&self) -> usize {
        self.buffer.size()
    }

    fn is_evictable(&self, now: Instant, timeout: Duration) -> bool {
        !self.in_use && now.saturating_duration_since(self.last_changed) > timeout
    }
}

/// A block handed out by [`BufferPool::allocate`].
///
/// A lease is the only handle to its block's bytes and cannot be copied.
/// [`BufferPool::release`] consumes it, so nothing outside the pool can
/// reach a block once it is idle. Byte access goes through
/// [`PooledBuffer`](crate::PooledBuffer).
///
/// ```compile_fail
/// use memory_manager::{BufferPool, MemorySpace};
///
/// let pool = BufferPool::default();
/// let lease = pool.allocate(MemorySpace::Host, 16).unwrap();
/// pool.release(lease);
/// let _ = lease.id();
/// ```
///
/// ```compile_fail
/// use memory_manager::{BufferPool, MemorySpace, PoolLease};
///
/// let pool = BufferPool::default();
/// let lease = pool.allocate(MemorySpace::Host, 16).unwrap();
/// let kept: PoolLease = lease.clone();
/// pool.release(lease);
/// pool.release(kept);
/// ```
///
/// ```compile_fail
/// use memory_manager::{BufferPool, MemorySpace};
///
/// let pool = BufferPool::default();
/// let lease = pool.allocate(MemorySpace::Host, 16).unwrap();
/// let bytes = std::sync::Arc::clone(&lease.buffer);
/// pool.release(lease);
/// ```
#[derive(Debug)]
pub struct PoolLease {
    id: BlockId,
    space: MemorySpace,
    size: usize,
    buffer: Arc<PlainBuffer>,
}

impl PoolLease {
    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn space(&self) -> MemorySpace {
        self.space
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.buffer.as_ptr()
    }
}

type IdBucket = BTreeMap<BlockId, PoolEntry>;
type SizeBuckets = HashMap<usize, IdBucket>;

struct PoolState {
    buckets: HashMap<MemorySpace, SizeBuckets>,
    tracked: HashMap<MemorySpace, usize>,
    capacity: usize,
    expand_times: u32,
    max_expand_times: u32,
    idle_timeout: Duration,
    last_id: u32,
    stats: PoolStats,
}

impl PoolState {
    fn tracked(&self, space: MemorySpace) -> usize {
        self.tracked.get(&space).copied().unwrap_or(0)
    }

    fn expand(&mut self) -> bool {
        if self.expand_times < self.max_expand_times {
            self.expand_times += 1;
            self.capacity = self.capacity.saturating_mul(2);
            self.stats.expansions += 1;
            tracing::debug!("pool capacity expanded to {} bytes", self.capacity);
            true
        } else {
            false
        }
    }

    fn shrink(&mut self) -> bool {
        if self.expand_times >= 1 {
            self.expand_times -= 1;
            self.capacity /= 2;
            self.stats.shrinks += 1;
            tracing::debug!("pool capacity shrunk to {} bytes", self.capacity);
            true
        } else {
            false
        }
    }

    fn collect(&mut self, space: MemorySpace) {
        let Some(sizes) = self.buckets.get_mut(&space) else {
            tracing::trace!("collect: no buckets for {space}");
            return;
        };
        let now = Instant::now();
        let timeout = self.idle_timeout;
        let stats = &mut self.stats;
        let mut reclaimed = 0usize;

        sizes.retain(|&size, ids| {
            ids.retain(|id, entry| {
                if entry.is_evictable(now, timeout) {
                    tracing::debug!("evict {space} block {id} ({size} bytes)");
                    stats.record_eviction(size);
                    reclaimed += size;
                    false
                } else {
                    true
                }
            });
            !ids.is_empty()
        });

        if reclaimed > 0 {
            let tracked = self.tracked.entry(space).or_insert(0);
            *tracked = tracked.saturating_sub(reclaimed);
        }
    }

    /// Allocates a brand-new block, growing the capacity if needed.
    fn create_block(&mut self, space: MemorySpace, size: usize) -> Result<PoolLease, MemoryError> {
        while self.tracked(space).saturating_add(size) > self.capacity {
            if !self.expand() {
                self.stats.record_failure();
                let err = MemoryError::CapacityExhausted {
                    space,
                    requested: size,
                    tracked: self.tracked(space),
                    capacity: self.capacity,
                    expansions: self.expand_times,
                };
                tracing::error!("{err}");
                return Err(err);
            }
        }

        let buffer = Arc::new(PlainBuffer::with_size(space, size)?);
        let tracked = self.tracked.entry(space).or_insert(0);
        *tracked += size;
        let tracked = *tracked;
        self.stats.record_fresh();
        self.stats.update_peak(tracked);

        self.last_id += 1;
        let id = BlockId(self.last_id);
        self.buckets
            .entry(space)
            .or_default()
            .entry(size)
            .or_default()
            .insert(id, PoolEntry::new(Arc::clone(&buffer), true));
        tracing::debug!("allocated {space} block {id} ({size} bytes, {tracked} tracked)");

        Ok(PoolLease {
            id,
            space,
            size,
            buffer,
        })
    }

    /// Hands out the lowest-id idle block, zeroed like a fresh allocation.
    fn reuse_block(&mut self, space: MemorySpace, size: usize) -> Option<PoolLease> {
        let ids = self.buckets.get_mut(&space)?.get_mut(&size)?;
        let (&id, entry) = ids
            .iter_mut()
            .find(|(_, entry)| !entry.is_in_use() && Arc::strong_count(&entry.buffer) == 1)?;
        let plain = Arc::get_mut(&mut entry.buffer)?;
        plain.as_bytes_mut().fill(0);
        entry.set_in_use(true);
        let buffer = Arc::clone(&entry.buffer);
        self.stats.record_reuse();
        tracing::debug!("reuse {space} block {id} ({size} bytes)");
        Some(PoolLease {
            id,
            space,
            size,
            buffer,
        })
    }
}

struct PoolInner {
    state: Mutex<PoolState>,
}

/// A pool of reusable buffers keyed by `(MemorySpace, size)`.
///
/// # Example
/// ```
/// use memory_manager::{BufferPool, MemorySpace, PoolConfig};
///
/// let pool = BufferPool::new(PoolConfig::default());
///
/// let first = pool.allocate(MemorySpace::Host, 1000).unwrap();
/// let id = first.id();
/// pool.release(first);
///
/// // The idle block is handed out again instead of allocating.
/// let second = pool.allocate(MemorySpace::Host, 1000).unwrap();
/// assert_eq!(second.id(), id);
/// ```
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Creates an empty pool.
    pub fn new(config: PoolConfig) -> Self {
        tracing::debug!(
            "buffer pool created: capacity {}, {} expansions, idle timeout {}s",
            config.capacity,
            config.max_expand_times,
            config.idle_timeout_secs
        );
        Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState {
                    buckets: HashMap::new(),
                    tracked: HashMap::new(),
                    capacity: config.capacity.as_bytes(),
                    expand_times: 0,
                    max_expand_times: config.max_expand_times,
                    idle_timeout: config.idle_timeout(),
                    last_id: 0,
                    stats: PoolStats::default(),
                }),
            }),
        }
    }

    /// The process-wide default pool, created with [`PoolConfig::default`] on
    /// first use and alive until the process exits.
    ///
    /// Prefer constructing a pool and passing it explicitly; this exists for
    /// callers that have no way to thread a handle through.
    pub fn global() -> &'static BufferPool {
        static GLOBAL: OnceLock<BufferPool> = OnceLock::new();
        GLOBAL.get_or_init(|| BufferPool::new(PoolConfig::default()))
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // A panic while holding the lock cannot leave an entry half-updated
        // in a way later operations rely on, so keep serving.
        self.inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Leases a block of exactly `size` bytes in `space`.
    ///
    /// Idle blocks of the same space and size are reused; otherwise a new
    /// block is allocated. Fails with [`MemoryError::CapacityExhausted`] when
    /// the space would exceed the capacity after the last allowed expansion,
    /// and with [`MemoryError::AllocationFailed`] when the allocator fails.
    pub fn allocate(&self, space: MemorySpace, size: usize) -> Result<PoolLease, MemoryError> {
        if !space.is_valid() {
            return Err(MemoryError::UnsupportedMemorySpace {
                op: "pool allocate",
                space,
            });
        }
        if size == 0 {
            return Err(MemoryError::InvalidArgument(
                "cannot pool a zero-sized buffer".into(),
            ));
        }

        let mut state = self.lock();
        tracing::trace!("pool allocate: {space}, {size} bytes");
        state.collect(space);
        while state.tracked(space) < state.capacity / 2 && state.shrink() {}

        if let Some(lease) = state.reuse_block(space, size) {
            return Ok(lease);
        }
        state.create_block(space, size)
    }

    /// Returns a leased block to the pool. The memory stays resident for
    /// reuse until it has been idle longer than the idle timeout.
    ///
    /// Leases this pool no longer tracks (after [`destroy`](Self::destroy),
    /// or from another pool) are ignored.
    pub fn release(&self, lease: PoolLease) {
        let PoolLease {
            id,
            space,
            size,
            buffer,
        } = lease;
        let mut state = self.lock();
        let entry = state
            .buckets
            .get_mut(&space)
            .and_then(|sizes| sizes.get_mut(&size))
            .and_then(|ids| ids.get_mut(&id));

        let accepted = match entry {
            Some(entry) if entry.is_in_use() && Arc::ptr_eq(&entry.buffer, &buffer) => {
                entry.set_in_use(false);
                tracing::debug!("release {space} block {id} ({size} bytes)");
                true
            }
            _ => {
                tracing::debug!("release of untracked {space} block {id} ({size} bytes) ignored");
                false
            }
        };
        // Drop the lease's reference while the lock is held so the idle
        // block is only referenced by the pool.
        drop(buffer);
        state.stats.record_release(accepted);
    }

    /// Evicts idle blocks of `space` that exceeded the idle timeout.
    pub fn collect(&self, space: MemorySpace) {
        self.lock().collect(space);
    }

    /// Changes the idle timeout for subsequent collections.
    pub fn set_idle_timeout(&self, timeout: Duration) {
        self.lock().idle_timeout = timeout;
    }

    /// Drops every tracked block and resets the byte totals.
    ///
    /// Outstanding leases keep their memory alive until they are dropped;
    /// releasing them afterwards is ignored. Ids keep counting up, so new
    /// blocks never collide with outstanding leases.
    pub fn destroy(&self) {
        let mut state = self.lock();
        tracing::debug!("buffer pool destroyed");
        state.buckets.clear();
        state.tracked.clear();
    }

    /// Current capacity ceiling in bytes.
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Number of capacity doublings currently in effect.
    pub fn expand_times(&self) -> u32 {
        self.lock().expand_times
    }

    /// Bytes tracked for `space` (leased and idle blocks alike).
    pub fn tracked_bytes(&self, space: MemorySpace) -> usize {
        self.lock().tracked(space)
    }

    /// Returns a copy of the cumulative statistics.
    pub fn stats(&self) -> PoolStats {
        self.lock().stats.clone()
    }

    /// Returns a sorted copy of the current bookkeeping.
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.lock();
        let mut spaces: Vec<SpaceSnapshot> = state
            .buckets
            .iter()
            .map(|(&space, sizes)| {
                let mut buckets: Vec<BucketSnapshot> = sizes
                    .iter()
                    .map(|(&size, ids)| BucketSnapshot {
                        size,
                        blocks: ids
                            .iter()
                            .map(|(&id, entry)| BlockSnapshot {
                                id,
                                in_use: entry.is_in_use(),
                            })
                            .collect(),
                    })
                    .collect();
                buckets.sort_by_key(|b| b.size);
                SpaceSnapshot {
                    space,
                    tracked_bytes: state.tracked(space),
                    buckets,
                }
            })
            .collect();
        spaces.sort_by_key(|s| s.space);
        PoolSnapshot {
            capacity: state.capacity,
            expand_times: state.expand_times,
            spaces,
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("BufferPool")
            .field("capacity", &state.capacity)
            .field("expand_times", &state.expand_times)
            .field("idle_timeout", &state.idle_timeout)
            .field("tracked", &state.tracked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Capacity;

    fn pool_with(capacity: usize, max_expand_times: u32) -> BufferPool {
        BufferPool::new(PoolConfig {
            capacity: Capacity::from_bytes(capacity),
            max_expand_times,
            idle_timeout_secs: 5,
        })
    }

    #[test]
    fn test_allocate_release_reuse_same_id() {
        let pool = BufferPool::default();
        let a = pool.allocate(MemorySpace::Host, 1000).unwrap();
        let (id, ptr) = (a.id(), a.as_ptr());
        pool.release(a);
        let b = pool.allocate(MemorySpace::Host, 1000).unwrap();

        assert_eq!(b.id(), id);
        assert_eq!(b.as_ptr(), ptr);
        let stats = pool.stats();
        assert_eq!(stats.fresh_allocations, 1);
        assert_eq!(stats.reuse_hits, 1);
    }

    #[test]
    fn test_lease_accessors() {
        let pool = BufferPool::default();
        let a = pool.allocate(MemorySpace::OpenCl, 48).unwrap();
        assert_eq!(a.space(), MemorySpace::OpenCl);
        assert_eq!(a.size(), 48);
        assert!(!a.as_ptr().is_null());
    }

    #[test]
    fn test_reused_block_is_zeroed() {
        let pool = BufferPool::default();
        let a = pool.allocate(MemorySpace::Host, 16).unwrap();
        let ptr = a.as_ptr();
        // SAFETY: the lease gives exclusive use of its 16 bytes.
        unsafe { std::ptr::write_bytes(ptr, 0xAB, 16) };
        pool.release(a);

        let b = pool.allocate(MemorySpace::Host, 16).unwrap();
        assert_eq!(b.as_ptr(), ptr);
        // SAFETY: as above, for the new lease.
        let bytes = unsafe { std::slice::from_raw_parts(b.as_ptr(), 16) };
        assert!(bytes.iter().all(|&x| x == 0));
    }

    #[test]
    fn test_in_use_blocks_not_reused() {
        let pool = BufferPool::default();
        let a = pool.allocate(MemorySpace::Host, 64).unwrap();
        let b = pool.allocate(MemorySpace::Host, 64).unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.as_ptr(), b.as_ptr());
        assert_eq!(pool.tracked_bytes(MemorySpace::Host), 128);
    }

    #[test]
    fn test_ids_are_sequential() {
        let pool = BufferPool::default();
        let a = pool.allocate(MemorySpace::Host, 10).unwrap();
        let b = pool.allocate(MemorySpace::Host, 20).unwrap();
        let c = pool.allocate(MemorySpace::OpenCl, 10).unwrap();
        assert_eq!((a.id(), b.id(), c.id()), (BlockId(1), BlockId(2), BlockId(3)));
    }

    #[test]
    fn test_sizes_do_not_share_blocks() {
        let pool = BufferPool::default();
        let a = pool.allocate(MemorySpace::Host, 100).unwrap();
        let id = a.id();
        pool.release(a);
        let b = pool.allocate(MemorySpace::Host, 101).unwrap();
        assert_ne!(b.id(), id);
    }

    #[test]
    fn test_spaces_do_not_share_blocks() {
        let pool = BufferPool::default();
        let a = pool.allocate(MemorySpace::Host, 100).unwrap();
        let id = a.id();
        pool.release(a);
        let b = pool.allocate(MemorySpace::CudaHost, 100).unwrap();
        assert_ne!(b.id(), id);
        assert_eq!(b.space(), MemorySpace::CudaHost);
        assert_eq!(pool.tracked_bytes(MemorySpace::Host), 100);
        assert_eq!(pool.tracked_bytes(MemorySpace::CudaHost), 100);
    }

    #[test]
    fn test_foreign_lease_release_ignored() {
        let pool = BufferPool::default();
        let other = BufferPool::default();
        let mine = pool.allocate(MemorySpace::Host, 256).unwrap();
        // Same space, size and id as `mine`, but a different block.
        let theirs = other.allocate(MemorySpace::Host, 256).unwrap();
        assert_eq!(theirs.id(), mine.id());

        let before = pool.snapshot();
        pool.release(theirs);
        assert_eq!(pool.snapshot(), before);
        assert!(pool.snapshot().spaces[0].buckets[0].blocks[0].in_use);

        let stats = pool.stats();
        assert_eq!(stats.releases, 0);
        assert_eq!(stats.ignored_releases, 1);

        // The rightful holder still releases normally.
        pool.release(mine);
        assert_eq!(pool.stats().releases, 1);
        assert!(!pool.snapshot().spaces[0].buckets[0].blocks[0].in_use);
    }

    #[test]
    fn test_idle_eviction() {
        let pool = BufferPool::default();
        let a = pool.allocate(MemorySpace::Host, 500).unwrap();
        pool.release(a);
        assert_eq!(pool.tracked_bytes(MemorySpace::Host), 500);

        pool.set_idle_timeout(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));
        pool.collect(MemorySpace::Host);

        assert_eq!(pool.tracked_bytes(MemorySpace::Host), 0);
        assert_eq!(pool.snapshot().num_blocks(), 0);
        let stats = pool.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.evicted_bytes, 500);
    }

    #[test]
    fn test_in_use_never_evicted() {
        let pool = BufferPool::default();
        pool.set_idle_timeout(Duration::ZERO);
        let _a = pool.allocate(MemorySpace::Host, 300).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        pool.collect(MemorySpace::Host);
        assert_eq!(pool.tracked_bytes(MemorySpace::Host), 300);
        assert_eq!(pool.snapshot().num_blocks(), 1);
    }

    #[test]
    fn test_eviction_before_allocate() {
        let pool = BufferPool::default();
        let a = pool.allocate(MemorySpace::Host, 128).unwrap();
        let id = a.id();
        pool.release(a);
        pool.set_idle_timeout(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));

        // The stale block is collected first, so a fresh id is issued.
        let b = pool.allocate(MemorySpace::Host, 128).unwrap();
        assert_ne!(b.id(), id);
        assert_eq!(pool.tracked_bytes(MemorySpace::Host), 128);
    }

    #[test]
    fn test_idle_within_timeout_survives_collect() {
        let pool = BufferPool::default();
        let a = pool.allocate(MemorySpace::Host, 128).unwrap();
        pool.release(a);
        pool.collect(MemorySpace::Host);
        assert_eq!(pool.snapshot().num_blocks(), 1);
    }

    #[test]
    fn test_expand_on_demand() {
        let pool = pool_with(1000, 3);
        let _a = pool.allocate(MemorySpace::Host, 800).unwrap();
        assert_eq!(pool.capacity(), 1000);

        let _b = pool.allocate(MemorySpace::Host, 800).unwrap();
        assert_eq!(pool.capacity(), 2000);
        assert_eq!(pool.expand_times(), 1);
    }

    #[test]
    fn test_capacity_exhausted() {
        let pool = pool_with(1000, 2);
        // 4000 bytes is the ceiling after two doublings.
        let err = pool.allocate(MemorySpace::Host, 5000).unwrap_err();
        assert!(matches!(
            err,
            MemoryError::CapacityExhausted {
                requested: 5000,
                capacity: 4000,
                expansions: 2,
                ..
            }
        ));
        assert!(err.is_allocation_failure());
        assert_eq!(pool.tracked_bytes(MemorySpace::Host), 0);
        assert_eq!(pool.snapshot().num_blocks(), 0);
        assert_eq!(pool.stats().capacity_failures, 1);

        // A request within the expanded ceiling still succeeds.
        assert!(pool.allocate(MemorySpace::Host, 4000).is_ok());
    }

    #[test]
    fn test_shrink_when_underused() {
        let pool = pool_with(1000, 3);
        let a = pool.allocate(MemorySpace::Host, 3000).unwrap();
        assert_eq!(pool.capacity(), 4000);
        pool.release(a);

        pool.set_idle_timeout(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));

        // The 3000-byte block is evicted, usage drops to zero, and the
        // capacity halves back down to the base before the new block.
        let _b = pool.allocate(MemorySpace::Host, 100).unwrap();
        assert_eq!(pool.capacity(), 1000);
        assert_eq!(pool.expand_times(), 0);
        assert_eq!(pool.stats().shrinks, 2);
    }

    #[test]
    fn test_never_shrinks_below_base() {
        let pool = pool_with(1000, 3);
        let _a = pool.allocate(MemorySpace::Host, 10).unwrap();
        let _b = pool.allocate(MemorySpace::Host, 10).unwrap();
        assert_eq!(pool.capacity(), 1000);
        assert_eq!(pool.stats().shrinks, 0);
    }

    #[test]
    fn test_zero_size_rejected() {
        let pool = BufferPool::default();
        let err = pool.allocate(MemorySpace::Host, 0).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[test]
    fn test_invalid_space_rejected() {
        let pool = BufferPool::default();
        let err = pool.allocate(MemorySpace::Invalid, 8).unwrap_err();
        assert!(matches!(err, MemoryError::UnsupportedMemorySpace { .. }));
    }

    #[test]
    fn test_destroy_clears_everything() {
        let pool = BufferPool::default();
        let a = pool.allocate(MemorySpace::Host, 64).unwrap();
        let _b = pool.allocate(MemorySpace::OpenCl, 64).unwrap();
        pool.destroy();
        assert_eq!(pool.snapshot().num_blocks(), 0);
        assert_eq!(pool.tracked_bytes(MemorySpace::Host), 0);

        // The outstanding lease still owns live memory.
        assert!(!a.as_ptr().is_null());
        pool.release(a);
        assert_eq!(pool.stats().ignored_releases, 1);
        assert_eq!(pool.snapshot().num_blocks(), 0);
    }

    #[test]
    fn test_lease_from_before_destroy_cannot_release_new_block() {
        let pool = BufferPool::default();
        let stale = pool.allocate(MemorySpace::Host, 64).unwrap();
        pool.destroy();
        let fresh = pool.allocate(MemorySpace::Host, 64).unwrap();
        assert_ne!(fresh.id(), stale.id());

        pool.release(stale);
        assert!(pool.snapshot().spaces[0].buckets[0].blocks[0].in_use);
        drop(fresh);
    }

    #[test]
    fn test_tracked_equals_sum_of_blocks() {
        let pool = BufferPool::default();
        let sizes = [100, 200, 100, 300, 200];
        let mut leases: Vec<_> = sizes
            .iter()
            .map(|&s| pool.allocate(MemorySpace::Host, s).unwrap())
            .collect();
        pool.release(leases.remove(3));

        let snap = pool.snapshot();
        let host = &snap.spaces[0];
        let sum: usize = host.buckets.iter().map(|b| b.size * b.blocks.len()).sum();
        assert_eq!(sum, host.tracked_bytes);
        assert_eq!(sum, sizes.iter().sum::<usize>());
    }

    #[test]
    fn test_concurrent_allocate_release() {
        let pool = BufferPool::default();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let lease = pool.allocate(MemorySpace::Host, 4096).unwrap();
                        pool.release(lease);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = pool.snapshot();
        assert!(snap.num_blocks() <= 8);
        assert!(snap.spaces[0].buckets[0].blocks.iter().all(|b| !b.in_use));
        let stats = pool.stats();
        assert_eq!(stats.reuse_hits + stats.fresh_allocations, 800);
        assert_eq!(stats.releases, 800);
    }

    #[test]
    fn test_global_is_shared() {
        let a = BufferPool::global() as *const BufferPool;
        let b = BufferPool::global() as *const BufferPool;
        assert_eq!(a, b);
    }

    #[test]
    fn test_debug_format() {
        let debug = format!("{:?}", BufferPool::default());
        assert!(debug.contains("BufferPool"));
        assert!(debug.contains("capacity"));
    }
}
