// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pool statistics and bookkeeping snapshots.
//!
//! [`PoolStats`] accumulates counters over the pool's lifetime: how often a
//! request was served by reusing an idle block, how often fresh memory was
//! needed, and how the capacity moved. [`PoolSnapshot`] captures the current
//! bucket layout for debugging.

use crate::{BlockId, MemorySpace};
use std::fmt;

/// Cumulative statistics about buffer pool usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    /// Total number of allocation requests.
    pub total_requests: u64,
    /// Requests served by reusing an idle block.
    pub reuse_hits: u64,
    /// Requests that needed a fresh block.
    pub fresh_allocations: u64,
    /// Requests refused because the capacity could not grow any further.
    pub capacity_failures: u64,
    /// Blocks handed back to the pool.
    pub releases: u64,
    /// Releases for unknown or already released blocks.
    pub ignored_releases: u64,
    /// Idle blocks evicted by collection.
    pub evictions: u64,
    /// Bytes reclaimed by collection.
    pub evicted_bytes: u64,
    /// Capacity doublings.
    pub expansions: u64,
    /// Capacity halvings.
    pub shrinks: u64,
    /// Highest tracked byte total seen in any single memory space.
    pub peak_tracked_bytes: usize,
}

impl PoolStats {
    /// Returns the fraction of successful requests served by reuse, in `[0.0, 1.0]`.
    pub fn reuse_ratio(&self) -> f64 {
        let served = self.reuse_hits + self.fresh_allocations;
        if served == 0 {
            return 0.0;
        }
        self.reuse_hits as f64 / served as f64
    }

    pub(crate) fn record_reuse(&mut self) {
        self.total_requests += 1;
        self.reuse_hits += 1;
    }

    pub(crate) fn record_fresh(&mut self) {
        self.total_requests += 1;
        self.fresh_allocations += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.total_requests += 1;
        self.capacity_failures += 1;
    }

    pub(crate) fn record_release(&mut self, accepted: bool) {
        if accepted {
            self.releases += 1;
        } else {
            self.ignored_releases += 1;
        }
    }

    pub(crate) fn record_eviction(&mut self, size: usize) {
        self.evictions += 1;
        self.evicted_bytes += size as u64;
    }

    pub(crate) fn update_peak(&mut self, tracked: usize) {
        self.peak_tracked_bytes = self.peak_tracked_bytes.max(tracked);
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Pool: {} requests ({} reused, {} fresh, {:.0}% reuse), {} capacity failures, \
             {} releases ({} ignored), {} evictions ({} bytes), {} expansions, {} shrinks, \
             peak {} bytes",
            self.total_requests,
            self.reuse_hits,
            self.fresh_allocations,
            self.reuse_ratio() * 100.0,
            self.capacity_failures,
            self.releases,
            self.ignored_releases,
            self.evictions,
            self.evicted_bytes,
            self.expansions,
            self.shrinks,
            self.peak_tracked_bytes,
        )
    }
}

/// One pooled block in a [`PoolSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BlockSnapshot {
    pub id: BlockId,
    pub in_use: bool,
}

/// All blocks of one byte size in one memory space.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BucketSnapshot {
    pub size: usize,
    pub blocks: Vec<BlockSnapshot>,
}

/// The buckets of one memory space.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SpaceSnapshot {
    pub space: MemorySpace,
    pub tracked_bytes: usize,
    pub buckets: Vec<BucketSnapshot>,
}

/// A point-in-time copy of the pool bookkeeping, sorted by space, size and id.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PoolSnapshot {
    pub capacity: usize,
    pub expand_times: u32,
    pub spaces: Vec<SpaceSnapshot>,
}

impl PoolSnapshot {
    /// Total number of blocks across every space and bucket.
    pub fn num_blocks(&self) -> usize {
        self.spaces
            .iter()
            .flat_map(|s| &s.buckets)
            .map(|b| b.blocks.len())
            .sum()
    }
}

impl fmt::Display for PoolSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "buffer pool: capacity {} bytes, {} expansions", self.capacity, self.expand_times)?;
        for space in &self.spaces {
            writeln!(f, "  {}: {} bytes tracked", space.space, space.tracked_bytes)?;
            for bucket in &space.buckets {
                write!(f, "    {} bytes:", bucket.size)?;
                for block in &bucket.blocks {
                    let state = if block.in_use { "in use" } else { "idle" };
                    write!(f, " {}({state})", block.id)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
