// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `media-rt pool` command: exercise a buffer pool and report its state.
//!
//! Every cycle leases `hold` buffers of the same size and drops them again,
//! so after the first cycle every request should be served by reuse.

use super::banner;
use anyhow::Context;
use memory_manager::{Buffer, BufferPool, Capacity, MemorySpace, PoolConfig, PooledBuffer};
use std::path::PathBuf;
use std::time::Instant;

pub fn execute(size: &str, cycles: usize, hold: usize, config: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let size = Capacity::parse(size)?.as_bytes();
    let config = match config {
        Some(path) => PoolConfig::from_file(&path)
            .with_context(|| format!("failed to load pool config '{}'", path.display()))?,
        None => PoolConfig::default(),
    };
    tracing::info!(?config, size, cycles, hold, "starting pool exercise");

    let pool = BufferPool::new(config);
    let start = Instant::now();
    for cycle in 0..cycles {
        let mut held = Vec::with_capacity(hold);
        for _ in 0..hold {
            let mut buffer = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, size)
                .with_context(|| format!("cycle {cycle}: allocation of {size} bytes failed"))?;
            buffer.as_bytes_mut()[0] = cycle as u8;
            held.push(buffer);
        }
    }
    let elapsed = start.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(&pool.snapshot())?);
        return Ok(());
    }

    banner("media-rt · Buffer Pool");
    let stats = pool.stats();
    println!("  Cycles:    {cycles} x {hold} buffers of {size} bytes");
    println!("  Elapsed:   {:.3} ms", elapsed.as_secs_f64() * 1000.0);
    println!("  Reuse:     {:.1}%", stats.reuse_ratio() * 100.0);
    println!("  Capacity:  {} bytes ({} expansions)", pool.capacity(), pool.expand_times());
    println!();
    println!("{}", stats.summary());
    println!();
    print!("{}", pool.snapshot());
    Ok(())
}
