// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `media-rt image` command: pixel-format layouts and plane offsets.

use super::banner;
use image_core::{Image, ImageLayout, PixelFormat};
use memory_manager::MemorySpace;

pub fn execute(width: usize, height: usize, number: usize, format: &str, all: bool) -> anyhow::Result<()> {
    if all {
        return list_formats(width, height);
    }

    let format: PixelFormat = format.parse()?;
    banner("media-rt · Image Layout");

    let image = Image::new(width, height, number, format, MemorySpace::Host)?;
    println!("  Format:    {format} (code {})", format.code());
    println!("  Geometry:  {width} x {height} x {number}");
    println!("  Channels:  {}", image.channels());
    println!("  Type size: {} bytes", image.type_size());
    println!("  Stride:    {} bytes", image.stride());
    println!("  Scalar:    {} bytes per frame", image.scalar());
    println!("  Size:      {} bytes", image.size());
    println!();

    if format.is_planar() {
        // ── Planes ─────────────────────────────────────────────
        println!("  Planes (frame 0)");
        let base = image.as_ptr::<u8>(0) as usize;
        for channel in 0..image.channels() {
            let plane = image.split_channel(0, channel)?;
            let offset = plane.as_ptr::<u8>(0) as usize - base;
            println!(
                "   channel {channel}: offset {offset:>10}  {} bytes as {}",
                plane.size(),
                plane.format()
            );
        }
        println!();
    }

    println!("{image}");
    Ok(())
}

fn list_formats(width: usize, height: usize) -> anyhow::Result<()> {
    banner("media-rt · Pixel Formats");
    println!(
        "  {:<4} {:<16} {:>3} {:>4} {:>10} {:>12}",
        "Code", "Format", "Ch", "TS", "Stride", "Scalar",
    );
    println!("  {}", "-".repeat(54));
    for format in PixelFormat::ALL {
        let ImageLayout {
            channels,
            type_size,
            stride,
            scalar,
        } = ImageLayout::compute(format, width, height)?;
        println!(
            "  {:<4} {:<16} {:>3} {:>4} {:>10} {:>12}",
            format.code(),
            format.as_str(),
            channels,
            type_size,
            stride,
            scalar,
        );
    }
    Ok(())
}
