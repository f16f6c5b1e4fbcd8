// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `media-rt tensor` command: tensor geometry for a shape, layout and dtype.

use super::banner;
use memory_manager::MemorySpace;
use tensor_core::{ops, DType, Shape, Tensor, TensorLayout};

pub fn execute(shape: &str, layout: &str, dtype: &str, transpose: bool) -> anyhow::Result<()> {
    let shape: Shape = shape.parse()?;
    let layout: TensorLayout = layout.parse()?;
    let dtype: DType = dtype.parse()?;

    banner("media-rt · Tensor Geometry");

    let tensor = Tensor::new(shape, layout, dtype, MemorySpace::Host)?;
    println!("  Shape:     {shape} ({layout})");
    println!("  DType:     {dtype} ({} bytes)", dtype.size_bytes());
    println!("  Elements:  {}", tensor.count());
    println!("  Stride:    {} bytes", tensor.stride());
    println!("  Scalar:    {} bytes per batch item", tensor.scalar());
    println!("  Size:      {} bytes", tensor.size());
    println!();
    println!("{tensor}");

    if transpose {
        let transposed = ops::transpose(&tensor)?;
        println!();
        println!("  Transposed");
        println!("{transposed}");
    }
    Ok(())
}
