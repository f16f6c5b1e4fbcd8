// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! 4-D tensors over the memory-manager buffers.
//!
//! This crate provides:
//! - [`Shape`] and [`TensorLayout`]: four dimensions in NCHW or NHWC order.
//! - [`DType`]: element types with their byte widths.
//! - [`TensorGeometry`]: stride, scalar and size derived from the above.
//! - [`Tensor`]: owned, adopted or borrowed tensor storage with typed access,
//!   batch views, in-place reshape and deep copies.
//! - [`ops::transpose`]: matrix transpose of the two innermost dimensions.
//!
//! # Example
//! ```
//! use tensor_core::{DType, Shape, Tensor, TensorLayout};
//! use memory_manager::{BufferPool, BufferSource, MemorySpace};
//!
//! let source = BufferSource::Pooled(BufferPool::default());
//! let t = Tensor::with_source(&source, Shape::new([2, 3, 8, 8]), TensorLayout::Nchw, DType::F32, MemorySpace::Host).unwrap();
//! assert_eq!(t.scalar(), 3 * 8 * 8 * 4);
//!
//! let item = t.batch_view(1).unwrap();
//! assert_eq!(item.size(), t.scalar());
//! ```

mod dtype;
mod error;
pub mod ops;
mod shape;
mod tensor;

pub use dtype::{DType, Element};
pub use error::TensorError;
pub use ops::transpose;
pub use shape::{Shape, TensorGeometry, TensorLayout, RANK};
pub use tensor::Tensor;
