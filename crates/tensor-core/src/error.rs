// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor operations.

use crate::{DType, Shape};
use memory_manager::MemoryError;

/// Errors that can occur during tensor operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TensorError {
    /// The buffer is smaller than the shape and dtype require.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// The operation is not defined for this shape.
    #[error("unsupported shape {shape} for {op}")]
    UnsupportedShape { op: &'static str, shape: Shape },

    /// The requested data type is not supported for this operation.
    #[error("unsupported dtype {dtype} for operation {op}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    /// A layout code or name outside NCHW/NHWC.
    #[error("unsupported tensor layout {0}")]
    UnsupportedLayout(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The tensor was never given a buffer.
    #[error("{op} on an uninitialised tensor")]
    NotInitialized { op: &'static str },

    #[error(transparent)]
    Memory(#[from] MemoryError),
}
