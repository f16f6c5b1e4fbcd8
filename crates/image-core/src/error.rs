// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for image construction and manipulation.

use crate::{ImageLayout, PixelFormat};
use memory_manager::{MemoryError, MemorySpace};

/// Errors that can occur while building, viewing or copying images.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// Bad caller input: zero geometry, out-of-range batch or channel.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The pixel format has no layout rule. `fallback` is the 3-channel
    /// 1-byte packed geometry callers may still size a buffer from.
    #[error("unsupported pixel format {format}")]
    UnsupportedFormat {
        format: PixelFormat,
        fallback: ImageLayout,
    },

    /// The operation needs host pointer arithmetic the memory space does
    /// not allow.
    #[error("operation '{op}' is not supported for memory space {space}")]
    UnsupportedMemorySpace {
        op: &'static str,
        space: MemorySpace,
    },

    /// The image never finished construction.
    #[error("{op} called on an uninitialised image")]
    NotInitialized { op: &'static str },

    /// A buffer does not have the size the image geometry requires.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The backing buffer could not be obtained.
    #[error(transparent)]
    Memory(#[from] MemoryError),
}
