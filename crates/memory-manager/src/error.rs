// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for buffer allocation and pooling.

use crate::MemorySpace;

/// Errors that can occur while allocating, adopting or pooling buffers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// Bad caller input: null adopted pointer, zero size, out-of-range index.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying allocator could not provide the requested bytes.
    #[error("allocation of {requested} bytes failed")]
    AllocationFailed { requested: usize },

    /// The pool would exceed its capacity even after spending its whole
    /// expansion budget.
    #[error(
        "pool capacity exhausted for {space}: requested {requested} bytes with {tracked} tracked \
         (capacity {capacity}, {expansions} expansions used)"
    )]
    CapacityExhausted {
        space: MemorySpace,
        requested: usize,
        tracked: usize,
        capacity: usize,
        expansions: u32,
    },

    /// The operation has no meaning for buffers in this memory space.
    #[error("operation '{op}' is not supported for memory space {space}")]
    UnsupportedMemorySpace {
        op: &'static str,
        space: MemorySpace,
    },

    /// Two buffers that must agree in size do not.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Pool configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MemoryError {
    /// Returns `true` for the errors callers must treat as a hard allocation
    /// failure (allocator failure or pool exhaustion).
    pub fn is_allocation_failure(&self) -> bool {
        matches!(
            self,
            MemoryError::AllocationFailed { .. } | MemoryError::CapacityExhausted { .. }
        )
    }
}
