// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor layout operations.
//!
//! Each operation has an allocating form and an `_into` form that writes a
//! pre-allocated output.

mod transpose_op;

pub use transpose_op::{transpose, transpose_into};
