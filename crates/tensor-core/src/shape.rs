// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! 4-D shapes, memory layouts and the derived byte geometry.
//!
//! Which shape index holds width, height and channels depends on the layout:
//!
//! ```text
//!          dim0   dim1   dim2   dim3
//! NCHW      N      C      H      W
//! NHWC      N      H      W      C
//! ```
//!
//! Geometry is always `stride = W * type_size`, `scalar = C * H * stride`,
//! `size = scalar * N`.

use crate::{DType, TensorError};
use std::fmt;
use std::str::FromStr;

/// Number of dimensions every tensor carries.
pub const RANK: usize = 4;

/// The four dimensions of a [`crate::Tensor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape([usize; RANK]);

impl Shape {
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new([2, 3, 4, 5]);
    /// assert_eq!(s.dim(1), Some(3));
    /// assert_eq!(s.num_elements(), 120);
    /// ```
    pub fn new(dims: [usize; RANK]) -> Self {
        Self(dims)
    }

    /// A single matrix: `[1, 1, rows, cols]`.
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self([1, 1, rows, cols])
    }

    pub fn dims(&self) -> [usize; RANK] {
        self.0
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.0.get(index).copied()
    }

    pub fn num_elements(&self) -> usize {
        self.0.iter().product()
    }

    /// `true` if any dimension is zero.
    pub fn has_zero_dim(&self) -> bool {
        self.0.contains(&0)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [n, c, h, w] = self.0;
        write!(f, "[{n},{c},{h},{w}]")
    }
}

impl From<[usize; RANK]> for Shape {
    fn from(dims: [usize; RANK]) -> Self {
        Self(dims)
    }
}

impl TryFrom<&[usize]> for Shape {
    type Error = TensorError;

    fn try_from(dims: &[usize]) -> Result<Self, Self::Error> {
        <[usize; RANK]>::try_from(dims).map(Self).map_err(|_| {
            TensorError::InvalidArgument(format!(
                "tensor shape needs {RANK} dimensions, got {}",
                dims.len()
            ))
        })
    }
}

impl TryFrom<Vec<usize>> for Shape {
    type Error = TensorError;

    fn try_from(dims: Vec<usize>) -> Result<Self, Self::Error> {
        Self::try_from(dims.as_slice())
    }
}

/// Parses `"1,3,224,224"`.
impl FromStr for Shape {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dims = s
            .split(',')
            .map(|d| {
                d.trim()
                    .parse::<usize>()
                    .map_err(|e| TensorError::InvalidArgument(format!("bad dimension '{d}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::try_from(dims)
    }
}

// ── Layout ───────────────────────────────────────────────────────

/// Dimension order of a tensor's memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum TensorLayout {
    #[default]
    Nchw = 0,
    Nhwc = 1,
}

impl TensorLayout {
    pub fn from_code(code: u32) -> Result<Self, TensorError> {
        match code {
            0 => Ok(TensorLayout::Nchw),
            1 => Ok(TensorLayout::Nhwc),
            other => Err(TensorError::UnsupportedLayout(format!("code {other}"))),
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TensorLayout::Nchw => "NCHW",
            TensorLayout::Nhwc => "NHWC",
        }
    }

    /// Shape indices of `(width, height, channels)`.
    pub fn whc_indices(self) -> (usize, usize, usize) {
        match self {
            TensorLayout::Nchw => (3, 2, 1),
            TensorLayout::Nhwc => (2, 1, 3),
        }
    }
}

impl fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TensorLayout {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NCHW" => Ok(TensorLayout::Nchw),
            "NHWC" => Ok(TensorLayout::Nhwc),
            _ => Err(TensorError::UnsupportedLayout(s.to_string())),
        }
    }
}

// ── Geometry ─────────────────────────────────────────────────────

/// Byte geometry derived from a shape, layout and element type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TensorGeometry {
    /// Bytes per row (`W * type_size`).
    pub stride: usize,
    /// Bytes per batch item (`C * H * stride`).
    pub scalar: usize,
    /// Bytes for the whole tensor (`scalar * N`).
    pub size: usize,
    pub type_size: usize,
}

impl TensorGeometry {
    /// # Examples
    /// ```
    /// use tensor_core::{DType, Shape, TensorGeometry, TensorLayout};
    ///
    /// let g = TensorGeometry::compute(Shape::matrix(100, 50), TensorLayout::Nchw, DType::F32).unwrap();
    /// assert_eq!((g.stride, g.scalar, g.size), (200, 20000, 20000));
    /// ```
    pub fn compute(shape: Shape, layout: TensorLayout, dtype: DType) -> Result<Self, TensorError> {
        let dims = shape.dims();
        let (w, h, c) = layout.whc_indices();
        let type_size = dtype.size_bytes();
        let overflow = || TensorError::InvalidArgument(format!("shape {shape} overflows usize bytes"));

        let stride = dims[w].checked_mul(type_size).ok_or_else(overflow)?;
        let scalar = dims[c]
            .checked_mul(dims[h])
            .and_then(|n| n.checked_mul(stride))
            .ok_or_else(overflow)?;
        let size = scalar.checked_mul(dims[0]).ok_or_else(overflow)?;
        Ok(Self {
            stride,
            scalar,
            size,
            type_size,
        })
    }
}
