// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matrix transpose over the two innermost dimensions.

use crate::{DType, Shape, Tensor, TensorError};

fn matrix_dims(input: &Tensor<'_>) -> Result<(usize, usize), TensorError> {
    if input.dtype() != DType::F32 {
        return Err(TensorError::UnsupportedDType {
            op: "transpose",
            dtype: input.dtype(),
        });
    }
    match input.shape().dims() {
        [1, 1, rows, cols] => Ok((rows, cols)),
        _ => Err(TensorError::UnsupportedShape {
            op: "transpose",
            shape: input.shape(),
        }),
    }
}

/// Transposes a `[1, 1, rows, cols]` F32 tensor into a new
/// `[1, 1, cols, rows]` tensor with the same layout, memory space and
/// buffer kind.
///
/// # Errors
/// Returns [`TensorError::UnsupportedShape`] unless dims 0 and 1 are 1.
/// Returns [`TensorError::UnsupportedDType`] if the dtype is not `F32`.
///
/// # Examples
/// ```
/// use tensor_core::{ops, Shape, Tensor, TensorLayout};
///
/// let m = Tensor::from_f32(Shape::matrix(2, 3), TensorLayout::Nchw, &[1., 2., 3., 4., 5., 6.]).unwrap();
/// let t = ops::transpose(&m).unwrap();
/// assert_eq!(t.shape(), Shape::matrix(3, 2));
/// assert_eq!(t.as_f32_slice().unwrap(), &[1., 4., 2., 5., 3., 6.]);
/// ```
pub fn transpose(input: &Tensor<'_>) -> Result<Tensor<'static>, TensorError> {
    if !input.is_ready() {
        return Err(TensorError::NotInitialized { op: "transpose" });
    }
    let (rows, cols) = matrix_dims(input)?;
    let mut output = input.like(Shape::matrix(cols, rows))?;
    transpose_into(input, &mut output)?;
    Ok(output)
}

/// Writes the transpose of `input` into `output`, which must already have
/// shape `[1, 1, cols, rows]` and dtype `F32`.
pub fn transpose_into(input: &Tensor<'_>, output: &mut Tensor<'_>) -> Result<(), TensorError> {
    let (rows, cols) = matrix_dims(input)?;
    let expected = Shape::matrix(cols, rows);
    if output.shape() != expected {
        return Err(TensorError::UnsupportedShape {
            op: "transpose_into",
            shape: output.shape(),
        });
    }

    let src = input.as_f32_slice()?;
    let dst = output.as_f32_slice_mut()?;
    for (i, row) in src.chunks_exact(cols).enumerate() {
        for (j, &v) in row.iter().enumerate() {
            dst[j * rows + i] = v;
        }
    }
    Ok(())
}
