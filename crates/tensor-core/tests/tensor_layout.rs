// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Geometry and buffer behaviour across shapes, layouts and dtypes.

use memory_manager::{Buffer, BufferPool, BufferSource, MemorySpace, PooledBuffer};
use tensor_core::{ops, DType, Shape, Tensor, TensorError, TensorGeometry, TensorLayout};

const SHAPES: [[usize; 4]; 5] = [[1, 1, 1, 1], [1, 3, 4, 5], [2, 3, 224, 224], [4, 7, 1, 9], [3, 1, 100, 50]];

#[test]
fn test_size_is_scalar_times_batch() {
    for dims in SHAPES {
        for layout in [TensorLayout::Nchw, TensorLayout::Nhwc] {
            for dtype in DType::ALL {
                let g = TensorGeometry::compute(Shape::new(dims), layout, dtype).unwrap();
                assert_eq!(g.size, g.scalar * dims[0], "{dims:?} {layout} {dtype}");
                assert_eq!(g.size, Shape::new(dims).num_elements() * dtype.size_bytes());
            }
        }
    }
}

#[test]
fn test_layout_selects_width_dimension() {
    let shape = Shape::new([1, 2, 3, 4]);
    let nchw = TensorGeometry::compute(shape, TensorLayout::Nchw, DType::F32).unwrap();
    let nhwc = TensorGeometry::compute(shape, TensorLayout::Nhwc, DType::F32).unwrap();
    assert_eq!(nchw.stride, 4 * 4);
    assert_eq!(nhwc.stride, 3 * 4);
    assert_eq!(nchw.scalar, nhwc.scalar);
}

#[test]
fn test_matrix_tensor_geometry() {
    let t = Tensor::new(Shape::matrix(100, 50), TensorLayout::Nchw, DType::F32, MemorySpace::Host).unwrap();
    assert_eq!(t.stride(), 200);
    assert_eq!(t.scalar(), 20000);
    assert_eq!(t.size(), 20000);
    assert_eq!(t.count(), 5000);
    assert_eq!(t.as_bytes().len(), 20000);
}

#[test]
fn test_every_dtype_allocates() {
    for dtype in DType::ALL {
        let t = Tensor::new(Shape::new([2, 3, 4, 5]), TensorLayout::Nhwc, dtype, MemorySpace::Host).unwrap();
        assert_eq!(t.type_size(), dtype.size_bytes());
        assert_eq!(t.count(), 120);
    }
}

#[test]
fn test_layout_codes() {
    assert!(matches!(
        TensorLayout::from_code(2),
        Err(TensorError::UnsupportedLayout(_))
    ));
    assert!(matches!(
        "NDHWC".parse::<TensorLayout>(),
        Err(TensorError::UnsupportedLayout(_))
    ));
}

#[test]
fn test_from_pooled_buffer() {
    let pool = BufferPool::default();
    let buffer = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, 4 * 16).unwrap();
    let id = buffer.id();
    let t = Tensor::from_buffer(Box::new(buffer), Shape::matrix(4, 4), TensorLayout::Nchw, DType::F32).unwrap();
    assert_eq!(t.size(), 64);
    drop(t);

    let again = PooledBuffer::with_size(pool.clone(), MemorySpace::Host, 64).unwrap();
    assert_eq!(again.id(), id);
    assert_eq!(again.size(), 64);
}

#[test]
fn test_batch_views_tile_the_tensor() {
    let values: Vec<f32> = (0..3 * 2 * 2 * 2).map(|v| v as f32).collect();
    let t = Tensor::from_f32(Shape::new([3, 2, 2, 2]), TensorLayout::Nchw, &values).unwrap();
    let mut joined = Vec::new();
    for n in 0..3 {
        let view = t.batch_view(n).unwrap();
        assert_eq!(view.as_ptr::<u8>(0), t.as_ptr::<u8>(n));
        joined.extend_from_slice(view.as_f32_slice().unwrap());
    }
    assert_eq!(joined, values);
}

#[test]
fn test_pooled_transpose_round_trip() {
    let source = BufferSource::Pooled(BufferPool::default());
    let mut m = Tensor::with_source(&source, Shape::matrix(3, 5), TensorLayout::Nchw, DType::F32, MemorySpace::Host)
        .unwrap();
    for (i, v) in m.as_f32_slice_mut().unwrap().iter_mut().enumerate() {
        *v = i as f32;
    }
    let t = ops::transpose(&m).unwrap();
    assert_eq!(t.data_at::<f32>(1).unwrap(), 5.0);
    assert_eq!(ops::transpose(&t).unwrap(), m);
}

#[test]
fn test_adopted_memory_round_trip() {
    let mut data = vec![0u8; 2 * 2 * 4];
    {
        let mut t = Tensor::from_slice(&mut data, Shape::matrix(2, 2), TensorLayout::Nchw, DType::U32, MemorySpace::Host)
            .unwrap();
        t.as_bytes_mut().unwrap()[4..8].copy_from_slice(&7u32.to_ne_bytes());
        assert_eq!(t.data_at::<u32>(1).unwrap(), 7);
        let copy = t.try_clone().unwrap();
        assert!(copy.is_owner());
        assert_eq!(copy, t);
    }
    assert_eq!(&data[4..8], &7u32.to_ne_bytes());
}

#[test]
fn test_geometry_serialises() {
    let g = TensorGeometry::compute(Shape::new([1, 3, 2, 2]), TensorLayout::Nchw, DType::U8).unwrap();
    let json = serde_json::to_value(g).unwrap();
    assert_eq!(json["stride"], 2);
    assert_eq!(json["scalar"], 12);
    let shape = serde_json::to_string(&Shape::new([1, 3, 2, 2])).unwrap();
    assert_eq!(shape, "[1,3,2,2]");
}
