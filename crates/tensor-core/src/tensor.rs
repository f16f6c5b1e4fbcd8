// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type over memory-space tagged buffers.
//!
//! A [`Tensor`] is a 4-D shape, a [`TensorLayout`] and an element
//! [`DType`] laid over a byte buffer. Its byte geometry comes from
//! [`TensorGeometry::compute`]; batch item `n` starts at byte `n * scalar`.
//!
//! Like images, tensors own a buffer, adopt caller memory, or borrow a
//! window of another tensor ([`Tensor::batch_view`]).

use crate::{DType, Element, Shape, TensorError, TensorGeometry, TensorLayout};
use memory_manager::{Buffer, BufferSource, CacheSync, MemorySpace, Storage};
use std::fmt;

/// A 4-D tensor.
///
/// `Tensor::default()` is uninitialised: [`is_ready`](Tensor::is_ready) is
/// `false` and data accessors fail with [`TensorError::NotInitialized`].
#[derive(Debug, Default)]
pub struct Tensor<'a> {
    shape: Shape,
    layout: TensorLayout,
    dtype: DType,
    geometry: TensorGeometry,
    name: String,
    storage: Option<Storage<'a>>,
}

fn geometry(shape: Shape, layout: TensorLayout, dtype: DType) -> Result<TensorGeometry, TensorError> {
    if shape.has_zero_dim() {
        return Err(TensorError::InvalidArgument(format!(
            "tensor shape {shape} has a zero dimension"
        )));
    }
    TensorGeometry::compute(shape, layout, dtype)
}

impl Tensor<'static> {
    /// Allocates a zeroed plain buffer.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{DType, Shape, Tensor, TensorLayout};
    /// use memory_manager::MemorySpace;
    ///
    /// let t = Tensor::new(Shape::matrix(2, 3), TensorLayout::Nchw, DType::F32, MemorySpace::Host).unwrap();
    /// assert_eq!(t.size(), 24);
    /// assert_eq!(t.count(), 6);
    /// ```
    pub fn new(
        shape: Shape,
        layout: TensorLayout,
        dtype: DType,
        space: MemorySpace,
    ) -> Result<Self, TensorError> {
        Self::with_source(&BufferSource::Plain, shape, layout, dtype, space)
    }

    /// Host NCHW tensor filled with zeros.
    pub fn zeros(shape: Shape, dtype: DType) -> Result<Self, TensorError> {
        Self::new(shape, TensorLayout::Nchw, dtype, MemorySpace::Host)
    }

    /// Allocates from `source` (plain or pooled). The bytes start zeroed
    /// either way; pooled blocks are cleared when they are reused.
    pub fn with_source(
        source: &BufferSource,
        shape: Shape,
        layout: TensorLayout,
        dtype: DType,
        space: MemorySpace,
    ) -> Result<Self, TensorError> {
        Self::allocate_into(source.create(space), shape, layout, dtype, String::new())
    }

    fn allocate_into(
        mut buffer: Box<dyn Buffer>,
        shape: Shape,
        layout: TensorLayout,
        dtype: DType,
        name: String,
    ) -> Result<Self, TensorError> {
        let geometry = geometry(shape, layout, dtype)?;
        buffer.allocate(geometry.size)?;
        let tensor = Self {
            shape,
            layout,
            dtype,
            geometry,
            name,
            storage: Some(Storage::Owned(buffer)),
        };
        tracing::debug!("allocated {tensor}");
        Ok(tensor)
    }

    /// Takes ownership of an already allocated buffer. The buffer may be
    /// larger than the tensor, never smaller.
    pub fn from_buffer(
        buffer: Box<dyn Buffer>,
        shape: Shape,
        layout: TensorLayout,
        dtype: DType,
    ) -> Result<Self, TensorError> {
        let geometry = geometry(shape, layout, dtype)?;
        if buffer.size() < geometry.size {
            tracing::error!("from_buffer: {} bytes for {shape} {dtype}", buffer.size());
            return Err(TensorError::BufferSizeMismatch {
                expected: geometry.size,
                actual: buffer.size(),
            });
        }
        Ok(Self {
            shape,
            layout,
            dtype,
            geometry,
            name: String::new(),
            storage: Some(Storage::Owned(buffer)),
        })
    }

    /// Creates a host tensor by copying `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Shape, Tensor, TensorLayout};
    /// let t = Tensor::from_f32(Shape::matrix(1, 3), TensorLayout::Nchw, &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.as_f32_slice().unwrap(), &[1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, layout: TensorLayout, values: &[f32]) -> Result<Self, TensorError> {
        let expected_elements = shape.num_elements();
        if values.len() != expected_elements {
            return Err(TensorError::BufferSizeMismatch {
                expected: expected_elements * DType::F32.size_bytes(),
                actual: values.len() * DType::F32.size_bytes(),
            });
        }
        let mut tensor = Self::new(shape, layout, DType::F32, MemorySpace::Host)?;
        tensor.as_slice_mut::<f32>()?.copy_from_slice(values);
        Ok(tensor)
    }

    /// Wraps caller memory without copying.
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of the tensor's byte size
    /// for as long as the tensor (or any view of it) is used.
    pub unsafe fn from_raw_parts(
        ptr: *mut u8,
        shape: Shape,
        layout: TensorLayout,
        dtype: DType,
        space: MemorySpace,
    ) -> Result<Self, TensorError> {
        let geometry = geometry(shape, layout, dtype)?;
        // SAFETY: forwarded caller contract.
        let storage = unsafe { Storage::adopt_raw(ptr, geometry.size, space)? };
        Ok(Self {
            shape,
            layout,
            dtype,
            geometry,
            name: String::new(),
            storage: Some(storage),
        })
    }
}

impl<'a> Tensor<'a> {
    /// Wraps the leading bytes of `data` without copying.
    pub fn from_slice(
        data: &'a mut [u8],
        shape: Shape,
        layout: TensorLayout,
        dtype: DType,
        space: MemorySpace,
    ) -> Result<Self, TensorError> {
        let geometry = geometry(shape, layout, dtype)?;
        if data.len() < geometry.size {
            return Err(TensorError::BufferSizeMismatch {
                expected: geometry.size,
                actual: data.len(),
            });
        }
        let (head, _) = data.split_at_mut(geometry.size);
        let storage = Storage::adopt_slice(head, space)?;
        Ok(Self {
            shape,
            layout,
            dtype,
            geometry,
            name: String::new(),
            storage: Some(storage),
        })
    }

    /// Sets the tensor's name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn ready_storage(&self, op: &'static str) -> Result<&Storage<'a>, TensorError> {
        self.storage.as_ref().ok_or_else(|| {
            tracing::error!("{op} on an uninitialised tensor");
            TensorError::NotInitialized { op }
        })
    }

    fn like_in(&self, shape: Shape, space: MemorySpace) -> Result<Tensor<'static>, TensorError> {
        let buffer = self.ready_storage("like")?.buffer().create_like(space);
        Tensor::<'static>::allocate_into(buffer, shape, self.layout, self.dtype, self.name.clone())
    }

    /// A zeroed tensor of another shape with this layout, dtype, memory
    /// space and buffer kind. Only allocates.
    pub fn like(&self, shape: Shape) -> Result<Tensor<'static>, TensorError> {
        self.like_in(shape, self.memory_space())
    }

    /// Borrows batch item `n` as a tensor of shape `[1, d1, d2, d3]`.
    pub fn batch_view(&self, n: usize) -> Result<Tensor<'_>, TensorError> {
        let storage = self.ready_storage("batch_view")?;
        let [batch, d1, d2, d3] = self.shape.dims();
        if n >= batch {
            return Err(TensorError::InvalidArgument(format!(
                "batch {n} out of range for {batch} items"
            )));
        }
        let shape = Shape::new([1, d1, d2, d3]);
        let geometry = TensorGeometry::compute(shape, self.layout, self.dtype)?;
        let view = storage.reborrow(n * self.geometry.scalar, geometry.size)?;
        Ok(Tensor {
            shape,
            layout: self.layout,
            dtype: self.dtype,
            geometry,
            name: self.name.clone(),
            storage: Some(view),
        })
    }

    /// Reinterprets the buffer with a new shape and layout in place. The
    /// buffer is not resized, so the new geometry must fit in it.
    pub fn reshape(&mut self, shape: Shape, layout: TensorLayout) -> Result<(), TensorError> {
        let available = self.ready_storage("reshape")?.len();
        let geometry = geometry(shape, layout, self.dtype)?;
        if geometry.size > available {
            return Err(TensorError::BufferSizeMismatch {
                expected: geometry.size,
                actual: available,
            });
        }
        self.shape = shape;
        self.layout = layout;
        self.geometry = geometry;
        tracing::debug!("reshaped {self}");
        Ok(())
    }

    /// Full copy with the same shape, layout, dtype and name in `space`.
    pub fn try_clone_in(&self, space: MemorySpace) -> Result<Tensor<'static>, TensorError> {
        self.ready_storage("clone")?.sync_cache(CacheSync::FromDevice)?;
        let mut target = self.like_in(self.shape, space)?;
        let src = self.as_bytes();
        target.bytes_mut("clone")?.copy_from_slice(src);
        if let Some(storage) = &target.storage {
            storage.sync_cache(CacheSync::ToDevice)?;
        }
        Ok(target)
    }

    /// Full copy in the same memory space.
    pub fn try_clone(&self) -> Result<Tensor<'static>, TensorError> {
        self.try_clone_in(self.memory_space())
    }

    // ── Accessors ────────────────────────────────────────────────

    /// `true` once construction completed.
    pub fn is_ready(&self) -> bool {
        self.storage.is_some()
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Size of dimension `index`, or `None` past the fourth.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.shape.dim(index)
    }

    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn geometry(&self) -> TensorGeometry {
        self.geometry
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.geometry.stride
    }

    /// Bytes per batch item.
    pub fn scalar(&self) -> usize {
        self.geometry.scalar
    }

    /// Bytes in the whole tensor.
    pub fn size(&self) -> usize {
        self.geometry.size
    }

    pub fn type_size(&self) -> usize {
        self.geometry.type_size
    }

    /// Number of elements (`size / type_size`).
    pub fn count(&self) -> usize {
        if self.geometry.type_size == 0 {
            0
        } else {
            self.geometry.size / self.geometry.type_size
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The backing memory space, or [`MemorySpace::Invalid`] when not ready.
    pub fn memory_space(&self) -> MemorySpace {
        self.storage
            .as_ref()
            .map_or(MemorySpace::Invalid, Storage::memory_space)
    }

    /// `true` when dropping this tensor releases its buffer.
    pub fn is_owner(&self) -> bool {
        self.storage.as_ref().is_some_and(Storage::is_owner)
    }

    pub fn storage(&self) -> Option<&Storage<'a>> {
        self.storage.as_ref()
    }

    /// The tensor's bytes; empty when not ready.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            Some(storage) => &storage.as_bytes()[..self.geometry.size],
            None => &[],
        }
    }

    /// Mutable bytes; `None` when not ready or borrowed.
    pub fn as_bytes_mut(&mut self) -> Option<&mut [u8]> {
        let size = self.geometry.size;
        self.storage
            .as_mut()
            .and_then(Storage::as_bytes_mut)
            .map(|bytes| &mut bytes[..size])
    }

    fn bytes_mut(&mut self, op: &'static str) -> Result<&mut [u8], TensorError> {
        let storage = self.storage.as_mut().ok_or(TensorError::NotInitialized { op })?;
        let size = self.geometry.size;
        storage
            .as_bytes_mut()
            .map(|bytes| &mut bytes[..size])
            .ok_or_else(|| TensorError::InvalidArgument(format!("{op} on a read-only view")))
    }

    fn check_element<T: Element>(&self, op: &'static str) -> Result<(), TensorError> {
        if T::DTYPE != self.dtype {
            return Err(TensorError::UnsupportedDType {
                op,
                dtype: self.dtype,
            });
        }
        Ok(())
    }

    /// The elements as a typed slice. `T` must match the tensor's dtype.
    pub fn as_slice<T: Element>(&self) -> Result<&[T], TensorError> {
        self.ready_storage("as_slice")?;
        self.check_element::<T>("as_slice")?;
        let bytes = self.as_bytes();
        if bytes.as_ptr().align_offset(std::mem::align_of::<T>()) != 0 {
            return Err(TensorError::InvalidArgument(format!(
                "tensor data is not aligned for {}",
                self.dtype
            )));
        }
        // SAFETY: alignment checked above, the length stays inside the
        // tensor bytes and every bit pattern is a valid `T`.
        Ok(unsafe { std::slice::from_raw_parts(bytes.as_ptr().cast::<T>(), self.count()) })
    }

    /// Mutable typed slice; fails on borrowed views.
    pub fn as_slice_mut<T: Element>(&mut self) -> Result<&mut [T], TensorError> {
        self.check_element::<T>("as_slice_mut")?;
        let count = self.count();
        let bytes = self.bytes_mut("as_slice_mut")?;
        if bytes.as_ptr().align_offset(std::mem::align_of::<T>()) != 0 {
            return Err(TensorError::InvalidArgument(
                "tensor data is not aligned for its dtype".into(),
            ));
        }
        // SAFETY: as for `as_slice`, with exclusive access through `&mut self`.
        Ok(unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr().cast::<T>(), count) })
    }

    pub fn as_f32_slice(&self) -> Result<&[f32], TensorError> {
        self.as_slice::<f32>()
    }

    pub fn as_f32_slice_mut(&mut self) -> Result<&mut [f32], TensorError> {
        self.as_slice_mut::<f32>()
    }

    /// Fills every element with `value`.
    pub fn fill_f32(&mut self, value: f32) -> Result<(), TensorError> {
        self.as_f32_slice_mut()?.fill(value);
        Ok(())
    }

    /// Reads the element at flat `offset`, reinterpreting its bytes as `T`.
    /// `T` must have the tensor's element width.
    pub fn data_at<T: Element>(&self, offset: usize) -> Result<T, TensorError> {
        self.ready_storage("data_at")?;
        let width = self.geometry.type_size;
        if std::mem::size_of::<T>() != width {
            return Err(TensorError::UnsupportedDType {
                op: "data_at",
                dtype: self.dtype,
            });
        }
        if offset >= self.count() {
            return Err(TensorError::InvalidArgument(format!(
                "offset {offset} out of range for {} elements",
                self.count()
            )));
        }
        let bytes = &self.as_bytes()[offset * width..(offset + 1) * width];
        // SAFETY: `bytes` holds exactly size_of::<T>() bytes and every bit
        // pattern is a valid `T`.
        Ok(unsafe { bytes.as_ptr().cast::<T>().read_unaligned() })
    }

    /// Typed pointer to batch item `n`; null when not ready or out of range.
    pub fn as_ptr<T>(&self, n: usize) -> *const T {
        match &self.storage {
            Some(storage) if n < self.shape.dims()[0] && !storage.as_ptr().is_null() => {
                // SAFETY: n < dim0 keeps the offset inside the tensor.
                unsafe { storage.as_ptr().add(n * self.geometry.scalar) as *const T }
            }
            _ => std::ptr::null(),
        }
    }
}

impl<'b> PartialEq<Tensor<'b>> for Tensor<'_> {
    /// Metadata, memory space and content; never pointer identity.
    fn eq(&self, other: &Tensor<'b>) -> bool {
        self.shape == other.shape
            && self.layout == other.layout
            && self.dtype == other.dtype
            && self.geometry == other.geometry
            && self.name == other.name
            && self.memory_space() == other.memory_space()
            && self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Display for Tensor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor: Shape:{}, Stride {}, Scalar {}, MemType {}, Layout {}, DType {}, Data {:p}",
            self.shape,
            self.geometry.stride,
            self.geometry.scalar,
            self.memory_space(),
            self.layout,
            self.dtype,
            self.as_ptr::<u8>(0),
        )?;
        if !self.name.is_empty() {
            write!(f, ", Name {}", self.name)?;
        }
        Ok(())
    }
}
