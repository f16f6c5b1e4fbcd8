// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Batched image views over memory-space tagged buffers.
//!
//! An [`Image`] is `number` frames of identical geometry stored back to back.
//! Frame `n` starts at byte `n * scalar`:
//!
//! ```text
//! ┌──────── scalar ────────┬──────── scalar ────────┬─ ...
//! │ frame 0                │ frame 1                │
//! └────────────────────────┴────────────────────────┴─ ...
//! ```
//!
//! Images own their buffer, adopt caller memory, or borrow a window of
//! another image (`split_channel`, `split_batch`). Borrowed images carry
//! the source's lifetime, so a view can never outlive the bytes it reads.

use crate::{ImageError, ImageLayout, PixelFormat, Timestamp};
use memory_manager::{copy_rows, Buffer, BufferSource, CacheSync, MemorySpace, Storage};
use std::fmt;

/// A batch of frames sharing one pixel format and size.
///
/// `Image::default()` is an uninitialised image: [`is_ready`](Image::is_ready)
/// is `false`, pointers are null and slices are empty.
#[derive(Debug, Default)]
pub struct Image<'a> {
    width: usize,
    height: usize,
    number: usize,
    format: PixelFormat,
    layout: ImageLayout,
    timestamp: Timestamp,
    storage: Option<Storage<'a>>,
}

fn geometry(
    width: usize,
    height: usize,
    number: usize,
    format: PixelFormat,
) -> Result<(ImageLayout, usize), ImageError> {
    if width == 0 || height == 0 || number == 0 {
        return Err(ImageError::InvalidArgument(format!(
            "image geometry {width}x{height}x{number} has a zero dimension"
        )));
    }
    let layout = ImageLayout::compute(format, width, height)?;
    let size = layout.scalar.checked_mul(number).ok_or_else(|| {
        ImageError::InvalidArgument(format!("{number} frames of {} bytes overflow", layout.scalar))
    })?;
    Ok((layout, size))
}

impl Image<'static> {
    /// Allocates a plain host-side buffer for `number` frames.
    ///
    /// # Examples
    /// ```
    /// use image_core::{Image, PixelFormat};
    /// use memory_manager::MemorySpace;
    ///
    /// let img = Image::new(4, 3, 1, PixelFormat::Gray8, MemorySpace::Host).unwrap();
    /// assert_eq!((img.channels(), img.stride(), img.scalar()), (1, 4, 12));
    /// ```
    pub fn new(
        width: usize,
        height: usize,
        number: usize,
        format: PixelFormat,
        space: MemorySpace,
    ) -> Result<Self, ImageError> {
        Self::with_source(&BufferSource::Plain, width, height, number, format, space)
    }

    /// Allocates the frames from `source` (plain or pooled). The pixels
    /// start zeroed either way; pooled blocks are cleared when reused.
    pub fn with_source(
        source: &BufferSource,
        width: usize,
        height: usize,
        number: usize,
        format: PixelFormat,
        space: MemorySpace,
    ) -> Result<Self, ImageError> {
        Self::allocate_into(
            source.create(space),
            width,
            height,
            number,
            format,
            Timestamp::default(),
        )
    }

    fn allocate_into(
        mut buffer: Box<dyn Buffer>,
        width: usize,
        height: usize,
        number: usize,
        format: PixelFormat,
        timestamp: Timestamp,
    ) -> Result<Self, ImageError> {
        let (layout, size) = geometry(width, height, number, format)?;
        buffer.allocate(size)?;
        let image = Self {
            width,
            height,
            number,
            format,
            layout,
            timestamp,
            storage: Some(Storage::Owned(buffer)),
        };
        tracing::debug!("allocated {image}");
        Ok(image)
    }

    /// Wraps caller memory without copying.
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `number * scalar` bytes
    /// for as long as the image (or any view of it) is used.
    pub unsafe fn from_raw_parts(
        ptr: *mut u8,
        width: usize,
        height: usize,
        number: usize,
        format: PixelFormat,
        space: MemorySpace,
    ) -> Result<Self, ImageError> {
        let (layout, size) = geometry(width, height, number, format)?;
        // SAFETY: forwarded caller contract.
        let storage = unsafe { Storage::adopt_raw(ptr, size, space)? };
        Ok(Self {
            width,
            height,
            number,
            format,
            layout,
            timestamp: Timestamp::default(),
            storage: Some(storage),
        })
    }
}

impl<'a> Image<'a> {
    /// Wraps the first `number * scalar` bytes of `data` without copying.
    /// The slice stays borrowed for the image's lifetime.
    pub fn from_slice(
        data: &'a mut [u8],
        width: usize,
        height: usize,
        number: usize,
        format: PixelFormat,
        space: MemorySpace,
    ) -> Result<Self, ImageError> {
        let (layout, size) = geometry(width, height, number, format)?;
        if data.len() < size {
            return Err(ImageError::SizeMismatch {
                expected: size,
                actual: data.len(),
            });
        }
        let (head, _) = data.split_at_mut(size);
        let storage = Storage::adopt_slice(head, space)?;
        Ok(Self {
            width,
            height,
            number,
            format,
            layout,
            timestamp: Timestamp::default(),
            storage: Some(storage),
        })
    }

    /// Sets the capture timestamp.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    fn ready_storage(&self, op: &'static str) -> Result<&Storage<'a>, ImageError> {
        self.storage.as_ref().ok_or_else(|| {
            tracing::error!("{op} on an uninitialised image");
            ImageError::NotInitialized { op }
        })
    }

    fn like(
        &self,
        width: usize,
        height: usize,
        format: PixelFormat,
        space: MemorySpace,
    ) -> Result<Image<'static>, ImageError> {
        let buffer = self.ready_storage("like")?.buffer().create_like(space);
        Image::<'static>::allocate_into(buffer, width, height, self.number, format, self.timestamp)
    }

    /// A new image with this geometry in another pixel format. Only
    /// allocates; nothing is copied.
    pub fn like_with_format(&self, format: PixelFormat) -> Result<Image<'static>, ImageError> {
        self.like(self.width, self.height, format, self.memory_space())
    }

    /// A new image of another frame size. Only allocates.
    pub fn like_with_size(&self, width: usize, height: usize) -> Result<Image<'static>, ImageError> {
        self.like(width, height, self.format, self.memory_space())
    }

    /// A new image with this geometry in another memory space. Only allocates.
    pub fn like_in_space(&self, space: MemorySpace) -> Result<Image<'static>, ImageError> {
        self.like(self.width, self.height, self.format, space)
    }

    /// Borrows one colour plane of frame `batch` as a single-channel image.
    ///
    /// Only the planar RGB/BGR formats can be split. The view's element
    /// width follows the source (`GRAY8`, `GRAY16` or `GRAY32`). Memory the
    /// host cannot address directly fails with
    /// [`ImageError::UnsupportedMemorySpace`].
    pub fn split_channel(&self, batch: usize, channel: usize) -> Result<Image<'_>, ImageError> {
        let storage = self.ready_storage("split_channel")?;
        if !self.format.is_planar() {
            tracing::error!("split_channel does not support {}", self.format);
            return Err(ImageError::InvalidArgument(format!(
                "split_channel needs a planar format, got {}",
                self.format
            )));
        }
        if channel >= self.layout.channels {
            return Err(ImageError::InvalidArgument(format!(
                "channel {channel} out of range for {} channels",
                self.layout.channels
            )));
        }
        if batch >= self.number {
            return Err(ImageError::InvalidArgument(format!(
                "batch {batch} out of range for {} frames",
                self.number
            )));
        }
        let space = storage.memory_space();
        if !space.is_host_addressable() {
            return Err(ImageError::UnsupportedMemorySpace {
                op: "split_channel",
                space,
            });
        }

        let format = match self.layout.type_size {
            1 => PixelFormat::Gray8,
            2 => PixelFormat::Gray16,
            _ => PixelFormat::Gray32,
        };
        let layout = ImageLayout::compute(format, self.width, self.height)?;
        let offset = batch * self.layout.scalar + channel * layout.scalar;
        let view = storage.reborrow(offset, layout.scalar)?;
        Ok(Image {
            width: self.width,
            height: self.height,
            number: 1,
            format,
            layout,
            timestamp: self.timestamp,
            storage: Some(view),
        })
    }

    /// Borrows frame `index` as a one-frame image of the same format.
    pub fn split_batch(&self, index: usize) -> Result<Image<'_>, ImageError> {
        let storage = self.ready_storage("split_batch")?;
        if index >= self.number {
            return Err(ImageError::InvalidArgument(format!(
                "batch {index} out of range for {} frames",
                self.number
            )));
        }
        let view = storage.reborrow(index * self.layout.scalar, self.layout.scalar)?;
        Ok(Image {
            width: self.width,
            height: self.height,
            number: 1,
            format: self.format,
            layout: self.layout,
            timestamp: self.timestamp,
            storage: Some(view),
        })
    }

    /// Reinterprets the buffer with new geometry, e.g. viewing an NV12
    /// frame as its luma plane. The buffer is neither touched nor resized,
    /// so the new geometry must fit in it.
    pub fn reshape(
        &mut self,
        width: usize,
        height: usize,
        number: usize,
        format: PixelFormat,
    ) -> Result<(), ImageError> {
        let available = self.ready_storage("reshape")?.len();
        let (layout, size) = geometry(width, height, number, format)?;
        if size > available {
            return Err(ImageError::SizeMismatch {
                expected: size,
                actual: available,
            });
        }
        self.width = width;
        self.height = height;
        self.number = number;
        self.format = format;
        self.layout = layout;
        tracing::debug!("reshaped {self}");
        Ok(())
    }

    /// Swaps in another backing buffer of exactly the same size.
    pub fn replace_buffer(&mut self, buffer: Box<dyn Buffer>) -> Result<(), ImageError> {
        let current = self.ready_storage("replace_buffer")?.len();
        if buffer.size() != current {
            tracing::error!("replace_buffer: size {} vs {current}", buffer.size());
            return Err(ImageError::SizeMismatch {
                expected: current,
                actual: buffer.size(),
            });
        }
        self.storage = Some(Storage::Owned(buffer));
        Ok(())
    }

    /// Deep copy with the same geometry in `space`.
    pub fn try_clone_in(&self, space: MemorySpace) -> Result<Image<'static>, ImageError> {
        self.ready_storage("clone")?.sync_cache(CacheSync::FromDevice)?;
        let mut target = self.like_in_space(space)?;
        self.copy_pixels(&mut target)?;
        if let Some(storage) = &target.storage {
            storage.sync_cache(CacheSync::ToDevice)?;
        }
        Ok(target)
    }

    /// Deep copy in the same memory space.
    pub fn try_clone(&self) -> Result<Image<'static>, ImageError> {
        self.try_clone_in(self.memory_space())
    }

    /// Copies every frame into `target`, which shares this image's format,
    /// width and height and therefore its stride and byte size.
    fn copy_pixels(&self, target: &mut Image<'_>) -> Result<(), ImageError> {
        debug_assert_eq!(self.layout, target.layout);
        let src = self.as_bytes();
        let dst = target
            .storage
            .as_mut()
            .and_then(Storage::as_bytes_mut)
            .ok_or(ImageError::NotInitialized { op: "clone" })?;
        copy_rows(src, src.len(), dst, src.len(), src.len(), 1)?;
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────

    /// `true` once construction completed.
    pub fn is_ready(&self) -> bool {
        self.storage.is_some()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of frames in the batch.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    pub fn channels(&self) -> usize {
        self.layout.channels
    }

    pub fn stride(&self) -> usize {
        self.layout.stride
    }

    pub fn type_size(&self) -> usize {
        self.layout.type_size
    }

    /// Bytes in one frame.
    pub fn scalar(&self) -> usize {
        self.layout.scalar
    }

    /// Bytes in the whole batch (0 when not ready).
    pub fn size(&self) -> usize {
        if self.is_ready() {
            self.number * self.layout.scalar
        } else {
            0
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// The backing memory space, or [`MemorySpace::Invalid`] when not ready.
    pub fn memory_space(&self) -> MemorySpace {
        self.storage
            .as_ref()
            .map_or(MemorySpace::Invalid, Storage::memory_space)
    }

    /// `true` when dropping this image releases its buffer.
    pub fn is_owner(&self) -> bool {
        self.storage.as_ref().is_some_and(Storage::is_owner)
    }

    pub fn storage(&self) -> Option<&Storage<'a>> {
        self.storage.as_ref()
    }

    /// The batch bytes; empty when not ready.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            Some(storage) => &storage.as_bytes()[..self.size()],
            None => &[],
        }
    }

    /// Mutable batch bytes; `None` when not ready or borrowed.
    pub fn as_bytes_mut(&mut self) -> Option<&mut [u8]> {
        let size = self.size();
        self.storage
            .as_mut()
            .and_then(Storage::as_bytes_mut)
            .map(|bytes| &mut bytes[..size])
    }

    /// The bytes of frame `n`.
    pub fn frame_bytes(&self, n: usize) -> Option<&[u8]> {
        if n >= self.number || !self.is_ready() {
            return None;
        }
        let start = n * self.layout.scalar;
        self.as_bytes().get(start..start + self.layout.scalar)
    }

    /// Typed pointer to the start of frame `n`; null when not ready or out
    /// of range.
    pub fn as_ptr<T>(&self, n: usize) -> *const T {
        match &self.storage {
            Some(storage) if n < self.number && !storage.as_ptr().is_null() => {
                // SAFETY: n < number keeps the offset inside the batch.
                unsafe { storage.as_ptr().add(n * self.layout.scalar) as *const T }
            }
            _ => std::ptr::null(),
        }
    }

    /// Mutable typed pointer to frame `n`; null when not ready, out of range
    /// or borrowed.
    pub fn as_mut_ptr<T>(&mut self, n: usize) -> *mut T {
        match &self.storage {
            Some(storage) if !storage.is_borrowed() => self.as_ptr::<T>(n) as *mut T,
            _ => std::ptr::null_mut(),
        }
    }
}

impl<'b> PartialEq<Image<'b>> for Image<'_> {
    /// Geometry, memory space and content; never pointer identity.
    fn eq(&self, other: &Image<'b>) -> bool {
        self.format == other.format
            && self.width == other.width
            && self.height == other.height
            && self.number == other.number
            && self.layout == other.layout
            && self.memory_space() == other.memory_space()
            && self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Display for Image<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Image: number {}, width {}, height {}, stride {}, scalar {}, space {}, format {}, data {:p}",
            self.number,
            self.width,
            self.height,
            self.layout.stride,
            self.layout.scalar,
            self.memory_space(),
            self.format,
            self.as_ptr::<u8>(0),
        )
    }
}
