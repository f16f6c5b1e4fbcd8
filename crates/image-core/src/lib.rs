// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # image-core
//!
//! Pixel-format layout engine and batched image views.
//!
//! - [`PixelFormat`]: the 27 supported formats with their numeric codes and
//!   canonical names.
//! - [`ImageLayout`]: channels, element width, stride and per-frame size
//!   derived from a format and a frame size.
//! - [`Image`]: frames stored in an owned, adopted or borrowed buffer from
//!   `memory-manager`, with channel/batch splitting, reshape and deep copy.
//!
//! # Example
//! ```
//! use image_core::{Image, PixelFormat};
//! use memory_manager::MemorySpace;
//!
//! let img = Image::new(640, 480, 1, PixelFormat::Bgr888Planar, MemorySpace::Host).unwrap();
//! let green = img.split_channel(0, 1).unwrap();
//! assert_eq!(green.format(), PixelFormat::Gray8);
//! assert!(!green.is_owner());
//! ```

mod error;
mod format;
mod image;
mod timestamp;

pub use error::ImageError;
pub use format::{ImageLayout, Packing, PixelFormat};
pub use image::Image;
pub use timestamp::Timestamp;
