// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pixel formats and the layout rules derived from them.
//!
//! Every format maps to a channel count, an element width and one of three
//! packings:
//!
//! | packing          | stride                           | scalar                           |
//! |------------------|----------------------------------|----------------------------------|
//! | packed           | `width * type_size * channels`   | `height * stride`                |
//! | planar           | `width * type_size`              | `height * stride * channels`     |
//! | 4:2:0 subsampled | `width * type_size`              | `height * stride * 3 / 2`        |

use crate::ImageError;
use std::fmt;
use std::str::FromStr;

/// How the channels of one pixel are laid out in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Packing {
    /// All channels of a pixel are contiguous.
    Packed,
    /// Each channel occupies its own plane.
    Planar,
    /// A full-resolution luma plane plus half-resolution chroma.
    Subsampled420,
}

/// Supported pixel formats. Discriminants are the stable numeric codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum PixelFormat {
    Gray8 = 0,
    Rgba8888 = 1,
    Rgb888 = 2,
    /// `RRRR:GGGG:BBBB`
    Rgb888Planar = 3,
    Bgra8888 = 4,
    Bgr888 = 5,
    /// `BBBB:GGGG:RRRR`
    Bgr888Planar = 6,
    Yuv420p = 7,
    /// 4:2:0, `YYYY:UV`
    Nv12 = 8,
    /// 4:2:0, `YYYY:VU`
    Nv21 = 9,
    Gray32 = 10,
    Rgb323232 = 11,
    Rgb323232Planar = 12,
    Bgr323232 = 13,
    Bgr323232Planar = 14,
    Gray16 = 15,
    Rgb161616 = 16,
    Rgb161616Planar = 17,
    Bgr161616 = 18,
    Bgr161616Planar = 19,
    /// Four `f32` channels.
    Float32C4 = 20,
    /// NV12 with non-contiguous luma and chroma planes.
    Nv12Detach = 21,
    /// NV21 with non-contiguous luma and chroma planes.
    Nv21Detach = 22,
    /// Packed 4:2:2.
    Yuyv = 23,
    /// Packed 4:2:2.
    Uyvy = 24,
    /// 4:2:0, `YYYYYYYY:VVUU`
    Yv12 = 25,
    /// 4:2:0, `YYYYYYYY:UUVV`
    Yu12 = 26,
    /// Not a usable format.
    #[default]
    Invalid = 27,
}

impl PixelFormat {
    /// Every usable format, in code order.
    pub const ALL: [PixelFormat; 27] = [
        PixelFormat::Gray8,
        PixelFormat::Rgba8888,
        PixelFormat::Rgb888,
        PixelFormat::Rgb888Planar,
        PixelFormat::Bgra8888,
        PixelFormat::Bgr888,
        PixelFormat::Bgr888Planar,
        PixelFormat::Yuv420p,
        PixelFormat::Nv12,
        PixelFormat::Nv21,
        PixelFormat::Gray32,
        PixelFormat::Rgb323232,
        PixelFormat::Rgb323232Planar,
        PixelFormat::Bgr323232,
        PixelFormat::Bgr323232Planar,
        PixelFormat::Gray16,
        PixelFormat::Rgb161616,
        PixelFormat::Rgb161616Planar,
        PixelFormat::Bgr161616,
        PixelFormat::Bgr161616Planar,
        PixelFormat::Float32C4,
        PixelFormat::Nv12Detach,
        PixelFormat::Nv21Detach,
        PixelFormat::Yuyv,
        PixelFormat::Uyvy,
        PixelFormat::Yv12,
        PixelFormat::Yu12,
    ];

    /// Maps a numeric code to its format; anything out of range is
    /// [`PixelFormat::Invalid`].
    pub fn from_code(code: u32) -> Self {
        Self::ALL
            .get(code as usize)
            .copied()
            .unwrap_or(PixelFormat::Invalid)
    }

    /// The stable numeric code.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Canonical upper-case name, e.g. `"RGB888_PLANAR"`.
    pub fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Gray8 => "GRAY8",
            PixelFormat::Rgba8888 => "RGBA8888",
            PixelFormat::Rgb888 => "RGB888",
            PixelFormat::Rgb888Planar => "RGB888_PLANAR",
            PixelFormat::Bgra8888 => "BGRA8888",
            PixelFormat::Bgr888 => "BGR888",
            PixelFormat::Bgr888Planar => "BGR888_PLANAR",
            PixelFormat::Yuv420p => "YUV420P",
            PixelFormat::Nv12 => "NV12",
            PixelFormat::Nv21 => "NV21",
            PixelFormat::Gray32 => "GRAY32",
            PixelFormat::Rgb323232 => "RGB323232",
            PixelFormat::Rgb323232Planar => "RGB323232_PLANAR",
            PixelFormat::Bgr323232 => "BGR323232",
            PixelFormat::Bgr323232Planar => "BGR323232_PLANAR",
            PixelFormat::Gray16 => "GRAY16",
            PixelFormat::Rgb161616 => "RGB161616",
            PixelFormat::Rgb161616Planar => "RGB161616_PLANAR",
            PixelFormat::Bgr161616 => "BGR161616",
            PixelFormat::Bgr161616Planar => "BGR161616_PLANAR",
            PixelFormat::Float32C4 => "FLOAT32C4",
            PixelFormat::Nv12Detach => "NV12_DETACH",
            PixelFormat::Nv21Detach => "NV21_DETACH",
            PixelFormat::Yuyv => "YUYV",
            PixelFormat::Uyvy => "UYVY",
            PixelFormat::Yv12 => "YV12",
            PixelFormat::Yu12 => "YU12",
            PixelFormat::Invalid => "INVALID",
        }
    }

    /// `(channels, type_size, packing)`, or `None` for [`PixelFormat::Invalid`].
    pub fn params(self) -> Option<(usize, usize, Packing)> {
        use PixelFormat::*;
        use Packing::*;
        let params = match self {
            Gray8 => (1, 1, Packed),
            Rgb888 | Bgr888 => (3, 1, Packed),
            Rgb888Planar | Bgr888Planar => (3, 1, Planar),
            Yuv420p | Nv12 | Nv21 | Yv12 | Yu12 | Nv12Detach | Nv21Detach => (1, 1, Subsampled420),
            Rgba8888 | Bgra8888 => (4, 1, Packed),
            Gray32 => (1, 4, Packed),
            Rgb323232 | Bgr323232 => (3, 4, Packed),
            Rgb323232Planar | Bgr323232Planar => (3, 4, Planar),
            Gray16 => (1, 2, Packed),
            Rgb161616 | Bgr161616 => (3, 2, Packed),
            Rgb161616Planar | Bgr161616Planar => (3, 2, Planar),
            Yuyv | Uyvy => (2, 1, Packed),
            Float32C4 => (4, 4, Packed),
            PixelFormat::Invalid => return None,
        };
        Some(params)
    }

    /// `true` for the planar RGB/BGR formats that support channel splitting.
    pub fn is_planar(self) -> bool {
        matches!(self.params(), Some((_, _, Packing::Planar)))
    }

    /// `true` for the 4:2:0 chroma-subsampled formats.
    pub fn is_subsampled(self) -> bool {
        matches!(self.params(), Some((_, _, Packing::Subsampled420)))
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PixelFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == upper)
            .ok_or_else(|| ImageError::InvalidArgument(format!("unknown pixel format '{s}'")))
    }
}

/// Per-instance geometry derived from a pixel format and a frame size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub struct ImageLayout {
    pub channels: usize,
    pub type_size: usize,
    /// Bytes in one row of one plane.
    pub stride: usize,
    /// Bytes in one image of the batch.
    pub scalar: usize,
}

impl ImageLayout {
    fn from_params(width: usize, height: usize, channels: usize, type_size: usize, packing: Packing) -> Self {
        let (stride, scalar) = match packing {
            Packing::Packed => {
                let stride = width * type_size * channels;
                (stride, height * stride)
            }
            Packing::Planar => {
                let stride = width * type_size;
                (stride, height * stride * channels)
            }
            Packing::Subsampled420 => {
                let stride = width * type_size;
                (stride, height * stride * 3 / 2)
            }
        };
        Self {
            channels,
            type_size,
            stride,
            scalar,
        }
    }

    /// Computes the layout of a `width` x `height` frame in `format`.
    ///
    /// [`PixelFormat::Invalid`] fails with [`ImageError::UnsupportedFormat`];
    /// the error carries a 3-channel 1-byte packed fallback layout.
    ///
    /// # Examples
    /// ```
    /// use image_core::{ImageLayout, PixelFormat};
    /// let l = ImageLayout::compute(PixelFormat::Gray8, 4, 3).unwrap();
    /// assert_eq!((l.channels, l.type_size, l.stride, l.scalar), (1, 1, 4, 12));
    /// ```
    pub fn compute(format: PixelFormat, width: usize, height: usize) -> Result<Self, ImageError> {
        match format.params() {
            Some((channels, type_size, packing)) => {
                Ok(Self::from_params(width, height, channels, type_size, packing))
            }
            None => {
                tracing::error!("pixel format {format} has no layout");
                Err(ImageError::UnsupportedFormat {
                    format,
                    fallback: Self::from_params(width, height, 3, 1, Packing::Packed),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray8() {
        let l = ImageLayout::compute(PixelFormat::Gray8, 4, 3).unwrap();
        assert_eq!(l, ImageLayout { channels: 1, type_size: 1, stride: 4, scalar: 12 });
    }

    #[test]
    fn test_packed_rgb() {
        let l = ImageLayout::compute(PixelFormat::Bgr888, 10, 2).unwrap();
        assert_eq!(l.stride, 30);
        assert_eq!(l.scalar, 60);
    }

    #[test]
    fn test_planar_rgb_f32() {
        let l = ImageLayout::compute(PixelFormat::Rgb323232Planar, 10, 2).unwrap();
        assert_eq!(l.channels, 3);
        assert_eq!(l.type_size, 4);
        assert_eq!(l.stride, 40);
        assert_eq!(l.scalar, 240);
    }

    #[test]
    fn test_nv12() {
        let l = ImageLayout::compute(PixelFormat::Nv12, 8, 4).unwrap();
        assert_eq!(l.stride, 8);
        assert_eq!(l.scalar, 48);
    }

    #[test]
    fn test_yuyv_and_float32c4() {
        let l = ImageLayout::compute(PixelFormat::Yuyv, 4, 2).unwrap();
        assert_eq!((l.channels, l.stride, l.scalar), (2, 8, 16));
        let l = ImageLayout::compute(PixelFormat::Float32C4, 4, 2).unwrap();
        assert_eq!((l.channels, l.stride, l.scalar), (4, 64, 128));
    }

    #[test]
    fn test_invalid_has_fallback() {
        let err = ImageLayout::compute(PixelFormat::Invalid, 5, 2).unwrap_err();
        match err {
            ImageError::UnsupportedFormat { format, fallback } => {
                assert_eq!(format, PixelFormat::Invalid);
                assert_eq!(fallback, ImageLayout { channels: 3, type_size: 1, stride: 15, scalar: 30 });
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_codes_round_trip() {
        for (i, f) in PixelFormat::ALL.iter().enumerate() {
            assert_eq!(f.code() as usize, i);
            assert_eq!(PixelFormat::from_code(i as u32), *f);
        }
        assert_eq!(PixelFormat::from_code(27), PixelFormat::Invalid);
        assert_eq!(PixelFormat::from_code(1000), PixelFormat::Invalid);
    }

    #[test]
    fn test_names() {
        assert_eq!(PixelFormat::Bgr161616Planar.to_string(), "BGR161616_PLANAR");
        assert_eq!("nv21_detach".parse::<PixelFormat>().unwrap(), PixelFormat::Nv21Detach);
        assert!("INVALID".parse::<PixelFormat>().is_err());
        assert!("RGB".parse::<PixelFormat>().is_err());
    }

    #[test]
    fn test_planar_set() {
        let planar: Vec<_> = PixelFormat::ALL.iter().filter(|f| f.is_planar()).collect();
        assert_eq!(planar.len(), 6);
        assert!(PixelFormat::Bgr888Planar.is_planar());
        assert!(!PixelFormat::Yuv420p.is_planar());
        assert!(PixelFormat::Yu12.is_subsampled());
    }
}
