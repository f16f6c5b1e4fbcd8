// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element data types.

use crate::TensorError;
use std::fmt;
use std::str::FromStr;

/// Enumerates the element types a [`crate::Tensor`] can hold.
///
/// Discriminants are the stable numeric codes. `BF16` came later and takes
/// the first free code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum DType {
    /// Opaque bytes (e.g. an encoded JPEG).
    Byte = 0,
    /// One-byte boolean.
    Bool = 1,
    I8 = 2,
    I16 = 3,
    I32 = 4,
    I64 = 5,
    U8 = 6,
    U16 = 7,
    U32 = 8,
    U64 = 9,
    /// 16-bit IEEE 754 floating point.
    F16 = 10,
    /// 32-bit IEEE 754 floating point.
    #[default]
    F32 = 11,
    /// 64-bit IEEE 754 floating point.
    F64 = 12,
    /// 16-bit fixed point.
    Fix16 = 13,
    /// 32-bit fixed point.
    Fix32 = 14,
    /// 16-bit brain floating point.
    BF16 = 15,
}

impl DType {
    /// Every element type, in code order.
    pub const ALL: [DType; 16] = [
        DType::Byte,
        DType::Bool,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F16,
        DType::F32,
        DType::F64,
        DType::Fix16,
        DType::Fix32,
        DType::BF16,
    ];

    /// Maps a numeric code to its type.
    pub fn from_code(code: u32) -> Result<Self, TensorError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| TensorError::InvalidArgument(format!("unknown dtype code {code}")))
    }

    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::Byte | DType::Bool | DType::I8 | DType::U8 => 1,
            DType::I16 | DType::U16 | DType::F16 | DType::BF16 | DType::Fix16 => 2,
            DType::I32 | DType::U32 | DType::F32 | DType::Fix32 => 4,
            DType::I64 | DType::U64 | DType::F64 => 8,
        }
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::Byte => "byte",
            DType::Bool => "bool",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::U16 => "u16",
            DType::U32 => "u32",
            DType::U64 => "u64",
            DType::F16 => "f16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::Fix16 => "fix16",
            DType::Fix32 => "fix32",
            DType::BF16 => "bf16",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = TensorError;

    /// Accepts the short labels (`"f32"`) and the long upper-case names
    /// (`"FLOAT32"`, `"UINT8"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let short = match lower.as_str() {
            "int8" => "i8",
            "int16" => "i16",
            "int32" => "i32",
            "int64" => "i64",
            "uint8" => "u8",
            "uint16" => "u16",
            "uint32" => "u32",
            "uint64" => "u64",
            "float16" => "f16",
            "float32" => "f32",
            "float64" => "f64",
            other => other,
        };
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == short)
            .ok_or_else(|| TensorError::InvalidArgument(format!("unknown dtype '{s}'")))
    }
}

/// Plain numeric types that can be read out of a tensor buffer.
///
/// Every bit pattern of an implementor is a valid value.
pub trait Element: Copy + 'static {
    const DTYPE: DType;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(impl Element for $ty {
            const DTYPE: DType = DType::$dtype;
        })*
    };
}

impl_element! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}
