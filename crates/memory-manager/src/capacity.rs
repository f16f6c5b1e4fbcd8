// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pool capacity values and their human-readable form.

use crate::MemoryError;
use std::fmt;

/// Base capacity of a pool before any expansion: 5 MiB.
pub const DEFAULT_CAPACITY_BYTES: usize = 5 * 1024 * 1024;

/// A byte ceiling for a [`BufferPool`](crate::BufferPool).
///
/// # Parsing
/// Accepts `"5M"`/`"5MB"`, `"1G"`/`"1GB"`, `"512K"`/`"512KB"`, `"100B"` or a
/// plain byte count, case-insensitive. Config files may also give a bare
/// integer byte count. Serialised as the string form.
///
/// ```
/// use memory_manager::Capacity;
///
/// let c = Capacity::parse("5M").unwrap();
/// assert_eq!(c.as_bytes(), 5 * 1024 * 1024);
/// assert_eq!(c.to_string(), "5 MB");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "CapacityRepr", into = "String")]
pub struct Capacity {
    bytes: usize,
}

impl Capacity {
    /// Creates a capacity from a byte count.
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a capacity from mebibytes, saturating at `usize::MAX` bytes.
    pub fn from_mb(mb: usize) -> Self {
        Self {
            bytes: mb.saturating_mul(1024 * 1024),
        }
    }

    /// Returns the capacity in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Parses a human-readable capacity string.
    pub fn parse(s: &str) -> Result<Self, MemoryError> {
        let s = s.trim();
        let upper = s.to_uppercase();

        let (digits, multiplier) = [
            ("GB", 1usize << 30),
            ("G", 1 << 30),
            ("MB", 1 << 20),
            ("M", 1 << 20),
            ("KB", 1 << 10),
            ("K", 1 << 10),
            ("B", 1),
        ]
        .iter()
        .find(|(suffix, _)| upper.ends_with(suffix))
        .map(|(suffix, mult)| (&s[..s.len() - suffix.len()], *mult))
        .unwrap_or((s, 1));

        let value: usize = digits.trim().parse().map_err(|_| {
            MemoryError::Config(format!(
                "invalid capacity '{s}': expected a number with an optional K, M or G suffix"
            ))
        })?;
        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| MemoryError::Config(format!("capacity overflow: '{s}'")))?;
        if bytes == 0 {
            return Err(MemoryError::Config("capacity must be non-zero".into()));
        }
        Ok(Self { bytes })
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self::from_bytes(DEFAULT_CAPACITY_BYTES)
    }
}

/// Wire forms accepted when deserialising a [`Capacity`].
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum CapacityRepr {
    Bytes(u64),
    Text(String),
}

impl TryFrom<CapacityRepr> for Capacity {
    type Error = MemoryError;

    fn try_from(repr: CapacityRepr) -> Result<Self, Self::Error> {
        match repr {
            CapacityRepr::Bytes(0) => Err(MemoryError::Config("capacity must be non-zero".into())),
            CapacityRepr::Bytes(n) => usize::try_from(n)
                .map(Self::from_bytes)
                .map_err(|_| MemoryError::Config(format!("capacity overflow: {n} bytes"))),
            CapacityRepr::Text(s) => Self::parse(&s),
        }
    }
}

impl TryFrom<String> for Capacity {
    type Error = MemoryError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Capacity> for String {
    fn from(c: Capacity) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const GB: usize = 1 << 30;
        const MB: usize = 1 << 20;
        const KB: usize = 1 << 10;
        match self.bytes {
            b if b >= GB && b % GB == 0 => write!(f, "{} GB", b / GB),
            b if b >= MB && b % MB == 0 => write!(f, "{} MB", b / MB),
            b if b >= KB && b % KB == 0 => write!(f, "{} KB", b / KB),
            b => write!(f, "{b} B"),
        }
    }
}
