// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory space tags.

use crate::MemoryError;
use std::fmt;
use std::str::FromStr;

/// Identifies which physical or logical memory a buffer lives in.
///
/// The tag is fixed when a buffer is created. The pool keeps a separate
/// set of buckets and a separate byte total for every space.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum MemorySpace {
    /// Ordinary host RAM.
    #[default]
    Host,
    /// OpenCL device memory.
    OpenCl,
    /// Hexagon DSP shared memory.
    HexagonDsp,
    /// CUDA pinned host memory.
    CudaHost,
    /// CUDA device memory.
    CudaDevice,
    /// Not a usable memory space.
    Invalid,
}

impl MemorySpace {
    /// All usable memory spaces, in code order.
    pub const ALL: [MemorySpace; 5] = [
        MemorySpace::Host,
        MemorySpace::OpenCl,
        MemorySpace::HexagonDsp,
        MemorySpace::CudaHost,
        MemorySpace::CudaDevice,
    ];

    /// Returns the canonical upper-case name of this space.
    pub fn as_str(self) -> &'static str {
        match self {
            MemorySpace::Host => "CPU",
            MemorySpace::OpenCl => "OCL",
            MemorySpace::HexagonDsp => "HEXAGON_DSP",
            MemorySpace::CudaHost => "CUDA_HOST",
            MemorySpace::CudaDevice => "CUDA_DEV",
            MemorySpace::Invalid => "INVALID",
        }
    }

    /// Returns `true` if the host CPU may do pointer arithmetic on memory in
    /// this space without a transfer.
    pub fn is_host_addressable(self) -> bool {
        matches!(self, MemorySpace::Host | MemorySpace::CudaHost)
    }

    /// Returns `true` for every space except [`MemorySpace::Invalid`].
    pub fn is_valid(self) -> bool {
        self != MemorySpace::Invalid
    }
}

impl fmt::Display for MemorySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemorySpace {
    type Err = MemoryError;

    /// Parses `CPU`, `OCL`, `HEXAGON_DSP`, `CUDA_HOST` or `CUDA_DEV`
    /// (case-insensitive). `HOST` is accepted as an alias for `CPU`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CPU" | "HOST" => Ok(MemorySpace::Host),
            "OCL" | "OPENCL" => Ok(MemorySpace::OpenCl),
            "HEXAGON_DSP" => Ok(MemorySpace::HexagonDsp),
            "CUDA_HOST" => Ok(MemorySpace::CudaHost),
            "CUDA_DEV" | "CUDA_DEVICE" => Ok(MemorySpace::CudaDevice),
            _ => {
                tracing::error!("unsupported memory space '{s}'");
                Err(MemoryError::InvalidArgument(format!(
                    "unknown memory space '{s}'"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_roundtrip() {
        for space in MemorySpace::ALL {
            let parsed: MemorySpace = space.as_str().parse().unwrap();
            assert_eq!(parsed, space);
        }
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("cpu".parse::<MemorySpace>().unwrap(), MemorySpace::Host);
        assert_eq!(" cuda_dev ".parse::<MemorySpace>().unwrap(), MemorySpace::CudaDevice);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "TPU".parse::<MemorySpace>().unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[test]
    fn test_host_addressable() {
        assert!(MemorySpace::Host.is_host_addressable());
        assert!(MemorySpace::CudaHost.is_host_addressable());
        assert!(!MemorySpace::OpenCl.is_host_addressable());
        assert!(!MemorySpace::CudaDevice.is_host_addressable());
        assert!(!MemorySpace::Invalid.is_valid());
    }
}
