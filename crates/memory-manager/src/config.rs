// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pool configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! capacity = "5M"
//! max_expand_times = 5
//! idle_timeout_secs = 5
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.
//! `capacity` also accepts a bare byte count (`capacity = 5242880`).

use crate::{Capacity, MemoryError};
use std::path::Path;
use std::time::Duration;

/// Tuning knobs for a [`BufferPool`](crate::BufferPool).
///
/// The expand/shrink hysteresis (capacity doubles on demand up to
/// `max_expand_times`, halves again when usage falls under half) can thrash
/// under alternating allocation sizes; these values are the place to tune it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Base capacity ceiling per memory space, before expansion.
    pub capacity: Capacity,
    /// How many times the capacity may be doubled.
    pub max_expand_times: u32,
    /// How long a released block may stay idle before it is evicted.
    pub idle_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: Capacity::default(),
            max_expand_times: 5,
            idle_timeout_secs: 5,
        }
    }
}

impl PoolConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, MemoryError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MemoryError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, MemoryError> {
        toml::from_str(toml_str).map_err(|e| MemoryError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, MemoryError> {
        toml::to_string_pretty(self)
            .map_err(|e| MemoryError::Config(format!("TOML serialise error: {e}")))
    }

    /// Returns the idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = PoolConfig::default();
        assert_eq!(c.capacity.as_bytes(), 5_242_880);
        assert_eq!(c.max_expand_times, 5);
        assert_eq!(c.idle_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
capacity = "64M"
max_expand_times = 2
idle_timeout_secs = 30
"#;
        let c = PoolConfig::from_toml(toml).unwrap();
        assert_eq!(c.capacity, Capacity::from_mb(64));
        assert_eq!(c.max_expand_times, 2);
        assert_eq!(c.idle_timeout_secs, 30);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let c = PoolConfig::from_toml("max_expand_times = 1").unwrap();
        assert_eq!(c.capacity, Capacity::default());
        assert_eq!(c.max_expand_times, 1);
        assert_eq!(c.idle_timeout_secs, 5);
    }

    #[test]
    fn test_integer_capacity_in_toml() {
        let c = PoolConfig::from_toml("capacity = 5242880").unwrap();
        assert_eq!(c.capacity, Capacity::from_mb(5));
        assert!(PoolConfig::from_toml("capacity = 0").is_err());
    }

    #[test]
    fn test_invalid_capacity() {
        let err = PoolConfig::from_toml("capacity = \"zero\"").unwrap_err();
        assert!(matches!(err, MemoryError::Config(_)));
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = PoolConfig {
            capacity: Capacity::from_mb(12),
            max_expand_times: 3,
            idle_timeout_secs: 9,
        };
        let back = PoolConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_missing_file() {
        let err = PoolConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, MemoryError::Config(_)));
    }
}
