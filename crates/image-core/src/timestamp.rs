// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Capture timestamps attached to images.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds and microseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Timestamp {
    pub secs: i64,
    pub micros: i64,
}

impl Timestamp {
    pub fn new(secs: i64, micros: i64) -> Self {
        Self { secs, micros }
    }

    /// The current wall-clock time. Clocks set before the epoch read as zero.
    pub fn now() -> Self {
        let since = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            secs: since.as_secs() as i64,
            micros: i64::from(since.subsec_micros()),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs, self.micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Timestamp::new(12, 34).to_string(), "12.000034");
    }

    #[test]
    fn test_now_is_after_epoch() {
        let t = Timestamp::now();
        assert!(t.secs > 0);
        assert!((0..1_000_000).contains(&t.micros));
    }

    #[test]
    fn test_ordering() {
        assert!(Timestamp::new(1, 999_999) < Timestamp::new(2, 0));
    }
}
