//! # Timestamps
//!
//! The time value attached to stamped variables.
//!
//! The core treats a timestamp as an opaque, totally ordered, hashable key.
//! Its only additional obligation is a canonical byte encoding so that it can
//! take part in content-derived identifiers.

use crate::primitives::NANOS_PER_SEC;
use crate::types::StrandError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in time with nanosecond resolution.
///
/// Always normalised so that `nanos < 1_000_000_000`. Field order makes the
/// derived `Ord` chronological.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    /// The zero timestamp.
    pub const ZERO: Self = Self { secs: 0, nanos: 0 };

    /// Create a timestamp, carrying excess nanoseconds into seconds.
    #[must_use]
    pub const fn new(secs: i64, nanos: u32) -> Self {
        Self {
            secs: secs.saturating_add((nanos / NANOS_PER_SEC) as i64),
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    /// Create a timestamp from floating point seconds, rounded to the
    /// nearest nanosecond.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for NaN or infinite input.
    pub fn from_secs_f64(seconds: f64) -> Result<Self, StrandError> {
        if !seconds.is_finite() {
            return Err(StrandError::InvalidParameter(format!(
                "timestamp must be finite, got {}",
                seconds
            )));
        }
        let total_nanos = (seconds * f64::from(NANOS_PER_SEC)).round() as i128;
        let per_sec = i128::from(NANOS_PER_SEC);
        let secs = total_nanos.div_euclid(per_sec);
        let nanos = total_nanos.rem_euclid(per_sec);
        Ok(Self {
            secs: secs.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64,
            nanos: nanos as u32,
        })
    }

    #[must_use]
    pub const fn secs(&self) -> i64 {
        self.secs
    }

    #[must_use]
    pub const fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Seconds as `f64`. Lossy for very large values.
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + f64::from(self.nanos) / f64::from(NANOS_PER_SEC)
    }

    /// Canonical encoding used as an identity field: big-endian seconds
    /// followed by big-endian nanoseconds.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[0..8].copy_from_slice(&self.secs.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.nanos.to_be_bytes());
        bytes
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}
