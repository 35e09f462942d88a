//! Millisecond values for timestamps and measures.
//!
//! We use signed float milliseconds as the canonical unit: the timing
//! sources this schema mirrors (high-resolution clocks, paint timing)
//! report fractional milliseconds, and a measure taken between marks that
//! were recorded out of order is negative rather than an error.

use core::time::Duration;

/// A duration or offset in milliseconds.
///
/// Unlike `core::time::Duration` this may be negative: a measure between
/// two marks is simply `end - start`, and mark ordering is observable, not
/// enforced. Because the payload is an `f64`, this type is `PartialEq`/
/// `PartialOrd` only.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(transparent))]
pub struct Millis(#[cfg_attr(feature = "minicbor", n(0))] pub f64);

impl Millis {
    /// Zero milliseconds.
    pub const ZERO: Millis = Millis(0.0);

    /// Create from milliseconds.
    pub const fn from_millis(millis: f64) -> Self {
        Self(millis)
    }

    /// Create from whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self((secs * 1000) as f64)
    }

    /// Get the value in milliseconds.
    pub const fn as_millis(&self) -> f64 {
        self.0
    }

    /// Get the value in seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 / 1000.0
    }

    /// Whether this value is below zero (marks recorded out of order).
    pub fn is_negative(&self) -> bool {
        self.0 < 0.0
    }

    /// Convert to a standard `Duration`, clamping negatives to zero.
    pub fn to_duration(&self) -> Duration {
        if self.0 <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(self.0 / 1000.0)
        }
    }
}

impl From<Duration> for Millis {
    fn from(d: Duration) -> Self {
        Self(d.as_secs_f64() * 1000.0)
    }
}

impl From<Millis> for Duration {
    fn from(m: Millis) -> Self {
        m.to_duration()
    }
}

impl core::ops::Sub for Millis {
    type Output = Millis;

    fn sub(self, rhs: Millis) -> Millis {
        Millis(self.0 - rhs.0)
    }
}

impl core::ops::Add for Millis {
    type Output = Millis;

    fn add(self, rhs: Millis) -> Millis {
        Millis(self.0 + rhs.0)
    }
}
