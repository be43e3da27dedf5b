//! Capture clock types.
//!
//! Timestamps come from the capture hardware clock and are only compared
//! with each other; they are not wall-clock times.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nanosecond-precision capture timestamp.
///
/// # Example
///
/// ```
/// use sensor_types::Timestamp;
///
/// let ts = Timestamp::from_millis(1500);
/// assert!((ts.as_secs_f64() - 1.5).abs() < 1e-9);
/// assert_eq!(ts, Timestamp::from_nanos(1_500_000_000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamp {
    nanos: u64,
}

impl Timestamp {
    /// Creates a timestamp from nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Creates a timestamp from milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            nanos: millis.saturating_mul(1_000_000),
        }
    }

    /// Creates a timestamp from seconds. Negative input clamps to zero.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self {
            nanos: (secs * 1e9).max(0.0) as u64,
        }
    }

    /// Returns the timestamp as nanoseconds.
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.nanos
    }

    /// Returns the timestamp as seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.nanos as f64 / 1e9
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    #[must_use]
    pub const fn saturating_since(self, earlier: Self) -> Duration {
        Duration::from_nanos(self.nanos.saturating_sub(earlier.nanos))
    }

    /// Adds a duration, saturating at the maximum timestamp.
    #[must_use]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Self {
            nanos: self.nanos.saturating_add(duration.as_nanos()),
        }
    }
}

/// Capture clock duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Duration {
    nanos: u64,
}

impl Duration {
    /// Creates a duration from nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Creates a duration from milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            nanos: millis.saturating_mul(1_000_000),
        }
    }

    /// Returns the duration in nanoseconds.
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.nanos
    }

    /// Returns the duration in whole milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.nanos / 1_000_000
    }

    /// Returns the duration in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.nanos as f64 / 1e9
    }
}

impl From<std::time::Duration> for Duration {
    #[allow(clippy::cast_possible_truncation)]
    fn from(value: std::time::Duration) -> Self {
        Self::from_nanos(value.as_nanos().min(u128::from(u64::MAX)) as u64)
    }
}

impl From<Duration> for std::time::Duration {
    fn from(value: Duration) -> Self {
        Self::from_nanos(value.as_nanos())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_from_secs_clamps_negative() {
        assert_eq!(Timestamp::from_secs_f64(-2.0), Timestamp::default());
    }

    #[test]
    fn saturating_since_orders() {
        let a = Timestamp::from_millis(100);
        let b = Timestamp::from_millis(133);
        assert_eq!(b.saturating_since(a).as_millis(), 33);
        assert_eq!(a.saturating_since(b), Duration::default());
    }

    #[test]
    fn saturating_add_caps() {
        let ts = Timestamp::from_nanos(u64::MAX - 1);
        assert_eq!(
            ts.saturating_add(Duration::from_millis(1)).as_nanos(),
            u64::MAX
        );
    }

    #[test]
    fn std_duration_conversion() {
        let d = Duration::from(std::time::Duration::from_millis(750));
        assert_eq!(d.as_millis(), 750);
        let back: std::time::Duration = d.into();
        assert_eq!(back, std::time::Duration::from_millis(750));
    }
}
