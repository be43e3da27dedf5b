//! Session timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Scan session configuration.
///
/// # Example
///
/// ```
/// use scan_session::SessionConfig;
///
/// let config = SessionConfig::default().with_countdown(5, 1000);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.countdown_interval().as_secs(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// First countdown value.
    pub countdown_start: u8,
    /// Time between countdown ticks.
    pub countdown_interval_ms: u64,
    /// Scanning ends with a finished result this long after it starts.
    pub safety_delay_ms: u64,
    /// Every Nth fused frame snapshots its color buffer for texturing.
    pub snapshot_interval: u32,
    /// An engine failure below this succeeded-frame count cancels the scan.
    pub min_succeeded_frames: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_start: 3,
            countdown_interval_ms: 750,
            safety_delay_ms: 100,
            snapshot_interval: 20,
            min_succeeded_frames: 50,
        }
    }
}

impl SessionConfig {
    /// Sets the countdown start value and tick interval.
    #[must_use]
    pub const fn with_countdown(mut self, start: u8, interval_ms: u64) -> Self {
        self.countdown_start = start;
        self.countdown_interval_ms = interval_ms;
        self
    }

    /// Sets the safety delay.
    #[must_use]
    pub const fn with_safety_delay_ms(mut self, delay_ms: u64) -> Self {
        self.safety_delay_ms = delay_ms;
        self
    }

    /// Sets the failure threshold.
    #[must_use]
    pub const fn with_min_succeeded_frames(mut self, frames: u32) -> Self {
        self.min_succeeded_frames = frames;
        self
    }

    /// Time between countdown ticks.
    #[must_use]
    pub const fn countdown_interval(&self) -> Duration {
        Duration::from_millis(self.countdown_interval_ms)
    }

    /// Safety delay after scanning starts.
    #[must_use]
    pub const fn safety_delay(&self) -> Duration {
        Duration::from_millis(self.safety_delay_ms)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] when the countdown start or
    /// the snapshot interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.countdown_start == 0 {
            return Err(SessionError::invalid_config("countdown_start must be > 0"));
        }
        if self.snapshot_interval == 0 {
            return Err(SessionError::invalid_config(
                "snapshot_interval must be > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.countdown_start, 3);
        assert_eq!(config.countdown_interval(), Duration::from_millis(750));
        assert_eq!(config.safety_delay(), Duration::from_millis(100));
        assert_eq!(config.snapshot_interval, 20);
        assert_eq!(config.min_succeeded_frames, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = SessionConfig::default().with_countdown(0, 750);
        assert!(config.validate().is_err());

        let config = SessionConfig {
            snapshot_interval: 0,
            ..SessionConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("snapshot_interval"));
    }
}
