//! Feedback timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::prompt::PromptTable;

/// Feedback configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Interval of the repeating scanning haptic.
    pub scanning_pulse_interval_ms: u64,
    /// Delay between stopping the scanning haptic and the success pulse.
    pub success_delay_ms: u64,
    /// Prompt texts.
    pub prompts: PromptTable,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            scanning_pulse_interval_ms: 125,
            success_delay_ms: 100,
            prompts: PromptTable::default(),
        }
    }
}

impl FeedbackConfig {
    /// Interval of the repeating scanning haptic (never zero).
    #[must_use]
    pub fn scanning_pulse_interval(&self) -> Duration {
        Duration::from_millis(self.scanning_pulse_interval_ms.max(1))
    }

    /// Delay before the success pulse.
    #[must_use]
    pub const fn success_delay(&self) -> Duration {
        Duration::from_millis(self.success_delay_ms)
    }
}
