//! Output device seams: haptics and speech.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Haptic patterns used during a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HapticPulse {
    /// Medium impact, once per countdown tick.
    CountdownTick,
    /// Selection tick, repeated while scanning.
    ScanningTick,
    /// Success notification after a finished scan.
    Success,
    /// Error notification after a canceled countdown or scan.
    Error,
}

/// Fire-and-forget haptic output.
pub trait HapticEngine: Send + Sync {
    /// Plays one pulse.
    fn play(&self, pulse: HapticPulse);
}

/// A FIFO text-to-speech engine.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Speaks `text`, resolving once the utterance has finished.
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::Speech`](crate::FeedbackError::Speech) when
    /// the utterance cannot be spoken.
    async fn speak(&self, text: &str) -> Result<()>;
}
