//! Error types for feedback playback.

use thiserror::Error;

/// Errors that can occur while playing feedback.
#[derive(Debug, Clone, Error)]
pub enum FeedbackError {
    /// The speech engine failed to speak an utterance.
    #[error("speech failed: {0}")]
    Speech(String),

    /// The sequencer task is gone.
    #[error("feedback sequencer closed")]
    SequencerClosed,
}

impl FeedbackError {
    /// Creates a speech error.
    #[must_use]
    pub fn speech(reason: impl Into<String>) -> Self {
        Self::Speech(reason.into())
    }
}

/// Result type for feedback playback.
pub type Result<T> = std::result::Result<T, FeedbackError>;
