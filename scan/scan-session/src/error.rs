//! Error types for scan sessions.

use thiserror::Error;

/// Errors that end or prevent a scan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The reconstruction engine reported an API error.
    #[error("reconstruction engine error: {0}")]
    ReconstructionApi(String),

    /// The engine failed before enough frames were fused.
    #[error("insufficient frames: {succeeded} succeeded, {required} required")]
    InsufficientFrames {
        /// Frames fused successfully before the failure.
        succeeded: u32,
        /// Minimum needed to keep the partial scan.
        required: u32,
    },

    /// The device reached a critical thermal state.
    #[error("thermal state critical")]
    ThermalCritical,

    /// The mesh texturing pass failed.
    #[error("texturing failed: {0}")]
    Texturing(String),

    /// The session task is gone.
    #[error("session channel closed")]
    ChannelClosed,

    /// Configuration values are out of range.
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
}

impl SessionError {
    /// Creates a reconstruction API error.
    #[must_use]
    pub fn reconstruction_api(message: impl Into<String>) -> Self {
        Self::ReconstructionApi(message.into())
    }

    /// Creates a texturing error.
    #[must_use]
    pub fn texturing(message: impl Into<String>) -> Self {
        Self::Texturing(message.into())
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

/// Result type for scan sessions.
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn error_insufficient_frames() {
        let err = SessionError::InsufficientFrames {
            succeeded: 49,
            required: 50,
        };
        let msg = err.to_string();
        assert!(msg.contains("49"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn error_reconstruction_api() {
        let err = SessionError::reconstruction_api("metal device lost");
        assert!(err.to_string().contains("metal device lost"));
    }

    #[test]
    fn error_invalid_config() {
        let err = SessionError::invalid_config("countdown_start must be > 0");
        assert!(err.to_string().contains("countdown_start"));
    }
}
