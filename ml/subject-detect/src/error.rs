//! Error types for subject detection.

use thiserror::Error;

/// Errors that can occur during subject detection.
#[derive(Debug, Clone, Error)]
pub enum DetectError {
    /// The classifier failed on a frame.
    #[error("classifier failed: {0}")]
    Classifier(String),

    /// A threshold or label in the configuration is unusable.
    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),
}

impl DetectError {
    /// Creates a classifier error.
    #[must_use]
    pub fn classifier(reason: impl Into<String>) -> Self {
        Self::Classifier(reason.into())
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

/// Result type for subject detection.
pub type Result<T> = std::result::Result<T, DetectError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn error_classifier() {
        let err = DetectError::classifier("model not loaded");
        assert!(err.to_string().contains("classifier failed"));
        assert!(err.to_string().contains("model not loaded"));
    }

    #[test]
    fn error_invalid_config() {
        let err = DetectError::invalid_config("positive label is empty");
        assert!(err.to_string().contains("invalid detector configuration"));
    }
}
