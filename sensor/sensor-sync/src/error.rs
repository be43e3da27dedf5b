//! Error types for the capture session.

use thiserror::Error;

/// Errors surfaced by the capture session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The user denied camera access.
    #[error("camera permission denied")]
    PermissionDenied,

    /// The device has no depth-capable camera.
    #[error("device unsupported: no depth camera available")]
    DeviceUnsupported,

    /// The capture graph could not be built.
    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    /// `start` was called before `configure`.
    #[error("capture session not configured")]
    NotConfigured,

    /// The session was interrupted by the system.
    #[error("session interrupted: {0}")]
    SessionInterrupted(String),

    /// The running session reported an error.
    #[error("session runtime error ({}): {message}", severity(.recoverable))]
    Runtime {
        /// Error description from the capture stack.
        message: String,
        /// Whether a single automatic restart may recover it.
        recoverable: bool,
    },
}

impl CaptureError {
    /// Creates a configuration failure.
    #[must_use]
    pub fn configuration_failed(reason: impl Into<String>) -> Self {
        Self::ConfigurationFailed(reason.into())
    }

    /// Creates an interruption error.
    #[must_use]
    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::SessionInterrupted(reason.into())
    }

    /// Creates a runtime error.
    #[must_use]
    pub fn runtime(message: impl Into<String>, recoverable: bool) -> Self {
        Self::Runtime {
            message: message.into(),
            recoverable,
        }
    }

    /// Returns true for errors the user has to act on (no retry is attempted).
    #[must_use]
    pub const fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied | Self::DeviceUnsupported | Self::ConfigurationFailed(_)
        )
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn severity(recoverable: &bool) -> &'static str {
    if *recoverable { "recoverable" } else { "fatal" }
}

/// Result type for capture session operations.
pub type Result<T> = std::result::Result<T, CaptureError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn error_permission_denied() {
        assert!(
            CaptureError::PermissionDenied
                .to_string()
                .contains("permission denied")
        );
    }

    #[test]
    fn error_configuration_failed() {
        let err = CaptureError::configuration_failed("cannot add depth output");
        assert!(err.to_string().contains("configuration failed"));
        assert!(err.to_string().contains("depth output"));
        assert!(err.is_setup_failure());
    }

    #[test]
    fn error_runtime_kinds() {
        let recoverable = CaptureError::runtime("media services were reset", true);
        let fatal = CaptureError::runtime("device lost", false);
        assert!(recoverable.to_string().contains("recoverable"));
        assert!(fatal.to_string().contains("fatal"));
        assert!(!fatal.is_setup_failure());
    }

    #[test]
    fn error_interrupted() {
        let err = CaptureError::interrupted("video device in use by another client");
        assert!(err.to_string().contains("session interrupted"));
    }
}
