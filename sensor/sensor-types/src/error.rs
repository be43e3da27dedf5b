//! Error types for capture data.

use thiserror::Error;

/// Errors raised while building or validating capture data.
#[derive(Debug, Error)]
pub enum SensorError {
    /// Buffer size does not match the declared dimensions.
    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch {
        /// Expected buffer size.
        expected: usize,
        /// Actual buffer size.
        actual: usize,
    },

    /// Width or height is zero.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// Calibration data is unusable (zero focal length, bad reference size).
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
}

impl SensorError {
    /// Creates a buffer size mismatch error.
    #[must_use]
    pub const fn buffer_mismatch(expected: usize, actual: usize) -> Self {
        Self::BufferSizeMismatch { expected, actual }
    }

    /// Creates an invalid dimensions error.
    #[must_use]
    pub const fn invalid_dimensions(width: u32, height: u32) -> Self {
        Self::InvalidDimensions { width, height }
    }

    /// Creates an invalid calibration error.
    #[must_use]
    pub fn invalid_calibration(reason: impl Into<String>) -> Self {
        Self::InvalidCalibration(reason.into())
    }
}

/// Result type for capture data operations.
pub type Result<T> = std::result::Result<T, SensorError>;
