//! Why a raycast or measurement produced no distance.

use thiserror::Error;

use crate::hand::Digit;

/// Shorthand for results carrying a [`MeasureError`].
pub type MeasureResult<T> = Result<T, MeasureError>;

/// Measurement failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasureError {
    /// No plane is tracked yet.
    #[error("no tracked surface")]
    NoSurface,

    /// A ray missed every tracked plane.
    #[error("raycast hit no surface")]
    NoHit,

    /// A joint of the digit is below the confidence threshold.
    #[error("{0:?} joints below confidence threshold")]
    LowConfidence(Digit),

    /// Configuration out of range.
    #[error("invalid measure config: {0}")]
    InvalidParams(String),
}

impl MeasureError {
    /// Builds [`MeasureError::InvalidParams`].
    #[must_use]
    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::InvalidParams(reason.into())
    }
}
