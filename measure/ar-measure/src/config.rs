//! Measurement configuration.

use serde::{Deserialize, Serialize};

use crate::error::{MeasureError, MeasureResult};
use crate::hand::LandmarkMapping;

/// Configuration for [`MeasurementProbe`](crate::MeasurementProbe).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureConfig {
    /// Joints below this confidence void their digit.
    pub min_confidence: f32,
    /// Normalized landmark to screen point mapping.
    pub landmark_mapping: LandmarkMapping,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            landmark_mapping: LandmarkMapping::default(),
        }
    }
}

impl MeasureConfig {
    /// Sets the minimum joint confidence.
    #[must_use]
    pub const fn with_min_confidence(mut self, value: f32) -> Self {
        self.min_confidence = value;
        self
    }

    /// Sets the landmark mapping.
    #[must_use]
    pub const fn with_landmark_mapping(mut self, mapping: LandmarkMapping) -> Self {
        self.landmark_mapping = mapping;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError::InvalidParams`] if the confidence is outside
    /// `[0, 1]` or the mapping has a non-positive dimension.
    pub fn validate(&self) -> MeasureResult<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(MeasureError::invalid_params(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        if !self.landmark_mapping.is_valid() {
            return Err(MeasureError::invalid_params(
                "landmark mapping dimensions must be positive",
            ));
        }
        Ok(())
    }
}
