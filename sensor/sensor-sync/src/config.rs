//! Capture configuration and the calibrated detection range.

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};

/// Capture configuration.
///
/// # Example
///
/// ```
/// use sensor_sync::CaptureConfig;
///
/// let config = CaptureConfig::default().with_display_size(390.0, 844.0);
/// let range = config.detectable_range();
/// assert!((range.near - 0.29616).abs() < 1e-9);
/// assert!((range.far - range.near - 0.03).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum depth output resolution (longest side, pixels).
    pub max_resolution: u32,
    /// Maximum capture framerate.
    pub max_framerate: u32,
    /// Color preset width in pixels.
    pub color_width: u32,
    /// Color preset height in pixels.
    pub color_height: u32,
    /// Minimum exposure duration in seconds.
    pub min_exposure_secs: f64,
    /// Display width in points, used to derive the near distance.
    pub display_width_pt: f64,
    /// Display height in points, used to derive the near distance.
    pub display_height_pt: f64,
    /// Meters of near distance per display point.
    pub near_per_point: f64,
    /// Width of the detectable range in meters.
    pub range_width: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_resolution: 320,
            max_framerate: 30,
            color_width: 1280,
            color_height: 720,
            min_exposure_secs: 1.0 / 60.0,
            display_width_pt: 390.0,
            display_height_pt: 844.0,
            near_per_point: 0.00024,
            range_width: 0.03,
        }
    }
}

impl CaptureConfig {
    /// Sets the display size in points.
    #[must_use]
    pub const fn with_display_size(mut self, width_pt: f64, height_pt: f64) -> Self {
        self.display_width_pt = width_pt;
        self.display_height_pt = height_pt;
        self
    }

    /// Sets the depth output limits.
    #[must_use]
    pub const fn with_limits(mut self, max_resolution: u32, max_framerate: u32) -> Self {
        self.max_resolution = max_resolution;
        self.max_framerate = max_framerate;
        self
    }

    /// The calibrated `[near, near + width)` range for subject detection.
    #[must_use]
    pub fn detectable_range(&self) -> DetectableRange {
        let near = (self.display_height_pt + self.display_width_pt) * self.near_per_point;
        DetectableRange::new(near, near + self.range_width)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::ConfigurationFailed`] for zero limits or an
    /// empty range.
    pub fn validate(&self) -> Result<()> {
        if self.max_resolution == 0 || self.max_framerate == 0 {
            return Err(CaptureError::configuration_failed(
                "resolution and framerate must be positive",
            ));
        }
        if !(self.range_width > 0.0) {
            return Err(CaptureError::configuration_failed(
                "range width must be positive",
            ));
        }
        if !(self.min_exposure_secs > 0.0) {
            return Err(CaptureError::configuration_failed(
                "minimum exposure must be positive",
            ));
        }
        Ok(())
    }
}

/// Half-open distance interval `[near, far)` in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectableRange {
    /// Inclusive lower bound.
    pub near: f64,
    /// Exclusive upper bound.
    pub far: f64,
}

impl DetectableRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(near: f64, far: f64) -> Self {
        Self { near, far }
    }

    /// Returns true if `distance` lies in `[near, far)`.
    #[must_use]
    pub fn contains(&self, distance: f64) -> bool {
        distance >= self.near && distance < self.far
    }

    /// Builds a report for a center-pixel distance.
    ///
    /// Non-positive or missing distances produce no report.
    #[must_use]
    pub fn report(&self, distance: Option<f32>) -> Option<RangeReport> {
        let distance = f64::from(distance?);
        if !(distance > 0.0) {
            return None;
        }
        Some(RangeReport {
            distance,
            in_range: self.contains(distance),
        })
    }
}

/// Depth-at-center measurement for one delivered pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeReport {
    /// Distance at the center pixel in meters.
    pub distance: f64,
    /// Whether the distance lies in the detectable range.
    pub in_range: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_limits() {
        let config = CaptureConfig::default();
        assert_eq!(config.max_resolution, 320);
        assert_eq!(config.max_framerate, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn near_from_display_size() {
        let range = CaptureConfig::default()
            .with_display_size(375.0, 812.0)
            .detectable_range();
        assert_relative_eq!(range.near, (375.0 + 812.0) * 0.00024);
        assert_relative_eq!(range.far, range.near + 0.03);
    }

    #[test]
    fn range_is_half_open() {
        let range = DetectableRange::new(0.25, 0.28);
        assert!(range.contains(0.25));
        assert!(range.contains(0.279));
        assert!(!range.contains(0.28));
        assert!(!range.contains(0.2499));
    }

    #[test]
    fn report_skips_non_positive() {
        let range = DetectableRange::new(0.25, 0.28);
        assert!(range.report(None).is_none());
        assert!(range.report(Some(0.0)).is_none());
        assert!(range.report(Some(-0.3)).is_none());
        assert!(range.report(Some(f32::NAN)).is_none());

        let report = range.report(Some(0.26)).unwrap();
        assert!(report.in_range);
        assert!(!range.report(Some(0.5)).unwrap().in_range);
    }

    #[test]
    fn validate_rejects_zero_framerate() {
        let config = CaptureConfig::default().with_limits(320, 0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("framerate"));
    }
}
