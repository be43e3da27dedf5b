//! Point-to-point distances in centimeters.

use nalgebra::Point3;

/// Converts meters to centimeters, rounded half-up to two decimals.
///
/// # Example
///
/// ```
/// use ar_measure::distance_cm;
///
/// assert_eq!(distance_cm(0.04231), 4.23);
/// assert_eq!(distance_cm(0.012345), 1.23);
/// ```
#[must_use]
pub fn distance_cm(meters: f64) -> f64 {
    (meters.abs() * 10_000.0).round() / 100.0
}

/// A measured segment between two anchored points.
///
/// # Example
///
/// ```
/// use ar_measure::MeasurementSegment;
/// use nalgebra::Point3;
///
/// let segment = MeasurementSegment::new(Point3::origin(), Point3::new(0.03, 0.04, 0.0));
/// assert_eq!(segment.distance_cm, 5.0);
/// assert!(!segment.pending);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementSegment {
    /// First anchored point, in meters.
    pub start: Point3<f64>,
    /// Second anchored point, in meters.
    pub end: Point3<f64>,
    /// Euclidean length in centimeters, two decimals.
    pub distance_cm: f64,
    /// True for a live segment whose end is not anchored yet.
    pub pending: bool,
}

impl MeasurementSegment {
    /// Measures a locked segment.
    #[must_use]
    pub fn new(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self {
            start,
            end,
            distance_cm: distance_cm((end - start).norm()),
            pending: false,
        }
    }

    /// Measures a pending segment.
    #[must_use]
    pub fn pending(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self {
            pending: true,
            ..Self::new(start, end)
        }
    }

    /// Unrounded length in meters.
    #[must_use]
    pub fn length_m(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// Midpoint, where a label is drawn.
    #[must_use]
    pub fn midpoint(&self) -> Point3<f64> {
        Point3::from((self.start.coords + self.end.coords) / 2.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rounds_to_two_decimals() {
        assert_eq!(distance_cm(0.04231), 4.23);
        assert_eq!(distance_cm(0.0), 0.0);
        assert_eq!(distance_cm(1.0), 100.0);
        assert_eq!(distance_cm(0.000_05), 0.01);
    }

    #[test]
    fn test_segment_is_symmetric() {
        let a = Point3::new(0.1, 0.2, 0.3);
        let b = Point3::new(-0.2, 0.25, 0.31);
        assert_eq!(
            MeasurementSegment::new(a, b).distance_cm,
            MeasurementSegment::new(b, a).distance_cm
        );
    }

    #[test]
    fn test_pending_flag_and_midpoint() {
        let segment = MeasurementSegment::pending(Point3::origin(), Point3::new(0.1, 0.0, 0.0));
        assert!(segment.pending);
        assert_eq!(segment.distance_cm, 10.0);
        assert_relative_eq!(segment.midpoint().x, 0.05);
        assert_relative_eq!(segment.length_m(), 0.1);
    }
}
