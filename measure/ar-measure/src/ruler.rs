//! Free-form two-tap ruler.
//!
//! The first tap anchors a start point under the screen center. Until the
//! second tap, [`Ruler::update`] re-raycasts the center every frame and
//! yields a pending segment. The second tap locks the measurement; a third
//! tap discards it and anchors a new start.

use std::fmt;

use nalgebra::Point3;
use tracing::debug;

use crate::distance::MeasurementSegment;
use crate::error::{MeasureError, MeasureResult};
use crate::raycast::TrackingFrame;

/// What the status line should show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RulerStatus {
    /// No plane is tracked yet.
    NoSurface,
    /// Waiting for the first tap.
    PlaceStart,
    /// Start anchored, waiting for the second tap.
    PlaceEnd,
    /// Measurement locked, in centimeters.
    Measured(f64),
}

impl fmt::Display for RulerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSurface => f.write_str("Move the camera to find a surface"),
            Self::PlaceStart => f.write_str("Tap to place the start point"),
            Self::PlaceEnd => f.write_str("Tap to place the end point"),
            Self::Measured(cm) => write!(f, "{cm:.2} cm"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Empty,
    Anchored {
        start: Point3<f64>,
        pending: Option<MeasurementSegment>,
    },
    Locked(MeasurementSegment),
}

/// Two-tap distance ruler.
#[derive(Debug, Clone, PartialEq)]
pub struct Ruler {
    phase: Phase,
    surface_seen: bool,
}

impl Default for Ruler {
    fn default() -> Self {
        Self::new()
    }
}

impl Ruler {
    /// Creates an empty ruler.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::Empty,
            surface_seen: false,
        }
    }

    /// Anchors a point under the screen center.
    ///
    /// # Errors
    ///
    /// [`MeasureError::NoSurface`] if no plane is tracked, or
    /// [`MeasureError::NoHit`] if the center ray misses every plane. The
    /// ruler is left unchanged in both cases.
    pub fn tap(&mut self, frame: &TrackingFrame) -> MeasureResult<RulerStatus> {
        self.surface_seen |= frame.has_surface();
        if !frame.has_surface() {
            return Err(MeasureError::NoSurface);
        }
        let point = frame
            .raycast(frame.viewport.center())
            .ok_or(MeasureError::NoHit)?;

        self.phase = match self.phase {
            Phase::Empty | Phase::Locked(_) => Phase::Anchored {
                start: point,
                pending: None,
            },
            Phase::Anchored { start, .. } => {
                let segment = MeasurementSegment::new(start, point);
                debug!(distance_cm = segment.distance_cm, "ruler locked");
                Phase::Locked(segment)
            }
        };
        Ok(self.status())
    }

    /// Refreshes the pending segment from the current frame.
    ///
    /// Returns the pending segment while only the start is anchored. A
    /// missed raycast keeps the previous pending segment.
    pub fn update(&mut self, frame: &TrackingFrame) -> Option<MeasurementSegment> {
        self.surface_seen |= frame.has_surface();
        let Phase::Anchored { start, pending } = &mut self.phase else {
            return None;
        };
        if let Some(end) = frame.raycast(frame.viewport.center()) {
            *pending = Some(MeasurementSegment::pending(*start, end));
        }
        *pending
    }

    /// Current status line.
    #[must_use]
    pub const fn status(&self) -> RulerStatus {
        match self.phase {
            Phase::Empty if !self.surface_seen => RulerStatus::NoSurface,
            Phase::Empty => RulerStatus::PlaceStart,
            Phase::Anchored { .. } => RulerStatus::PlaceEnd,
            Phase::Locked(segment) => RulerStatus::Measured(segment.distance_cm),
        }
    }

    /// The anchored start point, if any.
    #[must_use]
    pub const fn start(&self) -> Option<Point3<f64>> {
        match self.phase {
            Phase::Empty => None,
            Phase::Anchored { start, .. } => Some(start),
            Phase::Locked(segment) => Some(segment.start),
        }
    }

    /// The locked measurement, if both points are anchored.
    #[must_use]
    pub const fn measurement(&self) -> Option<&MeasurementSegment> {
        match &self.phase {
            Phase::Locked(segment) => Some(segment),
            _ => None,
        }
    }

    /// Clears every anchored point.
    pub fn reset(&mut self) {
        self.phase = Phase::Empty;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::raycast::{TrackedPlane, Viewport};
    use nalgebra::Vector3;
    use sensor_types::{CameraIntrinsics, Pose3d};

    fn frame_at(x: f64) -> TrackingFrame {
        TrackingFrame::new(
            Pose3d::from_translation([x, 0.0, 0.0]),
            CameraIntrinsics::ideal(500.0, 640, 480),
            Viewport::new(640.0, 480.0),
        )
        .with_plane(TrackedPlane::new(Point3::new(0.0, 0.0, 0.5), Vector3::z()))
    }

    fn bare_frame() -> TrackingFrame {
        let mut frame = frame_at(0.0);
        frame.planes.clear();
        frame
    }

    #[test]
    fn test_tap_without_surface_fails() {
        let mut ruler = Ruler::new();
        assert_eq!(ruler.status(), RulerStatus::NoSurface);
        assert_eq!(ruler.tap(&bare_frame()), Err(MeasureError::NoSurface));
        assert_eq!(ruler.start(), None);
    }

    #[test]
    fn test_two_taps_lock_measurement() {
        let mut ruler = Ruler::new();
        assert_eq!(ruler.tap(&frame_at(0.0)).unwrap(), RulerStatus::PlaceEnd);

        let pending = ruler.update(&frame_at(0.03)).unwrap();
        assert!(pending.pending);
        assert_eq!(pending.distance_cm, 3.0);

        assert_eq!(ruler.tap(&frame_at(0.05)).unwrap(), RulerStatus::Measured(5.0));
        let locked = ruler.measurement().unwrap();
        assert!(!locked.pending);
        assert_eq!(ruler.update(&frame_at(0.08)), None);
    }

    #[test]
    fn test_pending_survives_missed_raycast() {
        let mut ruler = Ruler::new();
        ruler.tap(&frame_at(0.0)).unwrap();
        ruler.update(&frame_at(0.02)).unwrap();
        let kept = ruler.update(&bare_frame()).unwrap();
        assert_eq!(kept.distance_cm, 2.0);
    }

    #[test]
    fn test_third_tap_restarts() {
        let mut ruler = Ruler::new();
        ruler.tap(&frame_at(0.0)).unwrap();
        ruler.tap(&frame_at(0.05)).unwrap();
        assert_eq!(ruler.tap(&frame_at(0.1)).unwrap(), RulerStatus::PlaceEnd);
        assert!(ruler.measurement().is_none());
        assert!((ruler.start().unwrap().x - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_reset_returns_to_place_start() {
        let mut ruler = Ruler::new();
        ruler.tap(&frame_at(0.0)).unwrap();
        ruler.reset();
        assert_eq!(ruler.status(), RulerStatus::PlaceStart);
        assert_eq!(ruler.start(), None);
    }

    #[test]
    fn test_status_text() {
        assert_eq!(RulerStatus::Measured(4.2).to_string(), "4.20 cm");
        assert!(RulerStatus::PlaceStart.to_string().contains("start"));
    }
}
