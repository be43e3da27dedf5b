//! Hand and ruler measurement against the live plane-tracking frame.

use std::sync::Arc;

use nalgebra::Point3;
use tracing::debug;

use crate::config::MeasureConfig;
use crate::distance::{MeasurementSegment, distance_cm};
use crate::error::{MeasureError, MeasureResult};
use crate::hand::{Digit, DigitMeasurement, HandMeasurement, HandPose, Landmark, PalmMeasurement};
use crate::raycast::TrackingFrame;
use crate::ruler::{Ruler, RulerStatus};
use crate::tracker::PlaneTracker;

/// Measures hands and drives the ruler using the current tracking frame.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use ar_measure::{MeasureConfig, MeasureError, MeasurementProbe, TrackingFrame};
///
/// let tracker = Arc::new(|| -> Option<TrackingFrame> { None });
/// let mut probe = MeasurementProbe::new(MeasureConfig::default(), tracker).unwrap();
/// assert_eq!(probe.tap(), Err(MeasureError::NoSurface));
/// ```
pub struct MeasurementProbe {
    config: MeasureConfig,
    tracker: Arc<dyn PlaneTracker>,
    ruler: Ruler,
}

impl std::fmt::Debug for MeasurementProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementProbe")
            .field("config", &self.config)
            .field("ruler", &self.ruler)
            .finish_non_exhaustive()
    }
}

impl MeasurementProbe {
    /// Creates a probe over a plane tracker.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError::InvalidParams`] if the configuration is invalid.
    pub fn new(config: MeasureConfig, tracker: Arc<dyn PlaneTracker>) -> MeasureResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tracker,
            ruler: Ruler::new(),
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &MeasureConfig {
        &self.config
    }

    /// Straight tip-to-base length of one digit.
    ///
    /// # Errors
    ///
    /// [`MeasureError::NoSurface`] without a tracked plane,
    /// [`MeasureError::LowConfidence`] if any joint is below the threshold
    /// and [`MeasureError::NoHit`] if any joint misses every plane.
    pub fn measure_digit(&self, hand: &HandPose, digit: Digit) -> MeasureResult<DigitMeasurement> {
        let frame = self.surface_frame()?;
        self.digit_in(&frame, hand, digit)
    }

    /// Middle-finger base to wrist.
    ///
    /// # Errors
    ///
    /// Same rules as [`measure_digit`](Self::measure_digit), applied to the
    /// two palm landmarks.
    pub fn measure_palm(&self, hand: &HandPose) -> MeasureResult<PalmMeasurement> {
        let frame = self.surface_frame()?;
        self.palm_in(&frame, hand)
    }

    /// Measures every digit and the palm from one frame.
    ///
    /// Digits that fail are listed in [`HandMeasurement::voided`] rather than
    /// failing the whole hand.
    ///
    /// # Errors
    ///
    /// [`MeasureError::NoSurface`] without a tracked plane.
    pub fn measure_hand(&self, hand: &HandPose) -> MeasureResult<HandMeasurement> {
        let frame = self.surface_frame()?;
        let mut result = HandMeasurement::default();
        for digit in Digit::ALL {
            match self.digit_in(&frame, hand, digit) {
                Ok(measurement) => result.digits.push(measurement),
                Err(err) => {
                    debug!(?digit, %err, "digit voided");
                    result.voided.push(digit);
                }
            }
        }
        result.palm = self.palm_in(&frame, hand).ok();
        Ok(result)
    }

    /// Anchors a ruler point under the screen center.
    ///
    /// # Errors
    ///
    /// See [`Ruler::tap`].
    pub fn tap(&mut self) -> MeasureResult<RulerStatus> {
        let frame = self.tracker.current_frame().ok_or(MeasureError::NoSurface)?;
        self.ruler.tap(&frame)
    }

    /// Per-frame ruler refresh; returns the live pending segment.
    pub fn update(&mut self) -> Option<MeasurementSegment> {
        let frame = self.tracker.current_frame()?;
        self.ruler.update(&frame)
    }

    /// The ruler state.
    #[must_use]
    pub const fn ruler(&self) -> &Ruler {
        &self.ruler
    }

    /// Clears the ruler.
    pub fn reset_ruler(&mut self) {
        self.ruler.reset();
    }

    fn surface_frame(&self) -> MeasureResult<TrackingFrame> {
        self.tracker
            .current_frame()
            .filter(TrackingFrame::has_surface)
            .ok_or(MeasureError::NoSurface)
    }

    fn digit_in(
        &self,
        frame: &TrackingFrame,
        hand: &HandPose,
        digit: Digit,
    ) -> MeasureResult<DigitMeasurement> {
        let chain = hand.digit(digit).chain();
        if chain
            .iter()
            .any(|joint| joint.confidence < self.config.min_confidence)
        {
            return Err(MeasureError::LowConfidence(digit));
        }

        let mut points = [Point3::origin(); 4];
        for (point, joint) in points.iter_mut().zip(chain) {
            *point = self.locate(frame, joint)?;
        }

        let segments = points
            .windows(2)
            .map(|pair| MeasurementSegment::new(pair[0], pair[1]))
            .collect();
        Ok(DigitMeasurement {
            digit,
            length_cm: distance_cm((points[3] - points[0]).norm()),
            segments,
        })
    }

    fn palm_in(&self, frame: &TrackingFrame, hand: &HandPose) -> MeasureResult<PalmMeasurement> {
        let base = hand.middle.base;
        let wrist = hand.wrist;
        if base.confidence < self.config.min_confidence
            || wrist.confidence < self.config.min_confidence
        {
            return Err(MeasureError::LowConfidence(Digit::Middle));
        }
        let segment = MeasurementSegment::new(self.locate(frame, base)?, self.locate(frame, wrist)?);
        Ok(PalmMeasurement {
            length_cm: segment.distance_cm,
            segment,
        })
    }

    fn locate(&self, frame: &TrackingFrame, joint: Landmark) -> MeasureResult<Point3<f64>> {
        let screen = self.config.landmark_mapping.to_screen(joint.x, joint.y);
        frame.raycast(screen).ok_or(MeasureError::NoHit)
    }
}
