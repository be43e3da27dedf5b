//! Synchronized frame samples.

use crate::{CameraCalibration, ColorFrame, DepthMap, Timestamp};

/// One synchronized color+depth pair, ready for the detector and the
/// reconstruction engine.
///
/// Produced once per delivered pair and never queued beyond one processing
/// cycle; cloning only bumps the buffer reference counts.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSample {
    /// Color image.
    pub color: ColorFrame,
    /// Depth map aligned to the color image.
    pub depth: DepthMap,
    /// Calibration for this pair.
    pub calibration: CameraCalibration,
    /// Timestamp of the color frame.
    pub timestamp: Timestamp,
    /// Scene brightness (exposure value scale, `0.0` is dim).
    pub brightness: f64,
}

impl FrameSample {
    /// Builds a sample; the timestamp is taken from the color frame.
    #[must_use]
    pub fn new(
        color: ColorFrame,
        depth: DepthMap,
        calibration: CameraCalibration,
        brightness: f64,
    ) -> Self {
        Self {
            timestamp: color.timestamp,
            color,
            depth,
            calibration,
            brightness,
        }
    }

    /// Time between the color and depth captures.
    #[must_use]
    pub const fn capture_skew(&self) -> crate::Duration {
        if self.color.timestamp.as_nanos() >= self.depth.timestamp.as_nanos() {
            self.color.timestamp.saturating_since(self.depth.timestamp)
        } else {
            self.depth.timestamp.saturating_since(self.color.timestamp)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::CameraIntrinsics;

    #[test]
    fn sample_uses_color_timestamp() {
        let color = ColorFrame::filled(Timestamp::from_millis(40), 2, 2, [0, 0, 0, 255]);
        let depth = DepthMap::filled(Timestamp::from_millis(38), 1, 1, 0.3);
        let sample = FrameSample::new(
            color,
            depth,
            CameraCalibration::new(CameraIntrinsics::ideal(100.0, 2, 2)),
            -0.5,
        );
        assert_eq!(sample.timestamp, Timestamp::from_millis(40));
        assert_eq!(sample.capture_skew().as_millis(), 2);
    }

    #[test]
    fn clone_shares_buffers() {
        let color = ColorFrame::filled(Timestamp::default(), 8, 8, [1, 2, 3, 255]);
        let depth = DepthMap::filled(Timestamp::default(), 4, 4, 0.3);
        let sample = FrameSample::new(color, depth, CameraCalibration::default(), 0.0);
        let copy = sample.clone();
        assert!(std::sync::Arc::ptr_eq(&sample.color.pixels, &copy.color.pixels));
        assert!(std::sync::Arc::ptr_eq(&sample.depth.depths, &copy.depth.depths));
    }
}
