//! Depth maps aligned to the color camera.

use std::sync::Arc;

use crate::error::{Result, SensorError};
use crate::{CameraIntrinsics, Timestamp};

/// A depth map in meters.
///
/// Invalid pixels are `NaN`, zero or negative. Values are stored row-major:
/// `depths[y * width + x]`.
///
/// # Example
///
/// ```
/// use sensor_types::{DepthMap, Timestamp};
///
/// let depth = DepthMap::filled(Timestamp::default(), 320, 180, 0.22);
/// assert_eq!(depth.depth_at_center(), Some(0.22));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    /// Capture timestamp.
    pub timestamp: Timestamp,
    /// Per-pixel depth values in meters.
    pub depths: Arc<[f32]>,
    /// Map width in pixels.
    pub width: u32,
    /// Map height in pixels.
    pub height: u32,
}

impl DepthMap {
    /// Creates a depth map, validating the buffer against the dimensions.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero or the buffer has the wrong size.
    pub fn try_new(
        timestamp: Timestamp,
        depths: impl Into<Arc<[f32]>>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SensorError::invalid_dimensions(width, height));
        }
        let depths = depths.into();
        let expected = width as usize * height as usize;
        if depths.len() != expected {
            return Err(SensorError::buffer_mismatch(expected, depths.len()));
        }
        Ok(Self {
            timestamp,
            depths,
            width,
            height,
        })
    }

    /// Creates a depth map with every pixel at the same distance.
    #[must_use]
    pub fn filled(timestamp: Timestamp, width: u32, height: u32, meters: f32) -> Self {
        let depths: Vec<f32> = vec![meters; width as usize * height as usize];
        Self {
            timestamp,
            depths: depths.into(),
            width,
            height,
        }
    }

    /// Gets the raw depth at a pixel. Returns `None` if out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.depths.get(idx).copied()
    }

    /// Gets the depth at a pixel if it is a usable measurement.
    #[must_use]
    pub fn get_valid(&self, x: u32, y: u32) -> Option<f32> {
        self.get(x, y).filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Distance at the center pixel `(width / 2, height / 2)`.
    ///
    /// Returns `None` when the center pixel holds no usable measurement.
    #[must_use]
    pub fn depth_at_center(&self) -> Option<f32> {
        self.get_valid(self.width / 2, self.height / 2)
    }

    /// Unprojects a pixel into a camera-space point using its depth.
    #[must_use]
    pub fn unproject_pixel(&self, intrinsics: &CameraIntrinsics, x: u32, y: u32) -> Option<[f64; 3]> {
        let z = f64::from(self.get_valid(x, y)?);
        let x_norm = (f64::from(x) - intrinsics.cx) / intrinsics.fx;
        let y_norm = (f64::from(y) - intrinsics.cy) / intrinsics.fy;
        Some([x_norm * z, y_norm * z, z])
    }

    /// Fraction of pixels holding a usable measurement.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn valid_fraction(&self) -> f32 {
        if self.depths.is_empty() {
            return 0.0;
        }
        let valid = self
            .depths
            .iter()
            .filter(|d| d.is_finite() && **d > 0.0)
            .count();
        valid as f32 / self.depths.len() as f32
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn try_new_checks_size() {
        assert!(DepthMap::try_new(Timestamp::default(), vec![0.0f32; 6], 3, 2).is_ok());
        let err = DepthMap::try_new(Timestamp::default(), vec![0.0f32; 5], 3, 2).unwrap_err();
        assert!(matches!(
            err,
            SensorError::BufferSizeMismatch {
                expected: 6,
                actual: 5
            }
        ));
    }

    #[test]
    fn center_pixel_is_read() {
        // 3x3 map, only the center (1, 1) is valid.
        let mut values = vec![f32::NAN; 9];
        values[4] = 0.21;
        let map = DepthMap::try_new(Timestamp::default(), values, 3, 3).unwrap();
        assert_eq!(map.depth_at_center(), Some(0.21));
    }

    #[test]
    fn center_rejects_non_positive() {
        let zero = DepthMap::filled(Timestamp::default(), 4, 4, 0.0);
        let negative = DepthMap::filled(Timestamp::default(), 4, 4, -1.0);
        let nan = DepthMap::filled(Timestamp::default(), 4, 4, f32::NAN);
        assert_eq!(zero.depth_at_center(), None);
        assert_eq!(negative.depth_at_center(), None);
        assert_eq!(nan.depth_at_center(), None);
    }

    #[test]
    fn get_out_of_bounds() {
        let map = DepthMap::filled(Timestamp::default(), 2, 2, 1.0);
        assert_eq!(map.get(2, 0), None);
        assert_eq!(map.get(0, 2), None);
    }

    #[test]
    fn unproject_center_on_axis() {
        let map = DepthMap::filled(Timestamp::default(), 4, 4, 0.5);
        let intr = CameraIntrinsics::ideal(100.0, 4, 4);
        let p = map.unproject_pixel(&intr, 2, 2).unwrap();
        assert_eq!(p, [0.0, 0.0, 0.5]);
    }

    #[test]
    fn valid_fraction_counts() {
        let map =
            DepthMap::try_new(Timestamp::default(), vec![1.0, f32::NAN, 0.0, 2.0], 2, 2).unwrap();
        assert!((map.valid_fraction() - 0.5).abs() < 1e-6);
    }
}
