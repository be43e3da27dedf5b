//! Color frames and camera calibration.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, SensorError};
use crate::{Pose3d, Timestamp};

/// Pixel layout of a [`ColorFrame`] buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ImageEncoding {
    /// BGRA 8-bit per channel, the native camera output.
    #[default]
    Bgra8,
    /// RGBA 8-bit per channel.
    Rgba8,
    /// Single 8-bit luma channel.
    Gray8,
}

impl ImageEncoding {
    /// Returns the number of bytes per pixel.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra8 | Self::Rgba8 => 4,
            Self::Gray8 => 1,
        }
    }

    /// Returns the expected buffer size for an image of this encoding.
    #[must_use]
    pub const fn buffer_size(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }

    /// Rec. 709 luma of one pixel, in `[0, 1]`.
    fn luma(self, px: &[u8]) -> f64 {
        let (r, g, b) = match self {
            Self::Bgra8 => (px[2], px[1], px[0]),
            Self::Rgba8 => (px[0], px[1], px[2]),
            Self::Gray8 => return f64::from(px[0]) / 255.0,
        };
        0.0722f64.mul_add(
            f64::from(b),
            0.2126f64.mul_add(f64::from(r), 0.7152 * f64::from(g)),
        ) / 255.0
    }
}

/// Pinhole camera intrinsics.
///
/// `width`/`height` are the reference dimensions the focal lengths and
/// principal point were measured at.
///
/// # Example
///
/// ```
/// use sensor_types::CameraIntrinsics;
///
/// let intrinsics = CameraIntrinsics::ideal(500.0, 640, 480);
/// let pixel = intrinsics.project([0.0, 0.0, 1.0]).unwrap();
/// assert!((pixel[0] - 320.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraIntrinsics {
    /// Focal length in pixels (x direction).
    pub fx: f64,
    /// Focal length in pixels (y direction).
    pub fy: f64,
    /// Principal point x-coordinate in pixels.
    pub cx: f64,
    /// Principal point y-coordinate in pixels.
    pub cy: f64,
    /// Reference width in pixels.
    pub width: u32,
    /// Reference height in pixels.
    pub height: u32,
}

impl CameraIntrinsics {
    /// Creates intrinsics from explicit parameters.
    #[must_use]
    pub const fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        }
    }

    /// Creates intrinsics with the principal point at the image center.
    #[must_use]
    pub fn ideal(focal_length: f64, width: u32, height: u32) -> Self {
        Self::new(
            focal_length,
            focal_length,
            f64::from(width) / 2.0,
            f64::from(height) / 2.0,
            width,
            height,
        )
    }

    /// Rescales the intrinsics to another image resolution.
    ///
    /// Depth maps are delivered at a lower resolution than the reference
    /// dimensions, so the intrinsics must be scaled before unprojecting.
    #[must_use]
    pub fn scaled_to(&self, width: u32, height: u32) -> Self {
        let sx = f64::from(width) / f64::from(self.width.max(1));
        let sy = f64::from(height) / f64::from(self.height.max(1));
        Self::new(
            self.fx * sx,
            self.fy * sy,
            self.cx * sx,
            self.cy * sy,
            width,
            height,
        )
    }

    /// Checks that focal lengths and reference dimensions are usable.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidCalibration`] on a non-positive focal
    /// length or a zero reference dimension.
    pub fn validate(&self) -> Result<()> {
        if !(self.fx > 0.0 && self.fy > 0.0) {
            return Err(SensorError::invalid_calibration(format!(
                "focal lengths must be positive, got ({}, {})",
                self.fx, self.fy
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(SensorError::invalid_calibration(
                "reference dimensions must be non-zero",
            ));
        }
        Ok(())
    }

    /// Projects a camera-space point to pixel coordinates.
    ///
    /// Returns `None` if the point is behind the camera.
    #[must_use]
    pub fn project(&self, point: [f64; 3]) -> Option<[f64; 2]> {
        let [x, y, z] = point;
        if z <= 0.0 {
            return None;
        }
        Some([self.fx * x / z + self.cx, self.fy * y / z + self.cy])
    }

    /// Unprojects a pixel to a unit ray direction in camera space (+Z forward).
    #[must_use]
    pub fn unproject(&self, pixel: [f64; 2]) -> [f64; 3] {
        let x = (pixel[0] - self.cx) / self.fx;
        let y = (pixel[1] - self.cy) / self.fy;
        let norm = x.mul_add(x, y.mul_add(y, 1.0)).sqrt();
        [x / norm, y / norm, 1.0 / norm]
    }
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self::ideal(500.0, 640, 480)
    }
}

/// Calibration delivered alongside each synchronized pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraCalibration {
    /// Color camera intrinsics at the reference dimensions.
    pub intrinsics: CameraIntrinsics,
    /// Transform from the depth sensor to the color camera.
    pub depth_to_color: Pose3d,
}

impl CameraCalibration {
    /// Creates a calibration with co-located depth and color sensors.
    #[must_use]
    pub const fn new(intrinsics: CameraIntrinsics) -> Self {
        Self {
            intrinsics,
            depth_to_color: Pose3d::identity(),
        }
    }

    /// Sets the depth-to-color extrinsics.
    #[must_use]
    pub const fn with_depth_to_color(mut self, pose: Pose3d) -> Self {
        self.depth_to_color = pose;
        self
    }

    /// Intrinsics rescaled to a delivered buffer resolution.
    #[must_use]
    pub fn intrinsics_for(&self, width: u32, height: u32) -> CameraIntrinsics {
        self.intrinsics.scaled_to(width, height)
    }
}

/// A color image from the capture pipeline.
///
/// `exposure_brightness` carries the exposure brightness value from the
/// capture metadata when the platform provides one (an APEX-style value where
/// `0.0` is roughly a dim indoor scene).
#[derive(Debug, Clone, PartialEq)]
pub struct ColorFrame {
    /// Capture timestamp.
    pub timestamp: Timestamp,
    /// Pixel data, row-major.
    pub pixels: Arc<[u8]>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Pixel layout.
    pub encoding: ImageEncoding,
    /// Brightness value from capture metadata, if any.
    pub exposure_brightness: Option<f64>,
}

impl ColorFrame {
    /// Creates a color frame, validating the buffer against the dimensions.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero or the buffer has the wrong size.
    pub fn try_new(
        timestamp: Timestamp,
        pixels: impl Into<Arc<[u8]>>,
        width: u32,
        height: u32,
        encoding: ImageEncoding,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SensorError::invalid_dimensions(width, height));
        }
        let pixels = pixels.into();
        let expected = encoding.buffer_size(width, height);
        if pixels.len() != expected {
            return Err(SensorError::buffer_mismatch(expected, pixels.len()));
        }
        Ok(Self {
            timestamp,
            pixels,
            width,
            height,
            encoding,
            exposure_brightness: None,
        })
    }

    /// Creates a BGRA frame filled with a single color.
    #[must_use]
    pub fn filled(timestamp: Timestamp, width: u32, height: u32, bgra: [u8; 4]) -> Self {
        let pixels: Vec<u8> = bgra
            .iter()
            .copied()
            .cycle()
            .take(ImageEncoding::Bgra8.buffer_size(width, height))
            .collect();
        Self {
            timestamp,
            pixels: pixels.into(),
            width,
            height,
            encoding: ImageEncoding::Bgra8,
            exposure_brightness: None,
        }
    }

    /// Attaches the metadata brightness value.
    #[must_use]
    pub const fn with_exposure_brightness(mut self, value: f64) -> Self {
        self.exposure_brightness = Some(value);
        self
    }

    /// Returns the total number of pixels.
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Mean Rec. 709 luma in `[0, 1]`, or `None` for an empty buffer.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_luma(&self) -> Option<f64> {
        let bpp = self.encoding.bytes_per_pixel();
        let mut count = 0usize;
        let sum: f64 = self
            .pixels
            .chunks_exact(bpp)
            .inspect(|_| count += 1)
            .map(|px| self.encoding.luma(px))
            .sum();
        (count > 0).then(|| sum / count as f64)
    }
}
