//! Scene brightness for the low-light gate.

use sensor_types::ColorFrame;

/// Mid-grey reflectance; maps to a brightness of `0.0`.
const MID_GREY: f64 = 0.18;

/// Floor applied before taking the logarithm of a black frame.
const MIN_LUMA: f64 = 1e-4;

/// Brightness of a color frame on an exposure-value scale.
///
/// Uses the capture metadata value when present, otherwise
/// `log2(mean_luma / 0.18)`, so that both sources put a dim scene near or
/// below `0.0`.
///
/// # Example
///
/// ```
/// use sensor_sync::estimate_brightness;
/// use sensor_types::{ColorFrame, Timestamp};
///
/// let frame = ColorFrame::filled(Timestamp::default(), 2, 2, [0, 0, 0, 255]);
/// assert!(estimate_brightness(&frame) < 0.0);
/// assert_eq!(estimate_brightness(&frame.with_exposure_brightness(2.5)), 2.5);
/// ```
#[must_use]
pub fn estimate_brightness(frame: &ColorFrame) -> f64 {
    if let Some(value) = frame.exposure_brightness {
        return value;
    }
    let mean = frame.mean_luma().unwrap_or(0.0);
    (mean.max(MIN_LUMA) / MID_GREY).log2()
}
