//! Frame, depth and calibration types for synchronized color+depth capture.
//!
//! These are the raw types exchanged between the capture layer
//! (`sensor-sync`), the subject detector and the scan session:
//!
//! - [`ColorFrame`] - Color image with optional exposure metadata
//! - [`DepthMap`] - Per-pixel depth in meters, aligned to the color frame
//! - [`CameraCalibration`] - Intrinsics plus the reference dimensions they were measured at
//! - [`FrameSample`] - One synchronized color+depth pair with its brightness
//! - [`Pose3d`] - Camera pose (position + unit quaternion)
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with no runtime dependencies. It can be used by
//! platform capture adapters, test doubles and offline tools alike.
//!
//! # Buffers
//!
//! Pixel and depth payloads are reference counted (`Arc<[u8]>`, `Arc<[f32]>`)
//! so one [`FrameSample`] can be handed to the classifier and to the
//! reconstruction engine without copying image data.
//!
//! # Example
//!
//! ```
//! use sensor_types::{CameraCalibration, CameraIntrinsics, ColorFrame, DepthMap, FrameSample, Timestamp};
//!
//! let ts = Timestamp::from_millis(33);
//! let color = ColorFrame::filled(ts, 4, 4, [128, 128, 128, 255]);
//! let depth = DepthMap::filled(ts, 2, 2, 0.25);
//! let calibration = CameraCalibration::new(CameraIntrinsics::ideal(500.0, 4, 4));
//!
//! let sample = FrameSample::new(color, depth, calibration, 0.0);
//! assert_eq!(sample.timestamp, ts);
//! assert_eq!(sample.depth.depth_at_center(), Some(0.25));
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod camera;
mod depth;
mod error;
mod frame;
mod sample;
mod time;

pub use camera::{CameraCalibration, CameraIntrinsics, ColorFrame, ImageEncoding};
pub use depth::DepthMap;
pub use error::{Result, SensorError};
pub use frame::Pose3d;
pub use sample::FrameSample;
pub use time::{Duration, Timestamp};
