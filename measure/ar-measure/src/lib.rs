//! Distance measurement by raycasting screen points onto tracked planes.
//!
//! Two measurement modes share one pipeline:
//!
//! - **Hand measurement**: each digit's four joints (tip, two mid-joints,
//!   base) are raycast from their 2D landmark positions into the scene. The
//!   digit length is the straight tip-to-base distance; the intermediate
//!   segments are returned for drawing. A joint below the confidence
//!   threshold voids that digit for the frame. The palm is measured from
//!   the middle-finger base to the wrist.
//! - **Ruler**: a two-tap free-form ruler anchored under the screen center,
//!   with a live pending segment between the taps.
//!
//! Distances are Euclidean norms in meters converted to centimeters and
//! rounded half-up to two decimals (see [`distance_cm`]).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use ar_measure::{MeasureConfig, MeasurementProbe, RulerStatus, TrackedPlane, TrackingFrame, Viewport};
//! use nalgebra::{Point3, Vector3};
//! use sensor_types::{CameraIntrinsics, Pose3d};
//!
//! let frame = TrackingFrame::new(
//!     Pose3d::identity(),
//!     CameraIntrinsics::ideal(500.0, 640, 480),
//!     Viewport::new(640.0, 480.0),
//! )
//! .with_plane(TrackedPlane::new(Point3::new(0.0, 0.0, 0.5), -Vector3::z()));
//!
//! let mut probe = MeasurementProbe::new(MeasureConfig::default(), Arc::new(move || Some(frame.clone()))).unwrap();
//! assert_eq!(probe.tap().unwrap(), RulerStatus::PlaceEnd);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod distance;
mod error;
mod hand;
mod probe;
mod raycast;
mod ruler;
mod tracker;

pub use config::MeasureConfig;
pub use distance::{MeasurementSegment, distance_cm};
pub use error::{MeasureError, MeasureResult};
pub use hand::{
    Digit, DigitJoints, DigitMeasurement, HandMeasurement, HandPose, Landmark, LandmarkMapping,
    PalmMeasurement,
};
pub use probe::MeasurementProbe;
pub use raycast::{Ray, TrackedPlane, TrackingFrame, Viewport};
pub use ruler::{Ruler, RulerStatus};
pub use tracker::PlaneTracker;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
