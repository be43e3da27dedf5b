//! Capture session ownership and synchronized color+depth delivery.
//!
//! [`SensorSynchronizer`] owns the capture session behind a
//! [`CaptureDevice`] implementation and turns each hardware pair into a
//! [`FrameSample`](sensor_types::FrameSample):
//!
//! - Session lifecycle: [`configure`](SensorSynchronizer::configure) (cached
//!   [`SetupResult`]), [`start`](SensorSynchronizer::start),
//!   [`stop`](SensorSynchronizer::stop), serialized on a session queue
//! - Pair delivery: hardware-dropped and incomplete pairs are discarded,
//!   brightness and depth-at-center are published on `watch` channels, and
//!   at most one sample is in flight
//! - Failure handling: one silent restart after a media-services reset,
//!   interruptions and thermal-critical surfaced as [`SensorSignal`]s,
//!   background toggling without teardown
//!
//! # Example
//!
//! ```
//! use sensor_sync::{CaptureConfig, DetectableRange};
//!
//! let range: DetectableRange = CaptureConfig::default().detectable_range();
//! assert!(range.contains(range.near));
//! assert!(!range.contains(range.far));
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod brightness;
mod config;
mod device;
mod error;
mod synchronizer;

pub use brightness::estimate_brightness;
pub use config::{CaptureConfig, DetectableRange, RangeReport};
pub use device::{
    AuthorizationStatus, CaptureDevice, CaptureGraph, InterruptionReason, RawPair, RuntimeFault,
    ThermalState,
};
pub use error::{CaptureError, Result};
pub use synchronizer::{
    DeliveryOutcome, DeliveryStats, SensorOutputs, SensorSignal, SensorSynchronizer, SetupResult,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        CaptureConfig, CaptureDevice, CaptureError, DeliveryOutcome, RawPair, SensorOutputs,
        SensorSignal, SensorSynchronizer, SetupResult, ThermalState,
    };
}
