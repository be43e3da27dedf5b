//! Subject confirmation for auto-triggered scanning.
//!
//! [`SubjectDetector`] runs a [`Classifier`] on color frames and emits a
//! single [`DetectorEvent::Confirmed`] when the subject is present, in range
//! and stable.
//!
//! # Gates
//!
//! - **Permission** - detection can be disabled (manual mode)
//! - **In range** - fed from the capture layer's depth-at-center report
//! - **Low light** - fed from brightness; selects the relaxed thresholds
//!
//! # Decision
//!
//! [`DetectorConfig::evaluate`] judges the top [`Observation`] by its
//! positive label against a confusable negative label, using
//! [`DecisionThresholds`] for normal and low light.
//!
//! # Concurrency
//!
//! One inference at a time: frames are offered through a non-blocking
//! try-acquire on a single-permit semaphore and dropped while busy.
//!
//! # Example
//!
//! ```
//! use subject_detect::{ClassLabel, DetectorConfig, Observation, Verdict};
//!
//! let config = DetectorConfig::default();
//! let top = Observation::new(0.8, vec![ClassLabel::new("Foot", 0.9), ClassLabel::new("Palm", 0.001)]);
//! assert_eq!(config.evaluate(&[top], false), Verdict::Positive);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod classifier;
mod config;
mod detector;
mod error;
mod observation;

pub use classifier::Classifier;
pub use config::{DecisionThresholds, DetectorConfig};
pub use detector::{DetectionSignal, DetectorEvent, SubjectDetector, SubmitOutcome};
pub use error::{DetectError, Result};
pub use observation::{ClassLabel, Observation, Verdict};
