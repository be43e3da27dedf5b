//! Sequenced haptic and spoken feedback for scan sessions.
//!
//! [`FeedbackSequencer`] keeps feedback in a strict order: a pulse queued
//! after a prompt fires only once the speech engine reports the prompt
//! finished. Queued sequences can be canceled as a group, and the repeating
//! scanning haptic runs independently of the queue.
//!
//! Hardware lives behind two seams, [`HapticEngine`] and [`SpeechEngine`].
//!
//! # Example
//!
//! ```
//! use scan_feedback::{FeedbackConfig, HapticPulse, Prompt, Sequence};
//!
//! let config = FeedbackConfig::default();
//! assert_eq!(config.scanning_pulse_interval().as_millis(), 125);
//!
//! let countdown = Sequence::new()
//!     .speak(Prompt::CountdownBegins)
//!     .pulse(HapticPulse::CountdownTick);
//! assert_eq!(countdown.steps().len(), 2);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod engine;
mod error;
mod prompt;
mod sequencer;

pub use config::FeedbackConfig;
pub use engine::{HapticEngine, HapticPulse, SpeechEngine};
pub use error::{FeedbackError, Result};
pub use prompt::{Prompt, PromptTable};
pub use sequencer::{FeedbackSequencer, Sequence, SequenceHandle, SequenceOutcome, Step};
