//! Countdown/scan state machine and reconstruction hand-off.
//!
//! The session moves through `Idle → Countdown(n) → Scanning → Idle`:
//!
//! - [`ScanStateMachine`] is the pure transition logic. It consumes
//!   [`Input`]s and returns [`Command`]s, with no I/O and no clock.
//! - [`ScanSession`] runs the machine on a Tokio task, executes commands
//!   against the injected [`Collaborators`], publishes [`ScanState`] on a
//!   `watch` channel and broadcasts [`SessionEvent`]s.
//!
//! # Frame routing
//!
//! Idle frames go to the subject detector; scanning frames go to the
//! [`ReconstructionEngine`] one at a time in arrival order. Every
//! `snapshot_interval`-th processed frame hands its color buffer to the
//! [`MeshTexturer`].
//!
//! # Exits
//!
//! | Exit | Result |
//! |------|--------|
//! | Trigger, safety delay, engine failure with enough frames | finished: finalize, point cloud, texture |
//! | Engine failure with too few frames, engine API error | canceled: reset everything |
//! | Thermal critical, background, memory warning | aborted: silent reset |
//!
//! # Example
//!
//! ```
//! use scan_session::{Input, ScanState, ScanStateMachine, SessionConfig};
//!
//! let mut machine = ScanStateMachine::new(SessionConfig::default());
//! machine.handle(Input::CaptureRunning(true));
//! machine.handle(Input::SubjectConfirmed);
//! assert_eq!(machine.state(), ScanState::Countdown(3));
//!
//! machine.handle(Input::ThermalCritical);
//! assert_eq!(machine.state(), ScanState::Idle);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod engine;
mod error;
mod machine;
mod runtime;
mod state;

pub use config::SessionConfig;
pub use engine::{
    CaptureControl, EngineEvent, EngineEventSink, EngineEvents, FrameMetadata, FrameResult,
    Matrix4, MeshTexturer, PointCloud, ReconstructionEngine, ReconstructionStats, ScanOutput,
    TexturedMesh, TexturingStatus, engine_channel,
};
pub use error::{Result, SessionError};
pub use machine::{Command, Input, ScanStateMachine};
pub use runtime::{Collaborators, ScanSession, SessionCore, SessionSources};
pub use state::{Cause, ScanState, SessionEvent, TerminationReason, Transition};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        Collaborators, MeshTexturer, ReconstructionEngine, ScanSession, ScanState,
        SessionConfig, SessionEvent, SessionSources,
    };
}
