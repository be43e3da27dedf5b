//! Published session state and transition records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::ScanOutput;
use crate::error::SessionError;

/// The authoritative scan state.
///
/// The internal finalizing phase is published as [`ScanState::Scanning`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanState {
    /// Waiting for a trigger or a confirmed subject.
    #[default]
    Idle,
    /// Counting down; holds the seconds remaining.
    Countdown(u8),
    /// Frames are being fused.
    Scanning,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Countdown(n) => write!(f, "countdown({n})"),
            Self::Scanning => write!(f, "scanning"),
        }
    }
}

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Keep the fused data and finalize it.
    Finished,
    /// Discard everything.
    Canceled,
}

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cause {
    /// The user pressed the shutter.
    ManualTrigger,
    /// The detector confirmed the subject.
    SubjectConfirmed,
    /// The subject left the detectable range.
    SubjectLost,
    /// One countdown second elapsed.
    CountdownTick,
    /// The countdown reached zero.
    CountdownElapsed,
    /// The post-start safety delay elapsed.
    SafetyDelay,
    /// The engine reported a failed frame.
    EngineFailed,
    /// The engine reported an API error.
    EngineApiError,
    /// The device reached a critical thermal state.
    ThermalCritical,
    /// The app moved to the background.
    Backgrounded,
    /// The system reported memory pressure.
    MemoryWarning,
    /// Finalization produced a result.
    Finalized,
    /// Finalization produced no result.
    TexturingFailed,
}

/// One published state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State before.
    pub from: ScanState,
    /// State after.
    pub to: ScanState,
    /// What caused it.
    pub cause: Cause,
}

/// Events broadcast to session observers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The published state changed.
    StateChanged(Transition),
    /// Scanning stopped. Finished scans go on to finalize.
    ScanEnded {
        /// Finished or canceled.
        reason: TerminationReason,
        /// What stopped the scan.
        cause: Cause,
    },
    /// Finalization produced a point cloud and a textured mesh.
    Completed(ScanOutput),
    /// A scan was lost to an error.
    Failed(SessionError),
    /// Lighting dropped below or rose above the detection threshold.
    LowLightChanged(bool),
}
