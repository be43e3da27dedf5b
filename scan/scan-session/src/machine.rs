//! Pure scan state machine.
//!
//! ```text
//! Idle ──trigger/confirmed──▶ Countdown(3..0) ──0──▶ Scanning ──finished──▶ Finalizing ──▶ Idle
//!   ▲                              │                     │                      │
//!   └──────── trigger/lost ────────┘                     │                      │
//!   └───────────────── canceled / thermal / background ──┴──────────────────────┘
//! ```
//!
//! [`ScanStateMachine::handle`] consumes one [`Input`] and returns the
//! [`Command`]s the runtime must execute, in order. It never blocks and never
//! touches a collaborator, so every transition is testable without a
//! runtime.
//!
//! Every phase change bumps the epoch. Timer and completion inputs carry the
//! epoch they were scheduled under and are ignored once it is stale.

use std::time::Duration;

use sensor_types::{ColorFrame, FrameSample};
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::engine::{EngineEvent, FrameMetadata, FrameResult, ReconstructionStats, ScanOutput};
use crate::error::SessionError;
use crate::state::{Cause, ScanState, SessionEvent, TerminationReason, Transition};

/// Inputs to the state machine.
#[derive(Debug, Clone)]
pub enum Input {
    /// A synchronized sample from capture.
    Frame(FrameSample),
    /// The shutter was pressed.
    Trigger,
    /// The detector confirmed the subject.
    SubjectConfirmed,
    /// The subject left range after confirmation.
    SubjectLost,
    /// A countdown step is due.
    CountdownTick {
        /// Epoch the tick was scheduled under.
        epoch: u64,
    },
    /// The post-start safety delay elapsed.
    SafetyDelayElapsed {
        /// Epoch the delay was scheduled under.
        epoch: u64,
    },
    /// A reconstruction engine callback.
    Engine(EngineEvent),
    /// Finalization ended.
    Finalized {
        /// Epoch finalization started under.
        epoch: u64,
        /// The scan output, or why there is none.
        result: Result<ScanOutput, SessionError>,
    },
    /// A modal was presented (`true`) or dismissed (`false`).
    ModalPresented(bool),
    /// Capture started (`true`) or stopped (`false`).
    CaptureRunning(bool),
    /// The device reached a critical thermal state.
    ThermalCritical,
    /// The app moved to the background.
    Backgrounded,
    /// The system reported memory pressure.
    MemoryWarning,
}

/// Effects for the runtime to execute.
#[derive(Debug, Clone)]
pub enum Command {
    /// Offer a color frame to the subject detector.
    SubmitDetection(ColorFrame),
    /// Fuse a sample.
    Accumulate(FrameSample),
    /// Speak the countdown intro, then deliver the first tick.
    AnnounceCountdown {
        /// Epoch for the first tick.
        epoch: u64,
    },
    /// Countdown feedback for one step.
    CountdownFeedback {
        /// Seconds remaining.
        remaining: u8,
    },
    /// Deliver [`Input::CountdownTick`] after a delay.
    ScheduleTick {
        /// Epoch for the tick.
        epoch: u64,
        /// Delay.
        after: Duration,
    },
    /// Clear the texturing buffer and start the scanning haptic.
    BeginScanning,
    /// Deliver [`Input::SafetyDelayElapsed`] after a delay.
    ScheduleSafetyDelay {
        /// Epoch for the delay.
        epoch: u64,
        /// Delay.
        after: Duration,
    },
    /// Hand a color snapshot to the texturer.
    SaveColorBuffer(FrameMetadata),
    /// Stop the scanning haptic, then play success and the finished prompt.
    FinishFeedback,
    /// Stop capture.
    StopCapture,
    /// Finalize, build the point cloud, reset the engine and texture.
    Finalize {
        /// Epoch for [`Input::Finalized`].
        epoch: u64,
    },
    /// Return every collaborator to its idle state.
    ResetSession {
        /// Play the canceled haptic.
        haptic: bool,
        /// Start capture again if it stopped.
        restart_capture: bool,
    },
    /// Reset only the reconstruction engine.
    ResetEngine,
    /// Re-arm subject detection for the next scan.
    ResetDetector,
    /// Broadcast an event to observers.
    Emit(SessionEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Countdown { remaining: u8, started: bool },
    Scanning,
    Finalizing,
}

impl Phase {
    const fn published(self) -> ScanState {
        match self {
            Self::Idle => ScanState::Idle,
            Self::Countdown { remaining, .. } => ScanState::Countdown(remaining),
            Self::Scanning | Self::Finalizing => ScanState::Scanning,
        }
    }
}

/// The scan session state machine.
///
/// # Example
///
/// ```
/// use scan_session::{Input, ScanState, ScanStateMachine, SessionConfig};
///
/// let mut machine = ScanStateMachine::new(SessionConfig::default());
/// machine.handle(Input::CaptureRunning(true));
/// machine.handle(Input::Trigger);
/// assert_eq!(machine.state(), ScanState::Countdown(3));
/// ```
#[derive(Debug, Clone)]
pub struct ScanStateMachine {
    config: SessionConfig,
    phase: Phase,
    epoch: u64,
    modal_presented: bool,
    capture_running: bool,
    frame_index: u32,
    accumulated: u64,
}

impl ScanStateMachine {
    /// Creates a machine in [`ScanState::Idle`].
    #[must_use]
    pub const fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            epoch: 0,
            modal_presented: false,
            capture_running: false,
            frame_index: 0,
            accumulated: 0,
        }
    }

    /// The published state.
    #[must_use]
    pub const fn state(&self) -> ScanState {
        self.phase.published()
    }

    /// True between a finished scan and its result.
    #[must_use]
    pub const fn is_finalizing(&self) -> bool {
        matches!(self.phase, Phase::Finalizing)
    }

    /// Current epoch; bumped on every phase change.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Processed-frame index since scanning started; drives color snapshots.
    #[must_use]
    pub const fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Samples sent to the engine since scanning started.
    #[must_use]
    pub const fn accumulated(&self) -> u64 {
        self.accumulated
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Processes one input.
    pub fn handle(&mut self, input: Input) -> Vec<Command> {
        let mut out = Vec::new();
        match input {
            Input::Frame(sample) => self.on_frame(sample, &mut out),
            Input::Trigger => self.on_trigger(&mut out),
            Input::SubjectConfirmed => {
                if self.phase == Phase::Idle && self.accepts_start() {
                    self.enter_countdown(Cause::SubjectConfirmed, &mut out);
                }
            }
            Input::SubjectLost => {
                if matches!(self.phase, Phase::Countdown { .. }) {
                    self.cancel_countdown(Cause::SubjectLost, &mut out);
                }
            }
            Input::CountdownTick { epoch } => {
                if epoch == self.epoch {
                    self.on_countdown_tick(&mut out);
                } else {
                    trace!(epoch, current = self.epoch, "stale countdown tick");
                }
            }
            Input::SafetyDelayElapsed { epoch } => {
                if epoch == self.epoch && self.phase == Phase::Scanning {
                    self.finish(Cause::SafetyDelay, &mut out);
                }
            }
            Input::Engine(event) => self.on_engine(event, &mut out),
            Input::Finalized { epoch, result } => {
                if epoch == self.epoch && self.phase == Phase::Finalizing {
                    self.on_finalized(result, &mut out);
                } else {
                    debug!(epoch, current = self.epoch, "discarding late scan result");
                }
            }
            Input::ModalPresented(presented) => self.modal_presented = presented,
            Input::CaptureRunning(running) => self.capture_running = running,
            Input::ThermalCritical => {
                self.abort(Cause::ThermalCritical, Some(SessionError::ThermalCritical), &mut out);
            }
            Input::Backgrounded => self.abort(Cause::Backgrounded, None, &mut out),
            Input::MemoryWarning => self.abort(Cause::MemoryWarning, None, &mut out),
        }
        out
    }

    const fn accepts_start(&self) -> bool {
        !self.modal_presented && self.capture_running
    }

    fn on_frame(&mut self, sample: FrameSample, out: &mut Vec<Command>) {
        match self.phase {
            Phase::Idle => out.push(Command::SubmitDetection(sample.color)),
            Phase::Scanning => {
                self.accumulated += 1;
                out.push(Command::Accumulate(sample));
            }
            Phase::Countdown { .. } | Phase::Finalizing => {}
        }
    }

    fn on_trigger(&mut self, out: &mut Vec<Command>) {
        if !self.accepts_start() {
            debug!(
                modal = self.modal_presented,
                capture = self.capture_running,
                "trigger blocked"
            );
            return;
        }
        match self.phase {
            Phase::Idle => self.enter_countdown(Cause::ManualTrigger, out),
            Phase::Countdown { remaining, .. } if remaining > 0 => {
                self.cancel_countdown(Cause::ManualTrigger, out);
            }
            Phase::Scanning => self.finish(Cause::ManualTrigger, out),
            Phase::Countdown { .. } | Phase::Finalizing => {}
        }
    }

    fn on_countdown_tick(&mut self, out: &mut Vec<Command>) {
        let Phase::Countdown { remaining, started } = self.phase else {
            return;
        };
        let remaining = if started {
            let next = remaining.saturating_sub(1);
            self.set_phase(
                Phase::Countdown {
                    remaining: next,
                    started: true,
                },
                Cause::CountdownTick,
                out,
            );
            next
        } else {
            self.phase = Phase::Countdown {
                remaining,
                started: true,
            };
            remaining
        };
        out.push(Command::CountdownFeedback { remaining });
        if remaining == 0 {
            self.enter_scanning(out);
        } else {
            out.push(Command::ScheduleTick {
                epoch: self.epoch,
                after: self.config.countdown_interval(),
            });
        }
    }

    fn on_engine(&mut self, event: EngineEvent, out: &mut Vec<Command>) {
        match event {
            EngineEvent::FrameProcessed { metadata, stats } => {
                if self.phase == Phase::Scanning {
                    self.on_frame_processed(metadata, stats, out);
                }
            }
            EngineEvent::ApiError(message) => {
                warn!(%message, state = %self.state(), "reconstruction engine API error");
                match self.phase {
                    Phase::Idle => out.push(Command::ResetEngine),
                    Phase::Countdown { .. } => {
                        self.cancel_countdown(Cause::EngineApiError, out);
                    }
                    Phase::Scanning | Phase::Finalizing => self.cancel_scan(
                        Cause::EngineApiError,
                        SessionError::reconstruction_api(message),
                        out,
                    ),
                }
            }
        }
    }

    fn on_frame_processed(
        &mut self,
        metadata: FrameMetadata,
        stats: ReconstructionStats,
        out: &mut Vec<Command>,
    ) {
        match metadata.result {
            FrameResult::Succeeded | FrameResult::PoorTracking => {
                if self.frame_index % self.config.snapshot_interval.max(1) == 0
                    && metadata.color.is_some()
                {
                    out.push(Command::SaveColorBuffer(metadata));
                }
                self.frame_index += 1;
            }
            FrameResult::Failed => {
                let required = self.config.min_succeeded_frames;
                if stats.succeeded_count < required {
                    self.cancel_scan(
                        Cause::EngineFailed,
                        SessionError::InsufficientFrames {
                            succeeded: stats.succeeded_count,
                            required,
                        },
                        out,
                    );
                } else {
                    self.finish(Cause::EngineFailed, out);
                }
            }
            FrameResult::LostTracking => {}
        }
    }

    fn on_finalized(&mut self, result: Result<ScanOutput, SessionError>, out: &mut Vec<Command>) {
        match result {
            Ok(output) => {
                info!(points = output.point_cloud.len(), "scan completed");
                self.set_phase(Phase::Idle, Cause::Finalized, out);
                out.push(Command::Emit(SessionEvent::Completed(output)));
                out.push(Command::ResetDetector);
            }
            Err(err) => {
                warn!(error = %err, "finalization produced no result");
                self.set_phase(Phase::Idle, Cause::TexturingFailed, out);
                out.push(Command::Emit(SessionEvent::Failed(err)));
                out.push(Command::ResetSession {
                    haptic: true,
                    restart_capture: true,
                });
            }
        }
    }

    fn enter_countdown(&mut self, cause: Cause, out: &mut Vec<Command>) {
        self.set_phase(
            Phase::Countdown {
                remaining: self.config.countdown_start,
                started: false,
            },
            cause,
            out,
        );
        out.push(Command::AnnounceCountdown { epoch: self.epoch });
    }

    fn cancel_countdown(&mut self, cause: Cause, out: &mut Vec<Command>) {
        self.set_phase(Phase::Idle, cause, out);
        out.push(Command::ResetSession {
            haptic: true,
            restart_capture: false,
        });
    }

    fn enter_scanning(&mut self, out: &mut Vec<Command>) {
        self.frame_index = 0;
        self.accumulated = 0;
        self.set_phase(Phase::Scanning, Cause::CountdownElapsed, out);
        out.push(Command::BeginScanning);
        out.push(Command::ScheduleSafetyDelay {
            epoch: self.epoch,
            after: self.config.safety_delay(),
        });
    }

    fn finish(&mut self, cause: Cause, out: &mut Vec<Command>) {
        info!(?cause, frames = self.accumulated, "scan finished");
        self.set_phase(Phase::Finalizing, cause, out);
        out.push(Command::Emit(SessionEvent::ScanEnded {
            reason: TerminationReason::Finished,
            cause,
        }));
        out.push(Command::FinishFeedback);
        out.push(Command::StopCapture);
        out.push(Command::Finalize { epoch: self.epoch });
    }

    fn cancel_scan(&mut self, cause: Cause, error: SessionError, out: &mut Vec<Command>) {
        warn!(?cause, error = %error, "scan canceled");
        let was_finalizing = self.phase == Phase::Finalizing;
        self.set_phase(Phase::Idle, cause, out);
        if !was_finalizing {
            out.push(Command::Emit(SessionEvent::ScanEnded {
                reason: TerminationReason::Canceled,
                cause,
            }));
        }
        out.push(Command::Emit(SessionEvent::Failed(error)));
        out.push(Command::ResetSession {
            haptic: true,
            restart_capture: true,
        });
    }

    fn abort(&mut self, cause: Cause, error: Option<SessionError>, out: &mut Vec<Command>) {
        let from = self.phase;
        if from == Phase::Idle {
            return;
        }
        warn!(?cause, state = %self.state(), "aborting to idle");
        self.set_phase(Phase::Idle, cause, out);
        if from == Phase::Scanning {
            out.push(Command::Emit(SessionEvent::ScanEnded {
                reason: TerminationReason::Canceled,
                cause,
            }));
        }
        if let Some(error) = error {
            out.push(Command::Emit(SessionEvent::Failed(error)));
        }
        out.push(Command::ResetSession {
            haptic: false,
            restart_capture: false,
        });
    }

    fn set_phase(&mut self, next: Phase, cause: Cause, out: &mut Vec<Command>) {
        let from = self.phase.published();
        let to = next.published();
        if std::mem::discriminant(&self.phase) != std::mem::discriminant(&next) {
            self.epoch += 1;
        }
        self.phase = next;
        if from != to {
            debug!(%from, %to, ?cause, epoch = self.epoch, "scan state changed");
            out.push(Command::Emit(SessionEvent::StateChanged(Transition {
                from,
                to,
                cause,
            })));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::{PointCloud, TexturedMesh};
    use sensor_types::{CameraCalibration, DepthMap, Timestamp};
    use std::sync::Arc;

    fn sample(ms: u64) -> FrameSample {
        let ts = Timestamp::from_millis(ms);
        FrameSample::new(
            ColorFrame::filled(ts, 4, 4, [128, 128, 128, 255]),
            DepthMap::filled(ts, 4, 4, 0.2),
            CameraCalibration::default(),
            0.5,
        )
    }

    fn processed(result: FrameResult, with_color: bool, succeeded: u32) -> Input {
        Input::Engine(EngineEvent::FrameProcessed {
            metadata: FrameMetadata {
                result,
                view_matrix: [[0.0; 4]; 4],
                projection_matrix: [[0.0; 4]; 4],
                color: with_color.then(|| ColorFrame::filled(Timestamp::default(), 2, 2, [0; 4])),
            },
            stats: ReconstructionStats {
                succeeded_count: succeeded,
            },
        })
    }

    fn ready() -> ScanStateMachine {
        let mut m = ScanStateMachine::new(SessionConfig::default());
        m.handle(Input::CaptureRunning(true));
        m
    }

    /// Drives a ready machine through the whole countdown.
    fn scanning() -> ScanStateMachine {
        let mut m = ready();
        m.handle(Input::Trigger);
        for _ in 0..=3 {
            let epoch = m.epoch();
            m.handle(Input::CountdownTick { epoch });
        }
        assert_eq!(m.state(), ScanState::Scanning);
        m
    }

    fn has_reset(cmds: &[Command], haptic: bool) -> bool {
        cmds.iter().any(|c| {
            matches!(c, Command::ResetSession { haptic: h, .. } if *h == haptic)
        })
    }

    fn output() -> ScanOutput {
        ScanOutput {
            point_cloud: Arc::new(PointCloud::default()),
            mesh: Arc::new(TexturedMesh::default()),
        }
    }

    #[test]
    fn test_trigger_starts_countdown() {
        let mut m = ready();
        let cmds = m.handle(Input::Trigger);
        assert_eq!(m.state(), ScanState::Countdown(3));
        assert!(
            cmds.iter()
                .any(|c| matches!(c, Command::AnnounceCountdown { epoch } if *epoch == m.epoch()))
        );
    }

    #[test]
    fn test_confirmed_starts_countdown() {
        let mut m = ready();
        m.handle(Input::SubjectConfirmed);
        assert_eq!(m.state(), ScanState::Countdown(3));
    }

    #[test]
    fn test_only_trigger_or_confirmed_leave_idle() {
        let inputs = vec![
            Input::SubjectLost,
            Input::CountdownTick { epoch: 0 },
            Input::SafetyDelayElapsed { epoch: 0 },
            processed(FrameResult::Failed, false, 0),
            Input::Frame(sample(0)),
            Input::Finalized {
                epoch: 0,
                result: Ok(output()),
            },
            Input::ThermalCritical,
            Input::Backgrounded,
            Input::MemoryWarning,
        ];
        let mut m = ready();
        for input in inputs {
            m.handle(input);
            assert_eq!(m.state(), ScanState::Idle);
        }
    }

    #[test]
    fn test_start_blocked_by_modal_or_stopped_capture() {
        let mut m = ScanStateMachine::new(SessionConfig::default());
        assert!(m.handle(Input::Trigger).is_empty());
        assert_eq!(m.state(), ScanState::Idle);

        m.handle(Input::CaptureRunning(true));
        m.handle(Input::ModalPresented(true));
        m.handle(Input::Trigger);
        m.handle(Input::SubjectConfirmed);
        assert_eq!(m.state(), ScanState::Idle);

        m.handle(Input::ModalPresented(false));
        m.handle(Input::Trigger);
        assert_eq!(m.state(), ScanState::Countdown(3));
    }

    #[test]
    fn test_modal_blocks_cancel_trigger() {
        let mut m = ready();
        m.handle(Input::Trigger);
        m.handle(Input::ModalPresented(true));
        m.handle(Input::Trigger);
        assert_eq!(m.state(), ScanState::Countdown(3));
    }

    #[test]
    fn test_countdown_ticks_down_then_scans() {
        let mut m = ready();
        m.handle(Input::Trigger);
        let epoch = m.epoch();

        let mut feedback = Vec::new();
        let mut states = Vec::new();
        for _ in 0..4 {
            let cmds = m.handle(Input::CountdownTick { epoch: m.epoch() });
            states.push(m.state());
            for c in cmds {
                if let Command::CountdownFeedback { remaining } = c {
                    feedback.push(remaining);
                }
            }
        }
        assert_eq!(feedback, vec![3, 2, 1, 0]);
        assert_eq!(
            states,
            vec![
                ScanState::Countdown(3),
                ScanState::Countdown(2),
                ScanState::Countdown(1),
                ScanState::Scanning
            ]
        );
        assert!(m.epoch() > epoch);
    }

    #[test]
    fn test_ticks_schedule_interval() {
        let mut m = ready();
        m.handle(Input::Trigger);
        let cmds = m.handle(Input::CountdownTick { epoch: m.epoch() });
        assert!(cmds.iter().any(|c| matches!(
            c,
            Command::ScheduleTick { after, .. } if *after == Duration::from_millis(750)
        )));
    }

    #[test]
    fn test_cancel_countdown_at_any_tick() {
        for ticks in 0..3 {
            let mut m = ready();
            m.handle(Input::Trigger);
            for _ in 0..ticks {
                m.handle(Input::CountdownTick { epoch: m.epoch() });
            }
            let stale = m.epoch();
            let cmds = m.handle(Input::Trigger);
            assert_eq!(m.state(), ScanState::Idle);
            assert!(has_reset(&cmds, true));

            // A tick scheduled before the cancel changes nothing.
            let cmds = m.handle(Input::CountdownTick { epoch: stale });
            assert!(cmds.is_empty());
            assert_eq!(m.state(), ScanState::Idle);
        }
    }

    #[test]
    fn test_subject_lost_cancels_countdown() {
        let mut m = ready();
        m.handle(Input::SubjectConfirmed);
        let cmds = m.handle(Input::SubjectLost);
        assert_eq!(m.state(), ScanState::Idle);
        assert!(has_reset(&cmds, true));
    }

    #[test]
    fn test_scanning_entry_commands() {
        let mut m = ready();
        m.handle(Input::Trigger);
        for _ in 0..3 {
            m.handle(Input::CountdownTick { epoch: m.epoch() });
        }
        let cmds = m.handle(Input::CountdownTick { epoch: m.epoch() });
        assert!(cmds.iter().any(|c| matches!(c, Command::BeginScanning)));
        assert!(cmds.iter().any(|c| matches!(
            c,
            Command::ScheduleSafetyDelay { after, .. } if *after == Duration::from_millis(100)
        )));
    }

    #[test]
    fn test_frames_route_by_state() {
        let mut m = ready();
        let cmds = m.handle(Input::Frame(sample(1)));
        assert!(matches!(cmds[..], [Command::SubmitDetection(_)]));

        m.handle(Input::Trigger);
        assert!(m.handle(Input::Frame(sample(2))).is_empty());

        let mut m = scanning();
        for ms in 0..5 {
            let cmds = m.handle(Input::Frame(sample(ms)));
            match &cmds[..] {
                [Command::Accumulate(s)] => assert_eq!(s.timestamp, Timestamp::from_millis(ms)),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(m.accumulated(), 5);
    }

    #[test]
    fn test_snapshot_every_twentieth_frame() {
        let mut m = scanning();
        let mut saved = Vec::new();
        for i in 0..45 {
            let cmds = m.handle(processed(FrameResult::Succeeded, true, i));
            if cmds.iter().any(|c| matches!(c, Command::SaveColorBuffer(_))) {
                saved.push(i);
            }
        }
        assert_eq!(saved, vec![0, 20, 40]);
        assert_eq!(m.frame_index(), 45);
    }

    #[test]
    fn test_lost_tracking_does_not_advance_index() {
        let mut m = scanning();
        m.handle(processed(FrameResult::PoorTracking, false, 0));
        m.handle(processed(FrameResult::LostTracking, true, 0));
        assert_eq!(m.frame_index(), 1);
    }

    #[test]
    fn test_failure_below_threshold_cancels() {
        let mut m = scanning();
        let cmds = m.handle(processed(FrameResult::Failed, false, 49));
        assert_eq!(m.state(), ScanState::Idle);
        assert!(cmds.iter().any(|c| matches!(
            c,
            Command::Emit(SessionEvent::ScanEnded {
                reason: TerminationReason::Canceled,
                ..
            })
        )));
        assert!(cmds.iter().any(|c| matches!(
            c,
            Command::Emit(SessionEvent::Failed(SessionError::InsufficientFrames {
                succeeded: 49,
                required: 50
            }))
        )));
        assert!(!cmds.iter().any(|c| matches!(c, Command::Finalize { .. })));
    }

    #[test]
    fn test_failure_above_threshold_finishes() {
        let mut m = scanning();
        let cmds = m.handle(processed(FrameResult::Failed, false, 51));
        assert!(m.is_finalizing());
        assert_eq!(m.state(), ScanState::Scanning);
        assert!(cmds.iter().any(|c| matches!(
            c,
            Command::Emit(SessionEvent::ScanEnded {
                reason: TerminationReason::Finished,
                cause: Cause::EngineFailed,
            })
        )));
        assert!(cmds.iter().any(|c| matches!(c, Command::Finalize { .. })));
    }

    #[test]
    fn test_finish_order_and_result() {
        let mut m = scanning();
        let cmds = m.handle(Input::Trigger);
        let kinds: Vec<_> = cmds
            .iter()
            .filter(|c| !matches!(c, Command::Emit(_)))
            .map(|c| std::mem::discriminant(c))
            .collect();
        assert_eq!(
            kinds,
            vec![
                std::mem::discriminant(&Command::FinishFeedback),
                std::mem::discriminant(&Command::StopCapture),
                std::mem::discriminant(&Command::Finalize { epoch: 0 }),
            ]
        );

        // Frames and triggers are ignored while finalizing.
        assert!(m.handle(Input::Frame(sample(9))).is_empty());
        assert!(m.handle(Input::Trigger).is_empty());

        let epoch = m.epoch();
        let cmds = m.handle(Input::Finalized {
            epoch,
            result: Ok(output()),
        });
        assert_eq!(m.state(), ScanState::Idle);
        assert!(
            cmds.iter()
                .any(|c| matches!(c, Command::Emit(SessionEvent::Completed(_))))
        );
        assert!(matches!(cmds.last(), Some(Command::ResetDetector)));
    }

    #[test]
    fn test_safety_delay_finishes() {
        let mut m = scanning();
        let stale = m.epoch() - 1;
        assert!(
            m.handle(Input::SafetyDelayElapsed { epoch: stale })
                .is_empty()
        );
        m.handle(Input::SafetyDelayElapsed { epoch: m.epoch() });
        assert!(m.is_finalizing());
    }

    #[test]
    fn test_texturing_failure_resets() {
        let mut m = scanning();
        m.handle(Input::Trigger);
        let cmds = m.handle(Input::Finalized {
            epoch: m.epoch(),
            result: Err(SessionError::texturing("no mesh")),
        });
        assert_eq!(m.state(), ScanState::Idle);
        assert!(has_reset(&cmds, true));
    }

    #[test]
    fn test_thermal_reaches_idle_from_every_state() {
        let mut countdown = ready();
        countdown.handle(Input::Trigger);
        let mut finalizing = scanning();
        finalizing.handle(Input::Trigger);

        for mut m in [ready(), countdown, scanning(), finalizing] {
            m.handle(Input::ThermalCritical);
            assert_eq!(m.state(), ScanState::Idle);
            assert!(!m.is_finalizing());
        }
    }

    #[test]
    fn test_abort_discards_late_result() {
        let mut m = scanning();
        m.handle(Input::Trigger);
        let epoch = m.epoch();
        let cmds = m.handle(Input::Backgrounded);
        assert!(has_reset(&cmds, false));

        let cmds = m.handle(Input::Finalized {
            epoch,
            result: Ok(output()),
        });
        assert!(cmds.is_empty());
        assert_eq!(m.state(), ScanState::Idle);
    }

    #[test]
    fn test_api_error_aborts_scan() {
        let mut m = scanning();
        let cmds = m.handle(Input::Engine(EngineEvent::ApiError("bad state".into())));
        assert_eq!(m.state(), ScanState::Idle);
        assert!(cmds.iter().any(|c| matches!(
            c,
            Command::Emit(SessionEvent::Failed(SessionError::ReconstructionApi(_)))
        )));

        let mut idle = ready();
        let cmds = idle.handle(Input::Engine(EngineEvent::ApiError("x".into())));
        assert!(matches!(cmds[..], [Command::ResetEngine]));
    }

    #[test]
    fn test_reentry_resets_index() {
        let mut m = scanning();
        for i in 0..7 {
            m.handle(processed(FrameResult::Succeeded, true, i));
            m.handle(Input::Frame(sample(u64::from(i))));
        }
        assert_eq!(m.frame_index(), 7);
        m.handle(processed(FrameResult::Failed, false, 7));
        assert_eq!(m.state(), ScanState::Idle);

        m.handle(Input::Trigger);
        for _ in 0..4 {
            m.handle(Input::CountdownTick { epoch: m.epoch() });
        }
        assert_eq!(m.state(), ScanState::Scanning);
        assert_eq!(m.frame_index(), 0);
        assert_eq!(m.accumulated(), 0);
    }
}
