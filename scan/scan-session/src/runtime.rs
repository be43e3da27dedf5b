//! The session actor.
//!
//! [`ScanSession::spawn`] runs a [`SessionCore`] on its own task. Frames,
//! engine callbacks, detector events and external inputs are merged into a
//! single stream so `accumulate()` calls stay serial and in arrival order.

use std::sync::Arc;
use std::time::Duration;

use scan_feedback::{FeedbackSequencer, Prompt, SequenceOutcome};
use sensor_sync::SensorSignal;
use sensor_types::FrameSample;
use subject_detect::{DetectorEvent, SubjectDetector};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::SessionConfig;
use crate::engine::{
    CaptureControl, EngineEvents, MeshTexturer, ReconstructionEngine, ScanOutput, TexturingStatus,
};
use crate::error::{Result, SessionError};
use crate::machine::{Command, Input, ScanStateMachine};
use crate::state::{ScanState, SessionEvent};

const EVENT_CAPACITY: usize = 64;

/// Services the session drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Reconstruction engine.
    pub engine: Arc<dyn ReconstructionEngine>,
    /// Mesh texturing engine.
    pub texturer: Arc<dyn MeshTexturer>,
    /// Capture session control.
    pub capture: Arc<dyn CaptureControl>,
    /// Haptic and spoken feedback.
    pub feedback: FeedbackSequencer,
    /// Subject detector.
    pub detector: SubjectDetector,
}

/// Streams the session consumes.
#[derive(Debug)]
pub struct SessionSources {
    /// Synchronized samples from capture.
    pub frames: mpsc::Receiver<FrameSample>,
    /// Reconstruction engine callbacks.
    pub engine_events: EngineEvents,
    /// Subject detector events.
    pub detector_events: mpsc::UnboundedReceiver<DetectorEvent>,
}

/// Owns the state machine and executes its commands against the
/// collaborators.
pub struct SessionCore {
    machine: ScanStateMachine,
    parts: Collaborators,
    inputs: mpsc::WeakUnboundedSender<Input>,
    state: watch::Sender<ScanState>,
    events: broadcast::Sender<SessionEvent>,
    pending: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for SessionCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCore")
            .field("machine", &self.machine)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl SessionCore {
    fn new(
        config: SessionConfig,
        parts: Collaborators,
        inputs: mpsc::WeakUnboundedSender<Input>,
        state: watch::Sender<ScanState>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            machine: ScanStateMachine::new(config),
            parts,
            inputs,
            state,
            events,
            pending: Vec::new(),
        }
    }

    /// Feeds one input through the machine and executes the resulting
    /// commands in order.
    pub async fn handle(&mut self, input: Input) {
        let epoch = self.machine.epoch();
        let commands = self.machine.handle(input);
        if self.machine.epoch() != epoch {
            self.cancel_pending();
        }
        let state = self.machine.state();
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
        for command in commands {
            self.execute(command).await;
        }
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::SubmitDetection(frame) => {
                let outcome = self.parts.detector.submit(frame);
                trace!(?outcome, "detection");
            }
            Command::Accumulate(sample) => self.parts.engine.accumulate(&sample).await,
            Command::AnnounceCountdown { epoch } => {
                let intro = self.parts.feedback.speak(Prompt::CountdownBegins);
                let inputs = self.inputs.clone();
                self.track(tokio::spawn(async move {
                    if intro.finished().await == SequenceOutcome::Completed {
                        send_weak(&inputs, Input::CountdownTick { epoch });
                    }
                }));
            }
            Command::CountdownFeedback { remaining } => {
                self.parts.feedback.countdown_tick(remaining);
            }
            Command::ScheduleTick { epoch, after } => {
                self.schedule(after, Input::CountdownTick { epoch });
            }
            Command::BeginScanning => {
                self.parts.texturer.reset();
                self.parts.feedback.start_scanning_pulses();
            }
            Command::ScheduleSafetyDelay { epoch, after } => {
                self.schedule(after, Input::SafetyDelayElapsed { epoch });
            }
            Command::SaveColorBuffer(metadata) => {
                if let Some(color) = &metadata.color {
                    self.parts.texturer.save_color_buffer(
                        color,
                        &metadata.view_matrix,
                        &metadata.projection_matrix,
                    );
                }
            }
            Command::FinishFeedback => {
                drop(self.parts.feedback.scanning_finished());
                drop(self.parts.feedback.speak(Prompt::ScanningFinished));
            }
            Command::StopCapture => self.parts.capture.stop_capture().await,
            Command::Finalize { epoch } => {
                let engine = Arc::clone(&self.parts.engine);
                let texturer = Arc::clone(&self.parts.texturer);
                let inputs = self.inputs.clone();
                self.track(tokio::spawn(async move {
                    let result = finalize_scan(engine.as_ref(), texturer.as_ref()).await;
                    send_weak(&inputs, Input::Finalized { epoch, result });
                }));
            }
            Command::ResetSession {
                haptic,
                restart_capture,
            } => {
                debug!(haptic, restart_capture, "resetting session");
                self.parts.detector.reset();
                self.parts.feedback.cancel_sequences();
                if haptic {
                    self.parts.feedback.scanning_canceled();
                } else {
                    self.parts.feedback.stop_scanning_pulses();
                }
                self.parts.engine.reset();
                self.parts.texturer.reset();
                if restart_capture {
                    self.parts.capture.restart_capture().await;
                }
            }
            Command::ResetEngine => self.parts.engine.reset(),
            Command::ResetDetector => self.parts.detector.reset(),
            Command::Emit(event) => self.emit(event),
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            trace!("no session event listener");
        }
    }

    fn schedule(&mut self, after: Duration, input: Input) {
        let inputs = self.inputs.clone();
        self.track(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            send_weak(&inputs, input);
        }));
    }

    fn track(&mut self, task: JoinHandle<()>) {
        self.pending.retain(|task| !task.is_finished());
        self.pending.push(task);
    }

    fn cancel_pending(&mut self) {
        for task in self.pending.drain(..) {
            task.abort();
        }
    }
}

fn send_weak(inputs: &mpsc::WeakUnboundedSender<Input>, input: Input) {
    match inputs.upgrade() {
        Some(tx) if tx.send(input).is_err() => trace!("session input closed"),
        Some(_) => {}
        None => trace!("session gone, input dropped"),
    }
}

async fn finalize_scan(
    engine: &dyn ReconstructionEngine,
    texturer: &dyn MeshTexturer,
) -> Result<ScanOutput> {
    engine.finalize().await;
    let point_cloud = Arc::new(engine.build_point_cloud());
    engine.reset();
    debug!(points = point_cloud.len(), "point cloud built");

    let mut statuses = texturer.process_mesh(Arc::clone(&point_cloud));
    while let Some(status) = statuses.recv().await {
        match status {
            TexturingStatus::InProgress(progress) => trace!(progress, "texturing"),
            TexturingStatus::Success(mesh) => {
                return Ok(ScanOutput {
                    point_cloud,
                    mesh: Arc::new(mesh),
                });
            }
            TexturingStatus::Failure(message) => return Err(SessionError::texturing(message)),
        }
    }
    Err(SessionError::texturing("texturer ended without a result"))
}

/// Handle to a running scan session. Cheap to clone; the session stops once
/// every handle is dropped.
#[derive(Debug, Clone)]
pub struct ScanSession {
    inputs: mpsc::UnboundedSender<Input>,
    state: watch::Receiver<ScanState>,
    events: broadcast::Sender<SessionEvent>,
}

impl ScanSession {
    /// Spawns the session task.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] if the configuration is
    /// invalid.
    pub fn spawn(
        config: SessionConfig,
        parts: Collaborators,
        sources: SessionSources,
    ) -> Result<Self> {
        config.validate()?;
        let (inputs, inputs_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ScanState::Idle);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let core = SessionCore::new(
            config,
            parts,
            inputs.downgrade(),
            state_tx,
            events.clone(),
        );
        tokio::spawn(run(core, inputs_rx, sources));
        Ok(Self {
            inputs,
            state,
            events,
        })
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ScanState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ScanState> {
        self.state.clone()
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Presses the shutter.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ChannelClosed`] if the session task is gone.
    pub fn trigger(&self) -> Result<()> {
        self.send(Input::Trigger)
    }

    /// Reports a modal being presented or dismissed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ChannelClosed`] if the session task is gone.
    pub fn set_modal_presented(&self, presented: bool) -> Result<()> {
        self.send(Input::ModalPresented(presented))
    }

    /// Reports whether capture is running.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ChannelClosed`] if the session task is gone.
    pub fn set_capture_running(&self, running: bool) -> Result<()> {
        self.send(Input::CaptureRunning(running))
    }

    /// Aborts to idle on a critical thermal state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ChannelClosed`] if the session task is gone.
    pub fn thermal_critical(&self) -> Result<()> {
        self.send(Input::ThermalCritical)
    }

    /// Aborts to idle when the app leaves the foreground.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ChannelClosed`] if the session task is gone.
    pub fn enter_background(&self) -> Result<()> {
        self.send(Input::Backgrounded)
    }

    /// Aborts to idle under memory pressure.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ChannelClosed`] if the session task is gone.
    pub fn memory_warning(&self) -> Result<()> {
        self.send(Input::MemoryWarning)
    }

    /// Maps a capture lifecycle signal onto session inputs.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ChannelClosed`] if the session task is gone.
    pub fn on_sensor_signal(&self, signal: &SensorSignal) -> Result<()> {
        match signal {
            SensorSignal::Started => self.set_capture_running(true),
            SensorSignal::Stopped => self.set_capture_running(false),
            SensorSignal::ThermalCritical => self.thermal_critical(),
            SensorSignal::SetupFailed(_)
            | SensorSignal::Interrupted(_)
            | SensorSignal::InterruptionEnded
            | SensorSignal::RuntimeError(_) => Ok(()),
        }
    }

    fn send(&self, input: Input) -> Result<()> {
        self.inputs
            .send(input)
            .map_err(|_| SessionError::ChannelClosed)
    }
}

async fn run(
    mut core: SessionCore,
    mut inputs: mpsc::UnboundedReceiver<Input>,
    mut sources: SessionSources,
) {
    loop {
        let input = tokio::select! {
            biased;
            input = inputs.recv() => match input {
                Some(input) => input,
                None => break,
            },
            Some(event) = sources.engine_events.recv() => Input::Engine(event),
            Some(event) = sources.detector_events.recv() => match event {
                DetectorEvent::Confirmed => Input::SubjectConfirmed,
                DetectorEvent::SubjectLost => Input::SubjectLost,
                DetectorEvent::LowLightChanged(low) => {
                    core.emit(SessionEvent::LowLightChanged(low));
                    continue;
                }
            },
            Some(sample) = sources.frames.recv() => Input::Frame(sample),
        };
        core.handle(input).await;
    }
    core.cancel_pending();
    debug!("scan session stopped");
}
