//! The capture session owner.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use sensor_types::FrameSample;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell, mpsc, watch};
use tracing::{debug, error, info, trace, warn};

use crate::brightness::estimate_brightness;
use crate::config::{CaptureConfig, DetectableRange, RangeReport};
use crate::device::{
    AuthorizationStatus, CaptureDevice, CaptureGraph, InterruptionReason, RawPair, RuntimeFault,
    ThermalState,
};
use crate::error::{CaptureError, Result};

/// Outcome of [`SensorSynchronizer::configure`], cached after the first call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupResult {
    /// The capture graph is built.
    Success,
    /// Camera access was denied.
    NotAuthorized,
    /// The device is unsupported or the graph could not be built.
    ConfigurationFailed,
}

/// Lifecycle signals surfaced to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorSignal {
    /// The hardware confirmed it is running.
    Started,
    /// The session stopped.
    Stopped,
    /// `configure` failed; carries the specific reason.
    SetupFailed(CaptureError),
    /// The system interrupted the session.
    Interrupted(InterruptionReason),
    /// The interruption ended.
    InterruptionEnded,
    /// A runtime error left the session stopped.
    RuntimeError(CaptureError),
    /// The device reached a critical thermal state.
    ThermalCritical,
}

/// What happened to a delivered pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Forwarded as a [`FrameSample`].
    Delivered,
    /// Forwarding is off (stopped or backgrounded).
    NotForwarding,
    /// The hardware marked a side as dropped.
    HardwareDropped,
    /// A side or the calibration was missing.
    Incomplete,
    /// The previous sample is still being processed.
    ConsumerBusy,
    /// Nobody is listening for samples any more.
    ConsumerClosed,
}

/// Delivery counters since construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryStats {
    /// Samples forwarded.
    pub delivered: u64,
    /// Pairs the hardware marked as dropped.
    pub hardware_dropped: u64,
    /// Pairs dropped because the consumer was busy.
    pub busy_dropped: u64,
}

#[derive(Debug, Default)]
struct DeliveryCounters {
    delivered: AtomicU64,
    hardware_dropped: AtomicU64,
    busy_dropped: AtomicU64,
}

/// Receiving ends of the synchronizer's outputs.
#[derive(Debug)]
pub struct SensorOutputs {
    /// Synchronized samples, at most one in flight.
    pub frames: mpsc::Receiver<FrameSample>,
    /// Latest brightness value.
    pub brightness: watch::Receiver<Option<f64>>,
    /// Latest depth-at-center report.
    pub range: watch::Receiver<Option<RangeReport>>,
    /// Lifecycle signals.
    pub signals: mpsc::UnboundedReceiver<SensorSignal>,
}

/// Owns the capture session and turns hardware pairs into [`FrameSample`]s.
///
/// Session operations (`configure`, `start`, `stop`, recovery) run one at a
/// time in call order on an internal session queue. [`deliver`] is called
/// synchronously from the capture thread and never blocks.
///
/// [`deliver`]: SensorSynchronizer::deliver
pub struct SensorSynchronizer {
    config: CaptureConfig,
    range: DetectableRange,
    session: Mutex<Box<dyn CaptureDevice>>,
    setup: OnceCell<SetupResult>,
    running: AtomicBool,
    forwarding: AtomicBool,
    backgrounded: AtomicBool,
    counters: DeliveryCounters,
    frames: mpsc::Sender<FrameSample>,
    brightness: watch::Sender<Option<f64>>,
    range_reports: watch::Sender<Option<RangeReport>>,
    signals: mpsc::UnboundedSender<SensorSignal>,
}

impl std::fmt::Debug for SensorSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSynchronizer")
            .field("range", &self.range)
            .field("setup", &self.setup.get())
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("forwarding", &self.forwarding.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SensorSynchronizer {
    /// Creates a synchronizer around a capture device.
    #[must_use]
    pub fn new(config: CaptureConfig, device: Box<dyn CaptureDevice>) -> (Self, SensorOutputs) {
        let (frames_tx, frames_rx) = mpsc::channel(1);
        let (brightness_tx, brightness_rx) = watch::channel(None);
        let (range_tx, range_rx) = watch::channel(None);
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let sync = Self {
            range: config.detectable_range(),
            config,
            session: Mutex::new(device),
            setup: OnceCell::new(),
            running: AtomicBool::new(false),
            forwarding: AtomicBool::new(false),
            backgrounded: AtomicBool::new(false),
            counters: DeliveryCounters::default(),
            frames: frames_tx,
            brightness: brightness_tx,
            range_reports: range_tx,
            signals: signals_tx,
        };
        let outputs = SensorOutputs {
            frames: frames_rx,
            brightness: brightness_rx,
            range: range_rx,
            signals: signals_rx,
        };
        (sync, outputs)
    }

    /// The calibrated detection range.
    #[must_use]
    pub const fn detectable_range(&self) -> DetectableRange {
        self.range
    }

    /// The cached setup result, if `configure` has completed.
    #[must_use]
    pub fn setup_result(&self) -> Option<SetupResult> {
        self.setup.get().copied()
    }

    /// Whether the hardware is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Delivery counters.
    #[must_use]
    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            hardware_dropped: self.counters.hardware_dropped.load(Ordering::Relaxed),
            busy_dropped: self.counters.busy_dropped.load(Ordering::Relaxed),
        }
    }

    /// Validates the device, requests permission and builds the capture graph.
    ///
    /// Runs once; later calls return the cached result without touching the
    /// device.
    pub async fn configure(&self, max_resolution: u32, max_framerate: u32) -> SetupResult {
        *self
            .setup
            .get_or_init(|| self.run_setup(max_resolution, max_framerate))
            .await
    }

    async fn run_setup(&self, max_resolution: u32, max_framerate: u32) -> SetupResult {
        let graph = CaptureGraph {
            max_resolution,
            max_framerate,
            color_width: self.config.color_width,
            color_height: self.config.color_height,
            min_exposure_secs: self.config.min_exposure_secs,
        };
        let mut device = self.session.lock().await;
        let outcome = match self.config.validate() {
            Ok(()) => Self::setup_device(&mut **device, &graph).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(()) => {
                info!(max_resolution, max_framerate, "capture session configured");
                SetupResult::Success
            }
            Err(err) => {
                warn!(error = %err, "capture session setup failed");
                let result = if err == CaptureError::PermissionDenied {
                    SetupResult::NotAuthorized
                } else {
                    SetupResult::ConfigurationFailed
                };
                self.signal(SensorSignal::SetupFailed(err));
                result
            }
        }
    }

    async fn setup_device(device: &mut dyn CaptureDevice, graph: &CaptureGraph) -> Result<()> {
        if !device.depth_camera_available().await {
            return Err(CaptureError::DeviceUnsupported);
        }
        match device.authorization_status().await {
            AuthorizationStatus::Authorized => {}
            AuthorizationStatus::NotDetermined => {
                debug!("requesting camera access");
                if !device.request_access().await {
                    return Err(CaptureError::PermissionDenied);
                }
            }
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                return Err(CaptureError::PermissionDenied);
            }
        }
        device.build_graph(graph).await
    }

    /// Starts the hardware and enables forwarding.
    ///
    /// Posts [`SensorSignal::Started`] once the hardware confirms running.
    ///
    /// # Errors
    ///
    /// Returns the cached setup failure, [`CaptureError::NotConfigured`]
    /// before `configure`, or the device's start error.
    pub async fn start(&self) -> Result<()> {
        match self.setup.get() {
            None => return Err(CaptureError::NotConfigured),
            Some(SetupResult::NotAuthorized) => return Err(CaptureError::PermissionDenied),
            Some(SetupResult::ConfigurationFailed) => {
                return Err(CaptureError::configuration_failed(
                    "capture session setup did not succeed",
                ));
            }
            Some(SetupResult::Success) => {}
        }

        let mut device = self.session.lock().await;
        if self.running.load(Ordering::Acquire) && device.is_running() {
            debug!("capture session already running");
            self.forwarding.store(true, Ordering::Release);
            return Ok(());
        }

        self.forwarding.store(true, Ordering::Release);
        if let Err(err) = device.start_running().await {
            self.forwarding.store(false, Ordering::Release);
            warn!(error = %err, "capture session failed to start");
            return Err(err);
        }
        if !device.is_running() {
            self.forwarding.store(false, Ordering::Release);
            return Err(CaptureError::runtime(
                "hardware did not confirm running",
                false,
            ));
        }

        self.running.store(true, Ordering::Release);
        info!("capture session started");
        self.signal(SensorSignal::Started);
        Ok(())
    }

    /// Disables forwarding and stops the hardware. A no-op when stopped.
    pub async fn stop(&self) {
        let mut device = self.session.lock().await;
        self.forwarding.store(false, Ordering::Release);
        let was_running = self.running.swap(false, Ordering::AcqRel);
        if !was_running && !device.is_running() {
            return;
        }
        device.stop_running().await;
        info!("capture session stopped");
        self.signal(SensorSignal::Stopped);
    }

    /// Enables or disables the depth output while the session keeps running.
    pub async fn set_paused(&self, paused: bool) {
        let mut device = self.session.lock().await;
        device.set_depth_enabled(!paused).await;
        debug!(paused, "depth output toggled");
    }

    /// Handles a runtime error reported by the running session.
    ///
    /// A media-services reset while running gets one silent restart; any
    /// other error, or a failed restart, is surfaced and leaves the session
    /// stopped.
    pub async fn handle_runtime_error(&self, fault: RuntimeFault) {
        let mut device = self.session.lock().await;
        let was_running = self.running.load(Ordering::Acquire);
        let recoverable = fault == RuntimeFault::MediaServicesReset;

        if recoverable && was_running {
            info!("media services reset, restarting capture session");
            match device.start_running().await {
                Ok(()) if device.is_running() => {
                    self.forwarding.store(true, Ordering::Release);
                    return;
                }
                Ok(()) => warn!("restart did not bring the session back"),
                Err(err) => warn!(error = %err, "restart after media services reset failed"),
            }
        }

        self.running.store(false, Ordering::Release);
        self.forwarding.store(false, Ordering::Release);
        error!(fault = %fault, "capture session runtime error");
        self.signal(SensorSignal::RuntimeError(CaptureError::runtime(
            fault.to_string(),
            recoverable,
        )));
        if was_running {
            self.signal(SensorSignal::Stopped);
        }
    }

    /// Surfaces a system interruption.
    pub fn handle_interruption(&self, reason: InterruptionReason) {
        warn!(reason = %reason, "capture session interrupted");
        self.signal(SensorSignal::Interrupted(reason));
    }

    /// Surfaces the end of an interruption.
    pub fn handle_interruption_ended(&self) {
        info!("capture session interruption ended");
        self.signal(SensorSignal::InterruptionEnded);
    }

    /// Stops forwarding while the app is in the background. The session keeps
    /// running so resuming is instant.
    pub fn enter_background(&self) {
        self.backgrounded.store(true, Ordering::Release);
        debug!("forwarding suspended for background");
    }

    /// Resumes forwarding after [`enter_background`](Self::enter_background).
    pub fn enter_foreground(&self) {
        self.backgrounded.store(false, Ordering::Release);
        debug!("forwarding resumed");
    }

    /// Propagates a thermal change. Only the critical state is surfaced.
    pub fn report_thermal_state(&self, state: ThermalState) {
        if state == ThermalState::Critical {
            warn!("thermal state critical");
            self.signal(SensorSignal::ThermalCritical);
        } else {
            debug!(?state, "thermal state changed");
        }
    }

    /// Accepts one synchronized pair from the capture thread.
    ///
    /// Publishes brightness before the sample, updates the range report, then
    /// hands the sample over without waiting: if the previous sample has not
    /// been taken yet, this one is dropped.
    pub fn deliver(&self, pair: RawPair) -> DeliveryOutcome {
        if !self.forwarding.load(Ordering::Acquire) || self.backgrounded.load(Ordering::Acquire) {
            return DeliveryOutcome::NotForwarding;
        }
        if pair.is_dropped() {
            self.counters.hardware_dropped.fetch_add(1, Ordering::Relaxed);
            trace!(
                color = pair.color_dropped,
                depth = pair.depth_dropped,
                "pair dropped by hardware"
            );
            return DeliveryOutcome::HardwareDropped;
        }
        let (Some(color), Some(depth), Some(calibration)) =
            (pair.color, pair.depth, pair.calibration)
        else {
            trace!("incomplete pair");
            return DeliveryOutcome::Incomplete;
        };

        let brightness = estimate_brightness(&color);
        self.brightness.send_replace(Some(brightness));
        if let Some(report) = self.range.report(depth.depth_at_center()) {
            self.range_reports.send_replace(Some(report));
        }

        let sample = FrameSample::new(color, depth, calibration, brightness);
        match self.frames.try_send(sample) {
            Ok(()) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                DeliveryOutcome::Delivered
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.busy_dropped.fetch_add(1, Ordering::Relaxed);
                trace!("consumer busy, pair dropped");
                DeliveryOutcome::ConsumerBusy
            }
            Err(mpsc::error::TrySendError::Closed(_)) => DeliveryOutcome::ConsumerClosed,
        }
    }

    fn signal(&self, signal: SensorSignal) {
        if self.signals.send(signal).is_err() {
            trace!("no signal listener");
        }
    }
}
