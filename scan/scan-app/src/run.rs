//! Service wiring for the `run` and `measure` commands.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use ar_measure::{Digit, MeasureError, MeasurementProbe, PlaneTracker, Viewport};
use scan_feedback::{FeedbackSequencer, HapticEngine};
use scan_session::{
    CaptureControl, Collaborators, MeshTexturer, ReconstructionEngine, ScanOutput, ScanSession,
    ScanState, SessionEvent, SessionSources, TerminationReason, engine_channel,
};
use sensor_sync::{SensorOutputs, SensorSynchronizer, SetupResult};
use subject_detect::SubjectDetector;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::sim::{
    FrameSource, LogHaptics, LogSpeech, SimClassifier, SimDevice, SimEngine, SimTexturer,
    SimTracker, open_hand,
};

/// Options for one simulated scan.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Start with a manual trigger instead of waiting for detection.
    pub manual: bool,
    /// Give up after this long.
    pub timeout: Duration,
    /// Simulated subject distance; `None` centers it in the detection range.
    pub subject_distance: Option<f32>,
}

/// Runs one scan against simulated hardware and logs the result.
pub async fn scan(config: AppConfig, options: RunOptions) -> Result<()> {
    let range = config.capture.detectable_range();
    info!(near = range.near, far = range.far, "detection range");

    let (sync, outputs) =
        SensorSynchronizer::new(config.capture.clone(), Box::new(SimDevice::default()));
    let sync = Arc::new(sync);
    let setup = sync
        .configure(config.capture.max_resolution, config.capture.max_framerate)
        .await;
    if setup != SetupResult::Success {
        bail!("capture setup failed: {setup:?}");
    }

    let feedback = FeedbackSequencer::spawn(
        config.feedback.clone(),
        Arc::new(LogHaptics) as Arc<dyn HapticEngine>,
        Arc::new(LogSpeech),
    );
    let (detector, detector_events) = SubjectDetector::new(
        config.detector.clone(),
        Arc::new(SimClassifier::new(
            config.detector.positive_label.clone(),
            config.detector.negative_label.clone(),
        )),
    )
    .context("creating subject detector")?;
    let (sink, engine_events) = engine_channel();

    let SensorOutputs {
        frames,
        brightness,
        range: range_reports,
        signals,
    } = outputs;

    let session = ScanSession::spawn(
        config.session.clone(),
        Collaborators {
            engine: Arc::new(SimEngine::new(sink)) as Arc<dyn ReconstructionEngine>,
            texturer: Arc::new(SimTexturer::default()) as Arc<dyn MeshTexturer>,
            capture: Arc::clone(&sync) as Arc<dyn CaptureControl>,
            feedback,
            detector: detector.clone(),
        },
        SessionSources {
            frames,
            engine_events,
            detector_events,
        },
    )
    .context("starting scan session")?;
    let mut events = session.subscribe();

    let mut tasks = pump_sensor_outputs(&session, &detector, brightness, range_reports, signals);

    sync.start().await.context("starting capture")?;
    session.set_capture_running(true)?;

    #[allow(clippy::cast_possible_truncation)]
    let subject_distance = options
        .subject_distance
        .unwrap_or(((range.near + range.far) / 2.0) as f32);
    tasks.push(
        FrameSource {
            framerate: config.capture.max_framerate,
            subject_distance,
            grey: 150,
        }
        .spawn(Arc::clone(&sync)),
    );

    if options.manual {
        session.trigger()?;
    }

    let result = tokio::time::timeout(options.timeout, wait_for_output(&mut events)).await;

    for task in &tasks {
        task.abort();
    }
    sync.stop().await;
    let stats = sync.stats();
    info!(
        delivered = stats.delivered,
        hardware_dropped = stats.hardware_dropped,
        busy_dropped = stats.busy_dropped,
        "capture stopped"
    );

    let output = result
        .with_context(|| format!("no scan result within {:?}", options.timeout))??;
    info!(
        points = output.point_cloud.len(),
        vertices = output.mesh.vertices.len(),
        faces = output.mesh.faces.len(),
        "scan complete"
    );
    Ok(())
}

fn pump_sensor_outputs(
    session: &ScanSession,
    detector: &SubjectDetector,
    mut brightness: tokio::sync::watch::Receiver<Option<f64>>,
    mut range: tokio::sync::watch::Receiver<Option<sensor_sync::RangeReport>>,
    mut signals: tokio::sync::mpsc::UnboundedReceiver<sensor_sync::SensorSignal>,
) -> Vec<JoinHandle<()>> {
    let brightness_detector = detector.clone();
    let range_detector = detector.clone();
    let session = session.clone();
    vec![
        tokio::spawn(async move {
            while brightness.changed().await.is_ok() {
                let value = *brightness.borrow_and_update();
                if let Some(value) = value {
                    brightness_detector.update_brightness(value);
                }
            }
        }),
        tokio::spawn(async move {
            while range.changed().await.is_ok() {
                let report = *range.borrow_and_update();
                if let Some(report) = report {
                    range_detector.update_range(report.in_range);
                }
            }
        }),
        tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                debug!(?signal, "sensor signal");
                if session.on_sensor_signal(&signal).is_err() {
                    break;
                }
            }
        }),
    ]
}

async fn wait_for_output(
    events: &mut tokio::sync::broadcast::Receiver<SessionEvent>,
) -> Result<ScanOutput> {
    loop {
        match events.recv().await {
            Ok(SessionEvent::StateChanged(transition)) => {
                info!(
                    from = %transition.from,
                    to = %transition.to,
                    cause = ?transition.cause,
                    "state changed"
                );
                if transition.to == ScanState::Scanning {
                    info!("hold still");
                }
            }
            Ok(SessionEvent::ScanEnded {
                reason: TerminationReason::Canceled,
                cause,
            }) => bail!("scan canceled ({cause:?})"),
            Ok(SessionEvent::ScanEnded { cause, .. }) => {
                info!(?cause, "scan finished, building model");
            }
            Ok(SessionEvent::Completed(output)) => return Ok(output),
            Ok(SessionEvent::Failed(err)) => return Err(err).context("scan failed"),
            Ok(SessionEvent::LowLightChanged(low)) => {
                if low {
                    warn!("low light, move somewhere brighter");
                } else {
                    info!("lighting ok");
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "session events lagged"),
            Err(RecvError::Closed) => bail!("scan session stopped"),
        }
    }
}

/// Measures a simulated hand, then places a ruler across a camera move.
pub fn measure(config: &AppConfig, ruler_cm: f64) -> Result<()> {
    let viewport = Viewport::new(config.capture.display_width_pt, config.capture.display_height_pt);
    let tracker = Arc::new(SimTracker::facing_plane(viewport, 0.4));
    let mut probe = MeasurementProbe::new(config.measure, Arc::clone(&tracker) as Arc<dyn PlaneTracker>)
        .context("creating measurement probe")?;

    let hand = open_hand(&config.measure.landmark_mapping, viewport);
    let measured = probe.measure_hand(&hand).context("measuring hand")?;
    for digit in Digit::ALL {
        match measured.digit(digit) {
            Some(m) => info!(?digit, length_cm = m.length_cm, "digit"),
            None => warn!(?digit, "digit voided"),
        }
    }
    if let Some(palm) = measured.palm {
        info!(length_cm = palm.length_cm, "palm");
    }

    info!(status = %probe.ruler().status(), "ruler");
    let status = probe.tap().context("placing ruler start")?;
    info!(%status, "ruler");
    tracker.move_camera(ruler_cm / 100.0);
    if let Some(pending) = probe.update() {
        debug!(distance_cm = pending.distance_cm, "pending segment");
    }
    match probe.tap() {
        Ok(status) => info!(%status, "ruler"),
        Err(MeasureError::NoHit) => warn!("ruler end missed the surface"),
        Err(err) => return Err(err).context("placing ruler end"),
    }
    Ok(())
}
