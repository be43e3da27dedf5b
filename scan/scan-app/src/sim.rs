//! Simulated hardware and engines for running a session off-device.

use std::sync::Arc;
use std::time::Duration;

use ar_measure::{
    DigitJoints, HandPose, Landmark, LandmarkMapping, PlaneTracker, Point3, TrackedPlane,
    TrackingFrame, Vector3, Viewport,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use scan_feedback::{HapticEngine, HapticPulse, SpeechEngine};
use scan_session::{
    EngineEventSink, FrameMetadata, FrameResult, Matrix4, MeshTexturer, PointCloud,
    ReconstructionEngine, ReconstructionStats, TexturedMesh, TexturingStatus,
};
use sensor_sync::{AuthorizationStatus, CaptureDevice, CaptureGraph, RawPair, SensorSynchronizer};
use sensor_types::{
    CameraCalibration, CameraIntrinsics, ColorFrame, DepthMap, FrameSample, Pose3d, Timestamp,
};
use subject_detect::{ClassLabel, Classifier, Observation};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

const IDENTITY: Matrix4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Capture device that is always authorized and starts on request.
#[derive(Debug, Default)]
pub struct SimDevice {
    running: bool,
}

#[async_trait]
impl CaptureDevice for SimDevice {
    async fn depth_camera_available(&self) -> bool {
        true
    }

    async fn authorization_status(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }

    async fn request_access(&self) -> bool {
        true
    }

    async fn build_graph(&mut self, graph: &CaptureGraph) -> sensor_sync::Result<()> {
        debug!(?graph, "capture graph built");
        Ok(())
    }

    async fn start_running(&mut self) -> sensor_sync::Result<()> {
        self.running = true;
        Ok(())
    }

    async fn stop_running(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    async fn set_depth_enabled(&mut self, enabled: bool) {
        debug!(enabled, "depth output toggled");
    }
}

/// Frame geometry of the simulated pairs.
#[derive(Debug, Clone, Copy)]
pub struct FrameSource {
    /// Pair rate.
    pub framerate: u32,
    /// Depth reported at every pixel, in meters.
    pub subject_distance: f32,
    /// Grey level of the color frames.
    pub grey: u8,
}

impl FrameSource {
    /// Feeds pairs into the synchronizer until the task is aborted.
    pub fn spawn(self, sync: Arc<SensorSynchronizer>) -> JoinHandle<()> {
        let period = Duration::from_secs(1) / self.framerate.max(1);
        let calibration = CameraCalibration::new(CameraIntrinsics::ideal(60.0, 64, 48));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut elapsed = Duration::ZERO;
            loop {
                ticker.tick().await;
                let ts = Timestamp::from_nanos(
                    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
                );
                let color = ColorFrame::filled(ts, 64, 48, [self.grey, self.grey, self.grey, 255]);
                let depth = DepthMap::filled(ts, 32, 24, self.subject_distance);
                let outcome = sync.deliver(RawPair::complete(color, depth, calibration));
                trace!(?outcome, "pair delivered");
                elapsed += period;
            }
        })
    }
}

/// Classifier that always sees a confident subject.
#[derive(Debug)]
pub struct SimClassifier {
    positive: String,
    negative: String,
}

impl SimClassifier {
    /// Creates a classifier answering with the given labels.
    pub fn new(positive: impl Into<String>, negative: impl Into<String>) -> Self {
        Self {
            positive: positive.into(),
            negative: negative.into(),
        }
    }
}

#[async_trait]
impl Classifier for SimClassifier {
    async fn classify(&self, _frame: &ColorFrame) -> subject_detect::Result<Vec<Observation>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(vec![Observation::new(
            0.9,
            vec![
                ClassLabel::new(self.positive.clone(), 0.95),
                ClassLabel::new(self.negative.clone(), 0.000_05),
            ],
        )])
    }
}

/// Haptics that log each pulse.
#[derive(Debug, Default)]
pub struct LogHaptics;

impl HapticEngine for LogHaptics {
    fn play(&self, pulse: HapticPulse) {
        debug!(?pulse, "haptic");
    }
}

/// Speech that logs each utterance and takes a while per word.
#[derive(Debug, Default)]
pub struct LogSpeech;

#[async_trait]
impl SpeechEngine for LogSpeech {
    async fn speak(&self, text: &str) -> scan_feedback::Result<()> {
        info!(text, "speech");
        let words = u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX);
        tokio::time::sleep(Duration::from_millis(80) * words).await;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Volume {
    positions: Vec<[f32; 3]>,
    succeeded: u32,
}

/// Engine that fuses a sparse grid of every depth map into a point cloud.
#[derive(Debug)]
pub struct SimEngine {
    sink: EngineEventSink,
    volume: Mutex<Volume>,
}

impl SimEngine {
    /// Creates an engine reporting through `sink`.
    pub fn new(sink: EngineEventSink) -> Self {
        Self {
            sink,
            volume: Mutex::new(Volume::default()),
        }
    }
}

#[async_trait]
impl ReconstructionEngine for SimEngine {
    #[allow(clippy::cast_possible_truncation)]
    async fn accumulate(&self, sample: &FrameSample) {
        let depth = &sample.depth;
        let intrinsics = sample.calibration.intrinsics_for(depth.width, depth.height);
        let points: Vec<[f32; 3]> = (0..depth.height)
            .step_by(4)
            .flat_map(|y| (0..depth.width).step_by(4).map(move |x| (x, y)))
            .filter_map(|(x, y)| depth.unproject_pixel(&intrinsics, x, y))
            .map(|[x, y, z]| [x as f32, y as f32, z as f32])
            .collect();

        let succeeded = {
            let mut volume = self.volume.lock();
            volume.positions.extend(points);
            volume.succeeded += 1;
            volume.succeeded
        };
        self.sink.frame_processed(
            FrameMetadata {
                result: FrameResult::Succeeded,
                view_matrix: IDENTITY,
                projection_matrix: IDENTITY,
                color: Some(sample.color.clone()),
            },
            ReconstructionStats {
                succeeded_count: succeeded,
            },
        );
    }

    async fn finalize(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    fn build_point_cloud(&self) -> PointCloud {
        let volume = self.volume.lock();
        PointCloud {
            positions: volume.positions.clone(),
            colors: vec![[0.6; 3]; volume.positions.len()],
        }
    }

    fn reset(&self) {
        *self.volume.lock() = Volume::default();
    }
}

/// Texturer that counts snapshots and emits a triangle fan.
#[derive(Debug, Default)]
pub struct SimTexturer {
    snapshots: Mutex<usize>,
}

impl MeshTexturer for SimTexturer {
    fn save_color_buffer(&self, color: &ColorFrame, _view: &Matrix4, _projection: &Matrix4) {
        *self.snapshots.lock() += 1;
        trace!(timestamp = ?color.timestamp, "color snapshot saved");
    }

    fn process_mesh(&self, cloud: Arc<PointCloud>) -> mpsc::UnboundedReceiver<TexturingStatus> {
        let (tx, rx) = mpsc::unbounded_channel();
        let snapshots = *self.snapshots.lock();
        tokio::spawn(async move {
            for step in 1..=4u8 {
                tokio::time::sleep(Duration::from_millis(25)).await;
                if tx.send(TexturingStatus::InProgress(f32::from(step) / 4.0)).is_err() {
                    return;
                }
            }
            let status = if snapshots == 0 || cloud.len() < 3 {
                TexturingStatus::Failure("not enough data to texture".to_string())
            } else {
                TexturingStatus::Success(triangle_fan(&cloud))
            };
            if tx.send(status).is_err() {
                trace!("texturing result dropped");
            }
        });
        rx
    }

    fn reset(&self) {
        *self.snapshots.lock() = 0;
    }
}

#[allow(clippy::cast_possible_truncation)]
fn triangle_fan(cloud: &PointCloud) -> TexturedMesh {
    let n = cloud.positions.len().min(u32::MAX as usize) as u32;
    TexturedMesh {
        vertices: cloud.positions.clone(),
        faces: (1..n.saturating_sub(1)).map(|i| [0, i, i + 1]).collect(),
        texture_coords: vec![[0.5, 0.5]; cloud.positions.len()],
    }
}

/// Plane tracker with one plane and a movable camera.
#[derive(Debug)]
pub struct SimTracker {
    frame: Mutex<TrackingFrame>,
}

impl SimTracker {
    /// A camera at the origin facing a plane `distance` meters ahead.
    pub fn facing_plane(viewport: Viewport, distance: f64) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let intrinsics = CameraIntrinsics::ideal(
            viewport.width * 1.5,
            viewport.width as u32,
            viewport.height as u32,
        );
        let frame = TrackingFrame::new(Pose3d::identity(), intrinsics, viewport).with_plane(
            TrackedPlane::new(Point3::new(0.0, 0.0, distance), -Vector3::z()),
        );
        Self {
            frame: Mutex::new(frame),
        }
    }

    /// Slides the camera sideways.
    pub fn move_camera(&self, dx: f64) {
        let mut frame = self.frame.lock();
        frame.camera.position[0] += dx;
    }
}

impl PlaneTracker for SimTracker {
    fn current_frame(&self) -> Option<TrackingFrame> {
        Some(self.frame.lock().clone())
    }
}

/// An open hand laid out in screen points around the view center.
pub fn open_hand(mapping: &LandmarkMapping, viewport: Viewport) -> HandPose {
    let [cx, cy] = viewport.center();
    let landmark = |dx: f64, dy: f64| {
        let (x, y) = mapping.to_normalized([cx + dx, cy + dy]);
        Landmark::new(x, y, 0.9)
    };
    // Base offset and per-joint step (dx, dy) for each digit.
    let digit = |base: (f64, f64), step: (f64, f64)| {
        let joint = |k: f64| landmark(base.0 + step.0 * k, base.1 + step.1 * k);
        DigitJoints::new(joint(3.0), joint(2.0), joint(1.0), joint(0.0))
    };
    HandPose {
        thumb: digit((-70.0, 60.0), (-22.0, -18.0)),
        index: digit((-40.0, 0.0), (-4.0, -30.0)),
        middle: digit((-10.0, -5.0), (0.0, -33.0)),
        ring: digit((20.0, 0.0), (4.0, -30.0)),
        little: digit((48.0, 12.0), (8.0, -24.0)),
        wrist: landmark(-5.0, 140.0),
    }
}
