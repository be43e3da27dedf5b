//! Reconstruction, texturing and capture seams.
//!
//! The engines are external: the session only drives them. Per-frame
//! callbacks from the reconstruction engine come back as [`EngineEvent`]s
//! through an [`EngineEventSink`] so they are handled on the session task in
//! arrival order.

use std::sync::Arc;

use async_trait::async_trait;
use sensor_types::{ColorFrame, FrameSample};
use tokio::sync::mpsc;
use tracing::trace;

/// Row-major 4x4 matrix.
pub type Matrix4 = [[f64; 4]; 4];

/// Fused point cloud.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    /// Point positions in meters.
    pub positions: Vec<[f32; 3]>,
    /// Per-point RGB colors in `[0, 1]`.
    pub colors: Vec<[f32; 3]>,
}

impl PointCloud {
    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True when the cloud holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Textured triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TexturedMesh {
    /// Vertex positions.
    pub vertices: Vec<[f32; 3]>,
    /// Triangle faces as vertex indices, counter-clockwise.
    pub faces: Vec<[u32; 3]>,
    /// Per-vertex texture coordinates.
    pub texture_coords: Vec<[f32; 2]>,
}

/// The result of a finished scan.
#[derive(Debug, Clone)]
pub struct ScanOutput {
    /// Fused point cloud.
    pub point_cloud: Arc<PointCloud>,
    /// Textured mesh built from the point cloud.
    pub mesh: Arc<TexturedMesh>,
}

/// Per-frame fusion result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameResult {
    /// Fused.
    Succeeded,
    /// Fused with weak tracking.
    PoorTracking,
    /// Fusion failed; the scan cannot continue.
    Failed,
    /// Tracking lost; the frame was skipped.
    LostTracking,
}

/// Metadata for one processed frame.
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    /// Fusion result.
    pub result: FrameResult,
    /// Camera view matrix at this frame.
    pub view_matrix: Matrix4,
    /// Camera projection matrix at this frame.
    pub projection_matrix: Matrix4,
    /// Color buffer, when the engine includes it.
    pub color: Option<ColorFrame>,
}

/// Cumulative engine statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructionStats {
    /// Frames fused successfully since the last reset.
    pub succeeded_count: u32,
}

/// Callback from the reconstruction engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A frame finished processing.
    FrameProcessed {
        /// Per-frame metadata.
        metadata: FrameMetadata,
        /// Cumulative statistics.
        stats: ReconstructionStats,
    },
    /// The engine hit an API error.
    ApiError(String),
}

/// Sending half for engine callbacks. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineEventSink {
    /// Reports a processed frame.
    pub fn frame_processed(&self, metadata: FrameMetadata, stats: ReconstructionStats) {
        if self.tx.send(EngineEvent::FrameProcessed { metadata, stats }).is_err() {
            trace!("session gone, frame result dropped");
        }
    }

    /// Reports an API error.
    pub fn api_error(&self, message: impl Into<String>) {
        if self.tx.send(EngineEvent::ApiError(message.into())).is_err() {
            trace!("session gone, engine error dropped");
        }
    }
}

/// Receiving half for engine callbacks, consumed by the session.
#[derive(Debug)]
pub struct EngineEvents {
    rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EngineEvents {
    pub(crate) async fn recv(&mut self) -> Option<EngineEvent> {
        self.rx.recv().await
    }
}

/// Creates the callback channel between an engine and a session.
#[must_use]
pub fn engine_channel() -> (EngineEventSink, EngineEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EngineEventSink { tx }, EngineEvents { rx })
}

/// A volumetric reconstruction engine.
///
/// Processing results are reported through the [`EngineEventSink`] handed
/// to the engine at construction.
#[async_trait]
pub trait ReconstructionEngine: Send + Sync {
    /// Fuses one synchronized pair.
    async fn accumulate(&self, sample: &FrameSample);

    /// Completes any pending fusion work.
    async fn finalize(&self);

    /// Builds a point cloud from everything fused since the last reset.
    fn build_point_cloud(&self) -> PointCloud;

    /// Discards all fused data.
    fn reset(&self);
}

/// Progress of a texturing pass.
#[derive(Debug, Clone)]
pub enum TexturingStatus {
    /// Fraction done in `[0, 1]`.
    InProgress(f32),
    /// Finished mesh.
    Success(TexturedMesh),
    /// The pass failed.
    Failure(String),
}

/// A mesh texturing engine fed with periodic color snapshots.
pub trait MeshTexturer: Send + Sync {
    /// Stores a color snapshot with the camera matrices it was taken with.
    fn save_color_buffer(&self, color: &ColorFrame, view: &Matrix4, projection: &Matrix4);

    /// Starts meshing and texturing `cloud`. Statuses arrive on the
    /// returned channel; the last one is terminal.
    fn process_mesh(&self, cloud: Arc<PointCloud>) -> mpsc::UnboundedReceiver<TexturingStatus>;

    /// Drops all stored snapshots.
    fn reset(&self);
}

/// Capture session control used on scan exit.
#[async_trait]
pub trait CaptureControl: Send + Sync {
    /// Stops capture.
    async fn stop_capture(&self);

    /// Starts capture again if it is not running.
    async fn restart_capture(&self);
}

#[async_trait]
impl CaptureControl for sensor_sync::SensorSynchronizer {
    async fn stop_capture(&self) {
        self.stop().await;
    }

    async fn restart_capture(&self) {
        if self.is_running() {
            return;
        }
        if let Err(err) = self.start().await {
            tracing::warn!(error = %err, "capture restart failed");
        }
    }
}
