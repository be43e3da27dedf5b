//! Property-based tests for pair delivery.
//!
//! Run with: cargo test -p sensor-sync -- proptest

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use proptest::prelude::*;
use sensor_sync::{
    AuthorizationStatus, CaptureConfig, CaptureDevice, CaptureGraph, DeliveryOutcome, RawPair,
    Result, SensorSynchronizer, SetupResult,
};
use sensor_types::{CameraCalibration, CameraIntrinsics, ColorFrame, DepthMap, Timestamp};
use std::sync::atomic::{AtomicBool, Ordering};

// =============================================================================
// Test device
// =============================================================================

#[derive(Default)]
struct AlwaysOn {
    running: AtomicBool,
}

#[async_trait]
impl CaptureDevice for AlwaysOn {
    async fn depth_camera_available(&self) -> bool {
        true
    }

    async fn authorization_status(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }

    async fn request_access(&self) -> bool {
        true
    }

    async fn build_graph(&mut self, _graph: &CaptureGraph) -> Result<()> {
        Ok(())
    }

    async fn start_running(&mut self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_running(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn set_depth_enabled(&mut self, _enabled: bool) {}
}

fn pair(index: u64, color_dropped: bool, depth_dropped: bool) -> RawPair {
    let ts = Timestamp::from_millis(index * 33);
    RawPair::complete(
        ColorFrame::filled(ts, 2, 2, [90, 90, 90, 255]),
        DepthMap::filled(ts, 2, 2, 0.3),
        CameraCalibration::new(CameraIntrinsics::ideal(50.0, 2, 2)),
    )
    .with_dropped(color_dropped, depth_dropped)
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// With a consumer that keeps up, every non-dropped pair arrives exactly
    /// once and in arrival order.
    #[test]
    fn proptest_delivered_equals_sent_minus_dropped(
        drops in prop::collection::vec((any::<bool>(), any::<bool>()), 0..64)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (sync, mut outputs) =
            SensorSynchronizer::new(CaptureConfig::default(), Box::new(AlwaysOn::default()));
        runtime.block_on(async {
            assert_eq!(sync.configure(320, 30).await, SetupResult::Success);
            sync.start().await.unwrap();
        });

        let mut received = Vec::new();
        let mut expected = Vec::new();
        for (index, (color_dropped, depth_dropped)) in drops.iter().copied().enumerate() {
            let index = index as u64;
            let outcome = sync.deliver(pair(index, color_dropped, depth_dropped));
            if color_dropped || depth_dropped {
                prop_assert_eq!(outcome, DeliveryOutcome::HardwareDropped);
            } else {
                prop_assert_eq!(outcome, DeliveryOutcome::Delivered);
                expected.push(Timestamp::from_millis(index * 33));
            }
            while let Ok(sample) = outputs.frames.try_recv() {
                received.push(sample.timestamp);
            }
        }

        let dropped = drops.iter().filter(|(c, d)| *c || *d).count();
        prop_assert_eq!(received.len(), drops.len() - dropped);
        prop_assert_eq!(received, expected);
        prop_assert_eq!(sync.stats().hardware_dropped, dropped as u64);
    }
}
