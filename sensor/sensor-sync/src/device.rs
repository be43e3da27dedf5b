//! The platform capture device seam and the raw inputs it produces.

use async_trait::async_trait;
use sensor_types::{CameraCalibration, ColorFrame, DepthMap};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Camera permission state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    NotDetermined,
    /// Access granted.
    Authorized,
    /// Access denied by the user.
    Denied,
    /// Access blocked by policy.
    Restricted,
}

/// Parameters for building the capture graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureGraph {
    /// Maximum depth output resolution (longest side, pixels).
    pub max_resolution: u32,
    /// Maximum capture framerate.
    pub max_framerate: u32,
    /// Color preset width in pixels.
    pub color_width: u32,
    /// Color preset height in pixels.
    pub color_height: u32,
    /// Minimum exposure duration in seconds.
    pub min_exposure_secs: f64,
}

/// A color+depth capture device.
///
/// Implemented by the platform adapter. All methods are called from the
/// synchronizer's session queue, never concurrently.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Whether a depth-capable camera exists.
    async fn depth_camera_available(&self) -> bool;

    /// Current camera permission.
    async fn authorization_status(&self) -> AuthorizationStatus;

    /// Prompts for camera access and resolves with the user's answer.
    async fn request_access(&self) -> bool;

    /// Builds the capture graph (inputs, synchronized outputs, formats).
    ///
    /// # Errors
    ///
    /// Returns an error when an input or output cannot be added.
    async fn build_graph(&mut self, graph: &CaptureGraph) -> Result<()>;

    /// Starts the hardware.
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware refuses to start.
    async fn start_running(&mut self) -> Result<()>;

    /// Stops the hardware.
    async fn stop_running(&mut self);

    /// Whether the hardware reports itself as running.
    fn is_running(&self) -> bool;

    /// Enables or disables the depth output connection.
    async fn set_depth_enabled(&mut self, enabled: bool);
}

/// One synchronized delivery from the hardware, before filtering.
#[derive(Debug, Clone, Default)]
pub struct RawPair {
    /// Color side, absent if the hardware produced none.
    pub color: Option<ColorFrame>,
    /// Depth side, absent if the hardware produced none.
    pub depth: Option<DepthMap>,
    /// Calibration attached to the depth side.
    pub calibration: Option<CameraCalibration>,
    /// Hardware marked the color side as dropped.
    pub color_dropped: bool,
    /// Hardware marked the depth side as dropped.
    pub depth_dropped: bool,
}

impl RawPair {
    /// A complete, undropped pair.
    #[must_use]
    pub fn complete(color: ColorFrame, depth: DepthMap, calibration: CameraCalibration) -> Self {
        Self {
            color: Some(color),
            depth: Some(depth),
            calibration: Some(calibration),
            color_dropped: false,
            depth_dropped: false,
        }
    }

    /// Marks sides of the pair as dropped by the hardware.
    #[must_use]
    pub fn with_dropped(mut self, color: bool, depth: bool) -> Self {
        self.color_dropped = color;
        self.depth_dropped = depth;
        self
    }

    /// Whether either side was dropped by the hardware.
    #[must_use]
    pub const fn is_dropped(&self) -> bool {
        self.color_dropped || self.depth_dropped
    }
}

/// Device thermal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThermalState {
    /// Normal.
    Nominal,
    /// Slightly elevated.
    Fair,
    /// High; performance is throttled.
    Serious,
    /// Critical; heavy work must stop.
    Critical,
}

/// Why the system interrupted the capture session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptionReason {
    /// The camera is not available while the app is in the background.
    VideoDeviceNotAvailableInBackground,
    /// Another client took the camera.
    VideoDeviceInUseByAnotherClient,
    /// The camera is unavailable with multiple foreground apps.
    VideoDeviceNotAvailableWithMultipleForegroundApps,
    /// The camera was shut down due to system pressure.
    VideoDeviceNotAvailableDueToSystemPressure,
    /// Any other platform reason.
    Other(String),
}

impl std::fmt::Display for InterruptionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VideoDeviceNotAvailableInBackground => write!(f, "camera unavailable in background"),
            Self::VideoDeviceInUseByAnotherClient => write!(f, "camera in use by another client"),
            Self::VideoDeviceNotAvailableWithMultipleForegroundApps => {
                write!(f, "camera unavailable with multiple foreground apps")
            }
            Self::VideoDeviceNotAvailableDueToSystemPressure => {
                write!(f, "camera unavailable due to system pressure")
            }
            Self::Other(reason) => write!(f, "{reason}"),
        }
    }
}

/// A runtime error reported by the running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeFault {
    /// The platform media services were reset.
    MediaServicesReset,
    /// Any other error.
    Other(String),
}

impl std::fmt::Display for RuntimeFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MediaServicesReset => write!(f, "media services were reset"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_pair_is_incomplete_not_dropped() {
        let pair = RawPair::default();
        assert!(!pair.is_dropped());
        assert!(pair.color.is_none());
    }

    #[test]
    fn either_side_drops() {
        assert!(RawPair::default().with_dropped(true, false).is_dropped());
        assert!(RawPair::default().with_dropped(false, true).is_dropped());
    }

    #[test]
    fn thermal_ordering() {
        assert!(ThermalState::Critical > ThermalState::Serious);
    }

    #[test]
    fn fault_display() {
        assert_eq!(
            RuntimeFault::MediaServicesReset.to_string(),
            "media services were reset"
        );
        assert!(
            InterruptionReason::VideoDeviceInUseByAnotherClient
                .to_string()
                .contains("another client")
        );
    }
}
