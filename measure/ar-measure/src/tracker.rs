//! Plane-tracking seam.

use crate::raycast::TrackingFrame;

/// Supplies the latest plane-tracking snapshot.
///
/// Implemented by the platform AR session. `None` means tracking has not
/// produced a frame yet.
pub trait PlaneTracker: Send + Sync {
    /// The frame currently on screen.
    fn current_frame(&self) -> Option<TrackingFrame>;
}

impl<F> PlaneTracker for F
where
    F: Fn() -> Option<TrackingFrame> + Send + Sync,
{
    fn current_frame(&self) -> Option<TrackingFrame> {
        self()
    }
}
