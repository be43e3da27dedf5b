//! The classifier seam.

use async_trait::async_trait;
use sensor_types::ColorFrame;

use crate::error::Result;
use crate::observation::Observation;

/// A single-shot image classifier.
///
/// Implementations are stateless across calls: one color frame in, labeled
/// observations out, sorted by confidence.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classifies one frame.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::Classifier`](crate::DetectError::Classifier)
    /// when the model cannot run on the frame.
    async fn classify(&self, frame: &ColorFrame) -> Result<Vec<Observation>>;
}
