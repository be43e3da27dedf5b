//! Classifier output types.

use serde::{Deserialize, Serialize};

/// A class label with its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLabel {
    /// Label identifier as produced by the model.
    pub identifier: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

impl ClassLabel {
    /// Creates a label.
    #[must_use]
    pub fn new(identifier: impl Into<String>, confidence: f32) -> Self {
        Self {
            identifier: identifier.into(),
            confidence,
        }
    }
}

/// One recognized object: an overall confidence plus per-label confidences.
///
/// Classifiers return observations sorted by confidence, so the first one is
/// the top observation.
///
/// # Example
///
/// ```
/// use subject_detect::{ClassLabel, Observation};
///
/// let obs = Observation::new(0.8, vec![ClassLabel::new("Foot", 0.9), ClassLabel::new("Palm", 0.001)]);
/// assert_eq!(obs.label_confidence("Foot"), Some(0.9));
/// assert_eq!(obs.label_confidence("Hand"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Overall detection confidence.
    pub confidence: f32,
    /// Per-label confidences.
    pub labels: Vec<ClassLabel>,
}

impl Observation {
    /// Creates an observation.
    #[must_use]
    pub const fn new(confidence: f32, labels: Vec<ClassLabel>) -> Self {
        Self { confidence, labels }
    }

    /// Confidence of the label with the given identifier.
    #[must_use]
    pub fn label_confidence(&self, identifier: &str) -> Option<f32> {
        self.labels
            .iter()
            .find(|label| label.identifier == identifier)
            .map(|label| label.confidence)
    }

    /// The highest-confidence label.
    #[must_use]
    pub fn best_label(&self) -> Option<&ClassLabel> {
        self.labels
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

/// How one classification bears on the subject being present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Strong enough to confirm immediately.
    Positive,
    /// Neither confirms nor contradicts.
    Inconclusive,
    /// The confusable negative label dominates.
    Contrary,
}
