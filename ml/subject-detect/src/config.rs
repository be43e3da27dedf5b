//! Detector configuration and the lighting-conditioned decision rule.
//!
//! The threshold values reproduce the tuned behavior of the shipped model.
//! They are configuration, not derived constants: retune them together with
//! the model.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DetectError, Result};
use crate::observation::{Observation, Verdict};

/// Confidence thresholds for the positive/negative label decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionThresholds {
    /// The negative label must stay below this for any positive decision.
    pub negative_veto: f32,

    /// Low light: minimum observation confidence.
    pub low_light_min_confidence: f32,
    /// Low light: minimum positive label confidence.
    pub low_light_min_positive: f32,
    /// Low light: minimum negative label confidence.
    pub low_light_min_negative: f32,

    /// Normal light, confident rule: minimum observation confidence.
    pub confident_min_confidence: f32,
    /// Normal light, confident rule: minimum positive label confidence.
    pub confident_min_positive: f32,

    /// Normal light, clean rule: maximum negative label confidence.
    pub clean_max_negative: f32,
    /// Normal light, clean rule: minimum positive label confidence.
    pub clean_min_positive: f32,
    /// Normal light, clean rule: minimum observation confidence.
    pub clean_min_confidence: f32,

    /// Normal light, pristine rule: maximum negative label confidence.
    pub pristine_max_negative: f32,
    /// Normal light, pristine rule: minimum positive label confidence.
    pub pristine_min_positive: f32,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            negative_veto: 0.01,
            low_light_min_confidence: 0.2,
            low_light_min_positive: 0.65,
            low_light_min_negative: 0.006,
            confident_min_confidence: 0.4,
            confident_min_positive: 0.75,
            clean_max_negative: 0.005,
            clean_min_positive: 0.9,
            clean_min_confidence: 0.25,
            pristine_max_negative: 0.0001,
            pristine_min_positive: 0.9,
        }
    }
}

impl DecisionThresholds {
    /// Applies the rule for the current lighting to one observation's scores.
    #[must_use]
    pub fn is_positive(&self, confidence: f32, positive: f32, negative: f32, low_light: bool) -> bool {
        if negative >= self.negative_veto {
            return false;
        }
        if low_light {
            return confidence > self.low_light_min_confidence
                && positive > self.low_light_min_positive
                && negative > self.low_light_min_negative;
        }
        let confident =
            confidence > self.confident_min_confidence && positive > self.confident_min_positive;
        let clean = negative < self.clean_max_negative
            && positive > self.clean_min_positive
            && confidence > self.clean_min_confidence;
        let pristine = negative < self.pristine_max_negative && positive > self.pristine_min_positive;
        confident || clean || pristine
    }
}

/// Subject detector configuration.
///
/// # Example
///
/// ```
/// use subject_detect::DetectorConfig;
///
/// let config = DetectorConfig::default();
/// assert_eq!(config.positive_label, "Foot");
/// assert_eq!(config.confirm_after().as_millis(), 1000);
/// assert!(config.is_low_light(-0.1));
/// assert!(!config.is_low_light(0.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Label of the subject to confirm.
    pub positive_label: String,
    /// Confusable label that vetoes confirmation.
    pub negative_label: String,
    /// Decision thresholds.
    pub thresholds: DecisionThresholds,
    /// Brightness below which the scene counts as low light.
    pub min_brightness: f64,
    /// Delay before an in-range, uncontradicted subject is confirmed.
    pub confirm_after_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            positive_label: "Foot".to_string(),
            negative_label: "Palm".to_string(),
            thresholds: DecisionThresholds::default(),
            min_brightness: 0.0,
            confirm_after_ms: 1000,
        }
    }
}

impl DetectorConfig {
    /// Sets the positive and negative labels.
    #[must_use]
    pub fn with_labels(mut self, positive: impl Into<String>, negative: impl Into<String>) -> Self {
        self.positive_label = positive.into();
        self.negative_label = negative.into();
        self
    }

    /// Sets the confirmation delay.
    #[must_use]
    pub const fn with_confirm_after_ms(mut self, millis: u64) -> Self {
        self.confirm_after_ms = millis;
        self
    }

    /// The confirmation delay.
    #[must_use]
    pub const fn confirm_after(&self) -> Duration {
        Duration::from_millis(self.confirm_after_ms)
    }

    /// Whether a brightness value counts as low light.
    #[must_use]
    pub fn is_low_light(&self, brightness: f64) -> bool {
        brightness < self.min_brightness
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidConfig`] for empty or identical labels.
    pub fn validate(&self) -> Result<()> {
        if self.positive_label.is_empty() || self.negative_label.is_empty() {
            return Err(DetectError::invalid_config("labels must not be empty"));
        }
        if self.positive_label == self.negative_label {
            return Err(DetectError::invalid_config(
                "positive and negative labels must differ",
            ));
        }
        Ok(())
    }

    /// Judges a classification from its top observation.
    ///
    /// Both labels must be present on the top observation. The result is
    /// [`Verdict::Contrary`] when the negative label scores at least as high
    /// as the positive one.
    #[must_use]
    pub fn evaluate(&self, observations: &[Observation], low_light: bool) -> Verdict {
        let Some(top) = observations.first() else {
            return Verdict::Inconclusive;
        };
        let (Some(positive), Some(negative)) = (
            top.label_confidence(&self.positive_label),
            top.label_confidence(&self.negative_label),
        ) else {
            return Verdict::Inconclusive;
        };
        if negative >= positive {
            return Verdict::Contrary;
        }
        if self
            .thresholds
            .is_positive(top.confidence, positive, negative, low_light)
        {
            Verdict::Positive
        } else {
            Verdict::Inconclusive
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::ClassLabel;

    fn obs(confidence: f32, foot: f32, palm: f32) -> Vec<Observation> {
        vec![Observation::new(
            confidence,
            vec![ClassLabel::new("Foot", foot), ClassLabel::new("Palm", palm)],
        )]
    }

    #[test]
    fn normal_light_confident_rule() {
        let config = DetectorConfig::default();
        assert_eq!(config.evaluate(&obs(0.41, 0.76, 0.009), false), Verdict::Positive);
        assert_eq!(config.evaluate(&obs(0.40, 0.76, 0.009), false), Verdict::Inconclusive);
        assert_eq!(config.evaluate(&obs(0.41, 0.75, 0.009), false), Verdict::Inconclusive);
    }

    #[test]
    fn normal_light_clean_rule() {
        let config = DetectorConfig::default();
        assert_eq!(config.evaluate(&obs(0.26, 0.91, 0.004), false), Verdict::Positive);
        assert_eq!(config.evaluate(&obs(0.26, 0.91, 0.005), false), Verdict::Inconclusive);
    }

    #[test]
    fn normal_light_pristine_rule_ignores_confidence() {
        let config = DetectorConfig::default();
        assert_eq!(config.evaluate(&obs(0.01, 0.91, 0.00005), false), Verdict::Positive);
        assert_eq!(config.evaluate(&obs(0.01, 0.91, 0.0002), false), Verdict::Inconclusive);
    }

    #[test]
    fn low_light_rule_is_relaxed() {
        let config = DetectorConfig::default();
        assert_eq!(config.evaluate(&obs(0.21, 0.66, 0.007), true), Verdict::Positive);
        // Same scores fail under normal light.
        assert_eq!(config.evaluate(&obs(0.21, 0.66, 0.007), false), Verdict::Inconclusive);
        // Low light requires a small but present negative score.
        assert_eq!(config.evaluate(&obs(0.9, 0.99, 0.006), true), Verdict::Inconclusive);
    }

    #[test]
    fn negative_veto_blocks_all_rules() {
        let config = DetectorConfig::default();
        assert_eq!(config.evaluate(&obs(0.99, 0.99, 0.01), false), Verdict::Inconclusive);
        assert_eq!(config.evaluate(&obs(0.99, 0.99, 0.01), true), Verdict::Inconclusive);
    }

    #[test]
    fn dominant_negative_is_contrary() {
        let config = DetectorConfig::default();
        assert_eq!(config.evaluate(&obs(0.9, 0.2, 0.8), false), Verdict::Contrary);
    }

    #[test]
    fn missing_label_is_inconclusive() {
        let config = DetectorConfig::default();
        let only_foot = vec![Observation::new(0.9, vec![ClassLabel::new("Foot", 0.99)])];
        assert_eq!(config.evaluate(&only_foot, false), Verdict::Inconclusive);
        assert_eq!(config.evaluate(&[], false), Verdict::Inconclusive);
    }

    #[test]
    fn only_top_observation_counts() {
        let config = DetectorConfig::default();
        let mut observations = obs(0.1, 0.5, 0.009);
        observations.extend(obs(0.99, 0.99, 0.0));
        assert_eq!(config.evaluate(&observations, false), Verdict::Inconclusive);
    }

    #[test]
    fn validate_labels() {
        assert!(DetectorConfig::default().validate().is_ok());
        let same = DetectorConfig::default().with_labels("Hand", "Hand");
        assert!(same.validate().is_err());
        let empty = DetectorConfig::default().with_labels("", "Palm");
        assert!(empty.validate().is_err());
    }
}
