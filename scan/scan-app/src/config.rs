//! Application configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use ar_measure::MeasureConfig;
use scan_feedback::FeedbackConfig;
use scan_session::SessionConfig;
use sensor_sync::CaptureConfig;
use serde::{Deserialize, Serialize};
use subject_detect::DetectorConfig;

/// Every service's configuration, one TOML table each.
///
/// Missing tables and keys fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture session and detection range.
    pub capture: CaptureConfig,
    /// Subject classifier decision rule.
    pub detector: DetectorConfig,
    /// Countdown and scan hand-off.
    pub session: SessionConfig,
    /// Haptic and spoken feedback.
    pub feedback: FeedbackConfig,
    /// Hand measurement and ruler.
    pub measure: MeasureConfig,
}

impl AppConfig {
    /// Reads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = Self::from_toml(&text).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.capture.validate().context("[capture]")?;
        self.detector.validate().context("[detector]")?;
        self.session.validate().context("[session]")?;
        self.measure.validate().context("[measure]")?;
        Ok(())
    }

    /// The effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
