//! Spoken prompts and their text.

use serde::{Deserialize, Serialize};

/// A spoken prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prompt {
    /// Announces that the countdown is about to start.
    CountdownBegins,
    /// Remaining countdown seconds.
    Count(u8),
    /// Announces the end of a successful scan.
    ScanningFinished,
}

/// Text for each prompt. Replace it to localize narration.
///
/// # Example
///
/// ```
/// use scan_feedback::{Prompt, PromptTable};
///
/// let table = PromptTable::default();
/// assert_eq!(table.text(Prompt::Count(3)), "3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTable {
    /// Text for [`Prompt::CountdownBegins`].
    pub countdown_begins: String,
    /// Text for [`Prompt::ScanningFinished`].
    pub scanning_finished: String,
}

impl Default for PromptTable {
    fn default() -> Self {
        Self {
            countdown_begins: "Hold still, the countdown begins".to_string(),
            scanning_finished: "Scanning finished".to_string(),
        }
    }
}

impl PromptTable {
    /// Resolves a prompt to its text.
    #[must_use]
    pub fn text(&self, prompt: Prompt) -> String {
        match prompt {
            Prompt::CountdownBegins => self.countdown_begins.clone(),
            Prompt::Count(seconds) => seconds.to_string(),
            Prompt::ScanningFinished => self.scanning_finished.clone(),
        }
    }
}
