//! Service tunables.

use subhub_core::external_sync::{CREDIT_WINDOW_MS, DEFAULT_CREDIT_TEXT};

/// Knobs shared by the services.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Credit line appended to outbound sync payloads.
    pub sync_credit_text: String,

    /// Length of the tail window the credit may occupy.
    pub sync_credit_window_ms: i64,

    /// How many times a `(language, version_number)` race is retried.
    pub integrity_retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sync_credit_text: DEFAULT_CREDIT_TEXT.to_string(),
            sync_credit_window_ms: CREDIT_WINDOW_MS,
            integrity_retries: 1,
        }
    }
}

impl PipelineConfig {
    /// Override the credit text, keeping the other defaults.
    pub fn with_credit_text(mut self, text: impl Into<String>) -> Self {
        self.sync_credit_text = text.into();
        self
    }
}
