use std::collections::BTreeSet;
use std::time::Duration;

use deploystep_core::FailureClass;

/// When and how often a failed step is re-run from `begin`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first; 1 disables retries.
    #[serde(rename = "maxAttempts")]
    pub max_attempts: usize,
    #[serde(rename = "retryOn")]
    pub retry_on: BTreeSet<FailureClass>,
    #[serde(rename = "baseDelayMs")]
    pub base_delay_ms: u64,
    pub factor: f64,
    #[serde(rename = "maxDelayMs")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            retry_on: [FailureClass::Remote, FailureClass::Timeout]
                .into_iter()
                .collect(),
            base_delay_ms: 1000,
            factor: 2.0,
            max_delay_ms: 60_000,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}
