use std::time::Duration;

use deploystep_core::{SelectionRules, StaticFeatureFlags};

use crate::retry::RetryConfig;

const DEFAULT_RETIRED_TTL_MS: u64 = 600_000;

fn default_retired_ttl_ms() -> u64 {
    DEFAULT_RETIRED_TTL_MS
}

/// Engine-wide settings. Loaded once at startup and handed to the runner.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub selection: SelectionRules,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Applied to suspended executions that carry no timeout of their own.
    #[serde(default, rename = "defaultTimeoutMs", skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
    #[serde(default)]
    pub flags: StaticFeatureFlags,
    #[serde(default, rename = "webhookUrl", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// How long consumed correlation ids are remembered before pruning.
    #[serde(default = "default_retired_ttl_ms", rename = "retiredTtlMs")]
    pub retired_ttl_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            selection: SelectionRules::default(),
            retry: RetryConfig::default(),
            default_timeout_ms: None,
            flags: StaticFeatureFlags::default(),
            webhook_url: None,
            retired_ttl_ms: DEFAULT_RETIRED_TTL_MS,
        }
    }
}

impl EngineConfig {
    pub fn retired_ttl(&self) -> Duration {
        Duration::from_millis(self.retired_ttl_ms)
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// Why an execution was aborted out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    UserCancelled,
    Timeout,
}
