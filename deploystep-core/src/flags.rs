use std::collections::{BTreeMap, BTreeSet};

/// Explicit hosts missing from the pool are synthesized instead of reported.
pub const INLINE_HOSTS: &str = "INLINE_HOSTS";
/// Raises the traffic-shift upper bound to the relaxed limit.
pub const RELAXED_TRAFFIC_SHIFT: &str = "RELAXED_TRAFFIC_SHIFT";

/// Point-in-time feature-flag lookup. Answers are not cached by callers.
pub trait FeatureFlags: Send + Sync {
    fn is_enabled(&self, flag: &str, account_id: &str) -> bool;
}

/// Flags read from configuration: globally enabled, or enabled per account.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StaticFeatureFlags {
    #[serde(default)]
    pub enabled: BTreeSet<String>,
    #[serde(default, rename = "perAccount")]
    pub per_account: BTreeMap<String, BTreeSet<String>>,
}

impl StaticFeatureFlags {
    pub fn enable(mut self, flag: impl Into<String>) -> Self {
        self.enabled.insert(flag.into());
        self
    }

    pub fn enable_for(mut self, account_id: impl Into<String>, flag: impl Into<String>) -> Self {
        self.per_account
            .entry(account_id.into())
            .or_default()
            .insert(flag.into());
        self
    }
}

impl FeatureFlags for StaticFeatureFlags {
    fn is_enabled(&self, flag: &str, account_id: &str) -> bool {
        self.enabled.contains(flag)
            || self
                .per_account
                .get(account_id)
                .is_some_and(|flags| flags.contains(flag))
    }
}
