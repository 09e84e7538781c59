use std::collections::BTreeMap;

/// One deployable target: a host, a container, or a function alias.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Instance {
    pub id: String,
    #[serde(rename = "hostName")]
    pub host_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Instance {
    pub fn new(id: impl Into<String>, host_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host_name: host_name.into(),
            metadata: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CountUnit {
    Count,
    Percentage,
}

/// Whether the pool's hosts are known ahead of time or created on demand (e.g. autoscaled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolProvisioning {
    #[default]
    Static,
    Dynamic,
}

/// How a phase interprets its target count relative to earlier phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStyle {
    /// Count is used as-is.
    Rolling,
    /// Count is reduced by the instances earlier phases already used.
    #[default]
    Canary,
    Basic,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SelectionRequest {
    #[serde(rename = "desiredCount")]
    pub desired_count: u32,
    pub unit: CountUnit,
    #[serde(default, rename = "specificHosts", skip_serializing_if = "Option::is_none")]
    pub specific_hosts: Option<Vec<String>>,
    #[serde(default, rename = "excludeInstanceIds")]
    pub exclude_instance_ids: Vec<String>,
    #[serde(default)]
    pub provisioning: PoolProvisioning,
    /// Instance ids targeted by the immediately prior comparable phase.
    #[serde(default, rename = "priorTargets", skip_serializing_if = "Vec::is_empty")]
    pub prior_targets: Vec<String>,
}

impl SelectionRequest {
    pub fn count(desired_count: u32) -> Self {
        Self::new(desired_count, CountUnit::Count)
    }

    pub fn percentage(desired_count: u32) -> Self {
        Self::new(desired_count, CountUnit::Percentage)
    }

    fn new(desired_count: u32, unit: CountUnit) -> Self {
        Self {
            desired_count,
            unit,
            specific_hosts: None,
            exclude_instance_ids: Vec::new(),
            provisioning: PoolProvisioning::Static,
            prior_targets: Vec::new(),
        }
    }

    pub fn excluding<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_instance_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_specific_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.specific_hosts = Some(hosts.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SelectionResult {
    pub selected: Vec<Instance>,
    #[serde(rename = "allKnown")]
    pub all_known: Vec<Instance>,
    #[serde(rename = "targetCount")]
    pub target_count: usize,
    /// Set when a business rule refused the selection outright.
    pub rejected: bool,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SelectionResult {
    pub fn selected_ids(&self) -> Vec<&str> {
        self.selected.iter().map(|i| i.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
