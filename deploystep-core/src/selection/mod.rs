//! Deterministic choice of the instances a deployment phase acts on.

mod count;
mod hosts;
mod traffic;

pub use count::{percentage_count, target_count};
pub use hosts::resolve_hosts;
pub use traffic::{check_traffic_shift, TrafficShiftError};

use std::collections::BTreeSet;

use crate::expressions::ExpressionRenderer;
use crate::types::{
    CountUnit, Instance, PhaseStyle, PoolProvisioning, SelectionRequest, SelectionResult,
};

pub const MSG_EMPTY_POOL: &str = "No instances available in the infrastructure";
pub const MSG_IDENTICAL_TARGETS: &str = "Old and new targets are identical";
pub const MSG_DYNAMIC_POOL_HOSTS: &str =
    "Specific hosts cannot be targeted on a dynamically provisioned infrastructure";
pub const MSG_NO_SPECIFIC_HOSTS: &str = "No specific hosts were provided";

/// Business-rule constants for selection. Loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SelectionRules {
    #[serde(default = "default_max_shift", rename = "maxTrafficShiftPercent")]
    pub max_traffic_shift_percent: u32,
    #[serde(default = "default_relaxed_max_shift", rename = "relaxedMaxTrafficShiftPercent")]
    pub relaxed_max_traffic_shift_percent: u32,
}

fn default_max_shift() -> u32 {
    50
}

fn default_relaxed_max_shift() -> u32 {
    100
}

impl Default for SelectionRules {
    fn default() -> Self {
        Self {
            max_traffic_shift_percent: default_max_shift(),
            relaxed_max_traffic_shift_percent: default_relaxed_max_shift(),
        }
    }
}

/// Stateless selector. Holds only borrowed collaborators and toggles.
pub struct NodeSelector<'a> {
    renderer: &'a dyn ExpressionRenderer,
    rules: &'a SelectionRules,
    allow_inline_hosts: bool,
    relaxed_traffic_shift: bool,
}

impl<'a> NodeSelector<'a> {
    pub fn new(renderer: &'a dyn ExpressionRenderer, rules: &'a SelectionRules) -> Self {
        Self {
            renderer,
            rules,
            allow_inline_hosts: false,
            relaxed_traffic_shift: false,
        }
    }

    pub fn allow_inline_hosts(mut self, allow: bool) -> Self {
        self.allow_inline_hosts = allow;
        self
    }

    pub fn relaxed_traffic_shift(mut self, relaxed: bool) -> Self {
        self.relaxed_traffic_shift = relaxed;
        self
    }

    /// Choose instances for a phase.
    ///
    /// Ordinary edge cases (empty pool, unknown hosts, shortfalls) are reported
    /// through `error_message`; the caller decides whether they are fatal.
    pub fn select(
        &self,
        pool: &[Instance],
        request: &SelectionRequest,
        phase: PhaseStyle,
    ) -> SelectionResult {
        let result = match &request.specific_hosts {
            Some(exprs) => self.select_specific(pool, request, exprs),
            None => self.select_by_count(pool, request, phase),
        };
        reject_identical(result, &request.prior_targets)
    }

    /// Select for a traffic-shift phase: the shift bound is checked before anything else.
    pub fn select_for_traffic_shift(
        &self,
        pool: &[Instance],
        request: &SelectionRequest,
        phase: PhaseStyle,
        traffic_percent: u32,
    ) -> SelectionResult {
        if let Err(e) = check_traffic_shift(traffic_percent, self.rules, self.relaxed_traffic_shift)
        {
            return rejected(pool.to_vec(), e.to_string());
        }
        self.select(pool, request, phase)
    }

    fn select_specific(
        &self,
        pool: &[Instance],
        request: &SelectionRequest,
        exprs: &[String],
    ) -> SelectionResult {
        let mut all_known = pool.to_vec();
        if request.provisioning == PoolProvisioning::Dynamic {
            return rejected(all_known, MSG_DYNAMIC_POOL_HOSTS.to_string());
        }

        let hosts = resolve_hosts(self.renderer, exprs);
        if hosts.is_empty() {
            return SelectionResult {
                selected: Vec::new(),
                all_known,
                target_count: 0,
                rejected: false,
                error_message: Some(MSG_NO_SPECIFIC_HOSTS.to_string()),
            };
        }

        let mut selected = Vec::with_capacity(hosts.len());
        let mut missing = Vec::new();
        for host in &hosts {
            match pool.iter().find(|i| &i.host_name == host) {
                Some(instance) => selected.push(instance.clone()),
                None if self.allow_inline_hosts => {
                    let instance = Instance::new(host.clone(), host.clone());
                    all_known.push(instance.clone());
                    selected.push(instance);
                }
                None => missing.push(host.as_str()),
            }
        }

        let error_message = if missing.is_empty() {
            None
        } else {
            Some(format!("No host found matching: {}", missing.join(", ")))
        };

        SelectionResult {
            selected,
            all_known,
            target_count: hosts.len(),
            rejected: false,
            error_message,
        }
    }

    fn select_by_count(
        &self,
        pool: &[Instance],
        request: &SelectionRequest,
        phase: PhaseStyle,
    ) -> SelectionResult {
        let excluded: BTreeSet<&str> = request
            .exclude_instance_ids
            .iter()
            .map(String::as_str)
            .collect();
        let target = target_count(
            request.unit,
            request.desired_count,
            pool.len(),
            excluded.len(),
            phase,
        );

        let selected: Vec<Instance> = pool
            .iter()
            .filter(|i| !excluded.contains(i.id.as_str()))
            .take(target)
            .cloned()
            .collect();

        let error_message = if pool.is_empty() {
            Some(MSG_EMPTY_POOL.to_string())
        } else if selected.len() < target && !excluded.is_empty() {
            Some(shortfall_message(request.unit, pool.len(), selected.len(), target))
        } else {
            None
        };

        SelectionResult {
            selected,
            all_known: pool.to_vec(),
            target_count: target,
            rejected: false,
            error_message,
        }
    }
}

fn shortfall_message(unit: CountUnit, pool_size: usize, available: usize, target: usize) -> String {
    if available == 0 && unit == CountUnit::Percentage {
        return format!(
            "No new instances available to deploy: all {pool_size} instance(s) were used by earlier phases"
        );
    }
    format!(
        "Only {available} of {target} requested instance(s) are available; the rest were used by earlier phases"
    )
}

fn rejected(all_known: Vec<Instance>, message: String) -> SelectionResult {
    SelectionResult {
        selected: Vec::new(),
        all_known,
        target_count: 0,
        rejected: true,
        error_message: Some(message),
    }
}

fn reject_identical(result: SelectionResult, prior_targets: &[String]) -> SelectionResult {
    if prior_targets.is_empty() || result.selected.is_empty() {
        return result;
    }
    let prior: BTreeSet<&str> = prior_targets.iter().map(String::as_str).collect();
    let current: BTreeSet<&str> = result.selected.iter().map(|i| i.id.as_str()).collect();
    if prior == current {
        return rejected(result.all_known, MSG_IDENTICAL_TARGETS.to_string());
    }
    result
}
