use std::collections::BTreeMap;

/// Opaque, step-kind-specific JSON blob (remote parameters, result payloads, step output).
pub type Payload = serde_json::Value;

/// Orchestration-context variables available to expression rendering.
pub type Variables = BTreeMap<String, String>;
