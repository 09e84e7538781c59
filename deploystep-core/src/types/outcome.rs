use crate::types::{CorrelationId, Payload, Status};

/// Distinguishes why a step ended badly when the status alone is ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    Timeout,
    Rejected,
    UserCancelled,
}

/// Result of `begin`/`resume`: either terminal, or suspended on remote results.
///
/// Suspended outcomes always carry `Running` and at least one correlation id;
/// terminal outcomes never carry correlation ids. The constructors are the only
/// way to build one, so the two shapes cannot be mixed.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Outcome {
    status: Status,
    #[serde(rename = "async")]
    is_async: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    correlation_ids: Vec<CorrelationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_type: Option<FailureType>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    payload: Payload,
}

impl Outcome {
    fn terminal(status: Status) -> Self {
        Self {
            status,
            is_async: false,
            correlation_ids: Vec::new(),
            error_message: None,
            failure_type: None,
            payload: Payload::Null,
        }
    }

    /// Returns `None` when `ids` is empty: there is nothing to wait for.
    pub fn suspended(ids: Vec<CorrelationId>) -> Option<Self> {
        if ids.is_empty() {
            return None;
        }
        Some(Self {
            status: Status::Running,
            is_async: true,
            correlation_ids: ids,
            error_message: None,
            failure_type: None,
            payload: Payload::Null,
        })
    }

    pub fn success() -> Self {
        Self::terminal(Status::Success)
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::terminal(Status::Skipped).with_message(message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::terminal(Status::Failed).with_message(message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::terminal(Status::Error).with_message(message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::terminal(Status::Rejected)
            .with_message(message)
            .with_failure_type(FailureType::Rejected)
    }

    pub fn aborted(failure_type: FailureType) -> Self {
        let message = match failure_type {
            FailureType::Timeout => "Step timed out while waiting for a remote result",
            FailureType::UserCancelled => "Step was aborted",
            FailureType::Rejected => "Step was rejected",
        };
        Self::terminal(Status::Aborted)
            .with_message(message)
            .with_failure_type(failure_type)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_failure_type(mut self, failure_type: FailureType) -> Self {
        self.failure_type = Some(failure_type);
        self
    }

    /// Payloads are only attached to terminal outcomes; a suspended outcome is returned unchanged.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        if !self.is_async {
            self.payload = payload;
        }
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn correlation_ids(&self) -> &[CorrelationId] {
        &self.correlation_ids
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn failure_type(&self) -> Option<FailureType> {
        self.failure_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}
