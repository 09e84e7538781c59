use crate::types::{CorrelationId, Payload};

/// A unit of work handed to the external executor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RemoteTaskHandle {
    pub task_type: String,
    pub parameters: Payload,
    pub timeout_millis: u64,
    #[serde(default)]
    pub routing_tags: Vec<String>,
    pub correlation_id: CorrelationId,
}

impl RemoteTaskHandle {
    /// Every handle gets a fresh correlation id; ids are never shared between legs.
    pub fn new(task_type: impl Into<String>, parameters: Payload, timeout_millis: u64) -> Self {
        Self {
            task_type: task_type.into(),
            parameters,
            timeout_millis,
            routing_tags: Vec::new(),
            correlation_id: CorrelationId::generate(),
        }
    }

    pub fn with_routing_tags(mut self, tags: Vec<String>) -> Self {
        self.routing_tags = tags;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteStatus {
    Success,
    Failure,
    Running,
    Queued,
}

impl RemoteStatus {
    /// `Running`/`Queued` envelopes are progress notifications, not results.
    pub fn is_final(&self) -> bool {
        matches!(self, RemoteStatus::Success | RemoteStatus::Failure)
    }
}

/// A result reported by the external executor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResultEnvelope {
    pub correlation_id: CorrelationId,
    pub status: RemoteStatus,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Set on a `Failure` when the executor gave up waiting on the task.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
}

impl ResultEnvelope {
    pub fn success(correlation_id: CorrelationId, payload: Payload) -> Self {
        Self {
            correlation_id,
            status: RemoteStatus::Success,
            payload,
            error_message: None,
            timed_out: false,
        }
    }

    pub fn failure(correlation_id: CorrelationId, message: impl Into<String>) -> Self {
        Self {
            correlation_id,
            status: RemoteStatus::Failure,
            payload: Payload::Null,
            error_message: Some(message.into()),
            timed_out: false,
        }
    }

    pub fn timed_out(correlation_id: CorrelationId, message: impl Into<String>) -> Self {
        Self {
            timed_out: true,
            ..Self::failure(correlation_id, message)
        }
    }
}
