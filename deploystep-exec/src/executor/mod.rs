pub mod events;
pub mod failure;
pub mod http;
pub mod metrics;
mod result;
mod step_runner;
mod types;
pub mod webhook;

pub use metrics::{MetricsCollector, MetricsEventSink, RunnerMetrics};

pub use events::{
    CompositeEventSink, Event, EventSink, NoOpEventSink, StdoutEventSink, TracingEventSink,
};
pub use http::{HttpClient, HttpError, JsonPost, ReqwestHttpClient};
pub use result::{DeliveryReport, RunnerError};
pub use step_runner::{StepRunner, StepRunnerBuilder};
pub use types::{AbortReason, EngineConfig};
pub use webhook::WebhookEventSink;
