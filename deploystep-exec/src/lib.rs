#![forbid(unsafe_code)]

//! Async suspend/resume runtime for deployment steps.
//!
//! Pure selection and verification logic lives in `deploystep-core`; this
//! crate adds the step protocol, the correlation registry, remote submission,
//! retries and lifecycle events.

pub mod correlation;
pub mod delegate;
pub mod executor;
pub mod retry;
pub mod step;

pub use crate::correlation::CorrelationRegistry;
pub use crate::delegate::{ChannelExecutor, ExecutorMessage, RemoteExecutor, SubmitError};
pub use crate::executor::{
    AbortReason, DeliveryReport, EngineConfig, Event, EventSink, RunnerError, StepRunner,
};
pub use crate::step::kinds::StepSpec;
pub use crate::step::{DeploymentStep, ExecutionContext, Step, StepContext, StepOutcome};
