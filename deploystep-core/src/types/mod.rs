mod common;
mod correlation;
mod history;
mod instance;
mod outcome;
mod remote;
mod status;
mod verification;

pub use common::{Payload, Variables};
pub use correlation::CorrelationId;
pub use history::{BaselineScope, ExecutionRecord};
pub use instance::{
    CountUnit, Instance, PhaseStyle, PoolProvisioning, SelectionRequest, SelectionResult,
};
pub use outcome::{FailureType, Outcome};
pub use remote::{RemoteStatus, RemoteTaskHandle, ResultEnvelope};
pub use status::Status;
pub use verification::{
    ComparisonStrategy, MetricAnalysis, RiskLevel, Tolerance, Verdict, VerificationContext,
    VerificationMode,
};
