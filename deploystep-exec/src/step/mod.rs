//! The step capability interface and the closed set of deployment step kinds.

mod context;
pub mod kinds;

pub use context::{ExecutionContext, StepContext};
pub use kinds::DeploymentStep;

use std::collections::BTreeMap;

use async_trait::async_trait;
use deploystep_core::{CorrelationId, Outcome, RemoteTaskHandle, ResultEnvelope, StepError};

/// What a step asks of the runner after `begin` or `resume`.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Terminal. The outcome must not be a suspended one.
    Done(Outcome),
    /// Submit these tasks and resume once every result has arrived.
    Await(Vec<RemoteTaskHandle>),
}

/// One unit of deployment work driven by the `StepRunner`.
///
/// The runner never calls `begin` and `resume` concurrently for the same
/// execution. `resume` receives exactly the results for the ids of the
/// previous `Await`, each delivered at most once.
#[async_trait]
pub trait Step: Send {
    fn kind(&self) -> &'static str;

    async fn begin(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, StepError>;

    async fn resume(
        &mut self,
        ctx: &StepContext<'_>,
        results: BTreeMap<CorrelationId, ResultEnvelope>,
    ) -> Result<StepOutcome, StepError>;

    /// Best-effort notification when aborted while awaiting remote results.
    async fn on_abort(&mut self, _ctx: &StepContext<'_>) {}

    /// Discard partial state before `begin` is retried.
    fn cleanup(&mut self, _ctx: &StepContext<'_>) {}
}
