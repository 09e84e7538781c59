#![forbid(unsafe_code)]

//! Vocabulary and pure decision logic for deployment steps.
//!
//! Nothing in this crate performs I/O; the async protocol lives in `deploystep-exec`.

pub mod error;
pub mod expressions;
pub mod flags;
pub mod selection;
pub mod types;
pub mod verification;

pub use crate::error::{FailureClass, RegistryError, StepError};
pub use crate::expressions::{ExpressionRenderer, IdentityRenderer, VariableRenderer};
pub use crate::flags::{FeatureFlags, StaticFeatureFlags};
pub use crate::selection::{NodeSelector, SelectionRules};
pub use crate::types::{
    CorrelationId, Instance, Outcome, RemoteTaskHandle, ResultEnvelope, SelectionRequest,
    SelectionResult, Status,
};
pub use crate::verification::{evaluate, resolve_baseline, Baseline};
