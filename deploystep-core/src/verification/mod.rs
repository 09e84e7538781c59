//! Baseline resolution and pass/fail decisions for canary and rolling verification.
//!
//! Everything here is a pure function of its inputs so verdicts replay exactly.

mod baseline;
mod decision;

pub use baseline::{resolve_baseline, Baseline};
pub use decision::{decide_verdict, evaluate, MSG_NO_BASELINE};
