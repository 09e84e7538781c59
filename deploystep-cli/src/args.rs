use std::path::PathBuf;

use clap::{Args, ValueEnum};
use deploystep_core::types::{ComparisonStrategy, PhaseStyle, Tolerance, VerificationMode};

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    /// Engine configuration (YAML or JSON). Falls back to DEPLOYSTEP_CONFIG.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct AccountArgs {
    /// Account used for feature-flag lookups.
    #[arg(long, default_value = "")]
    pub account: String,
}

#[derive(Debug, Args, Clone)]
pub struct ScopeArgs {
    #[arg(long)]
    pub workflow: String,
    #[arg(long)]
    pub service: String,
    #[arg(long)]
    pub infra: String,
    #[arg(long = "env")]
    pub environment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    Rolling,
    Canary,
    Basic,
}

impl From<PhaseArg> for PhaseStyle {
    fn from(value: PhaseArg) -> Self {
        match value {
            PhaseArg::Rolling => PhaseStyle::Rolling,
            PhaseArg::Canary => PhaseStyle::Canary,
            PhaseArg::Basic => PhaseStyle::Basic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ToleranceArg {
    Low,
    Medium,
    High,
}

impl From<ToleranceArg> for Tolerance {
    fn from(value: ToleranceArg) -> Self {
        match value {
            ToleranceArg::Low => Tolerance::Low,
            ToleranceArg::Medium => Tolerance::Medium,
            ToleranceArg::High => Tolerance::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Lenient,
    Strict,
}

impl From<ModeArg> for VerificationMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Lenient => VerificationMode::Lenient,
            ModeArg::Strict => VerificationMode::Strict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Previous,
    Current,
}

impl From<StrategyArg> for ComparisonStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Previous => ComparisonStrategy::CompareWithPrevious,
            StrategyArg::Current => ComparisonStrategy::CompareWithCurrent,
        }
    }
}
