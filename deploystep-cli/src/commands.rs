use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Choose the instances a deployment phase acts on.
    Select {
        /// Instance pool (JSON or YAML list).
        #[arg(long)]
        pool: PathBuf,
        /// Selection request (JSON or YAML).
        #[arg(long)]
        request: PathBuf,
        /// Instance ids already used by earlier phases.
        #[arg(long = "exclude", value_name = "ID")]
        exclude: Vec<String>,
        #[arg(long, value_enum, default_value_t = PhaseArg::Canary)]
        phase: PhaseArg,
        /// Variables for host expressions.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        #[command(flatten)]
        account: AccountArgs,
    },
    /// Check a traffic-shift percentage against the configured bounds.
    Traffic {
        #[arg(long)]
        percent: u32,
        #[command(flatten)]
        account: AccountArgs,
    },
    /// Resolve the baseline and decide a verification verdict.
    Verify {
        /// Per-metric risk of the current execution (JSON or YAML).
        #[arg(long)]
        analysis: PathBuf,
        /// Prior executions (JSON or YAML list).
        #[arg(long)]
        history: Option<PathBuf>,
        /// Pin the baseline execution.
        #[arg(long)]
        baseline: Option<String>,
        /// Execution being verified; excluded from baseline candidates.
        #[arg(long)]
        execution: Option<String>,
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, value_enum, default_value_t = ToleranceArg::Medium)]
        tolerance: ToleranceArg,
        #[arg(long, value_enum, default_value_t = ModeArg::Lenient)]
        mode: ModeArg,
        #[arg(long, value_enum, default_value_t = StrategyArg::Previous)]
        strategy: StrategyArg,
    },
    /// Run a scripted plan of steps against simulated remote results.
    Simulate {
        plan: PathBuf,
    },
    /// Print the effective engine configuration.
    Config,
}
