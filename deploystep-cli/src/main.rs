use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod cmd;
mod commands;
mod error;
mod exit_codes;
mod output;
mod utils;

pub use args::*;
use commands::Command;
use output::print_error;

#[derive(Debug, Parser)]
#[command(name = "deploystep", version, about = "Deployment step selection, verification and simulation")]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,
    #[command(flatten)]
    config: ConfigArgs,
    #[command(subcommand)]
    command: Command,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            print_error(
                cli.output.format,
                cli.output.quiet,
                &format!("failed to create tokio runtime: {e}"),
            );
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let output = cli.output.clone();
    let exit_code = match rt.block_on(run_command(cli)) {
        Ok(code) => code,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            e.exit_code()
        }
    };
    std::process::exit(exit_code);
}

async fn run_command(cli: Cli) -> Result<i32, error::CliError> {
    let config = utils::load_config(cli.config.config.as_deref())?;
    let output = &cli.output;
    match cli.command {
        Command::Select {
            pool,
            request,
            exclude,
            phase,
            set,
            account,
        } => cmd::select::select_cmd(
            &config,
            output,
            cmd::select::SelectArgs {
                pool: &pool,
                request: &request,
                exclude,
                phase: phase.into(),
                set: &set,
                account: &account.account,
            },
        ),
        Command::Traffic { percent, account } => {
            cmd::traffic::traffic_cmd(&config, output, percent, &account.account)
        }
        Command::Verify {
            analysis,
            history,
            baseline,
            execution,
            scope,
            tolerance,
            mode,
            strategy,
        } => cmd::verify::verify_cmd(
            output,
            cmd::verify::VerifyArgs {
                analysis: &analysis,
                history: history.as_deref(),
                baseline: baseline.as_deref(),
                execution: execution.as_deref(),
                scope,
                tolerance: tolerance.into(),
                mode: mode.into(),
                strategy: strategy.into(),
            },
        ),
        Command::Simulate { plan } => cmd::simulate::simulate_cmd(config, output, &plan).await,
        Command::Config => cmd::config::config_cmd(&config, output),
    }
}
