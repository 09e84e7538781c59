use std::path::Path;

use deploystep_core::flags::{FeatureFlags, INLINE_HOSTS};
use deploystep_core::types::{Instance, PhaseStyle};
use deploystep_core::{NodeSelector, SelectionRequest, SelectionResult, VariableRenderer};
use deploystep_exec::EngineConfig;

use crate::error::CliError;
use crate::exit_codes;
use crate::output::print_result;
use crate::utils::{load_document, parse_set};
use crate::OutputArgs;

pub struct SelectArgs<'a> {
    pub pool: &'a Path,
    pub request: &'a Path,
    pub exclude: Vec<String>,
    pub phase: PhaseStyle,
    pub set: &'a [String],
    pub account: &'a str,
}

pub fn select_cmd(
    config: &EngineConfig,
    output: &OutputArgs,
    args: SelectArgs<'_>,
) -> Result<i32, CliError> {
    let pool: Vec<Instance> = load_document(args.pool)?;
    let mut request: SelectionRequest = load_document(args.request)?;
    request.exclude_instance_ids.extend(args.exclude);
    let renderer = VariableRenderer::new(parse_set(args.set)?);

    let result = NodeSelector::new(&renderer, &config.selection)
        .allow_inline_hosts(config.flags.is_enabled(INLINE_HOSTS, args.account))
        .select(&pool, &request, args.phase);

    tracing::info!(
        selected = result.selected.len(),
        target = result.target_count,
        rejected = result.rejected,
        "selection finished"
    );
    print_result(output.format, output.quiet, &result);

    Ok(if is_fatal(&result, request.specific_hosts.is_some()) {
        exit_codes::STEP_FAILED
    } else {
        exit_codes::SUCCESS
    })
}

fn is_fatal(result: &SelectionResult, explicit_hosts: bool) -> bool {
    let reported = result.error_message.is_some();
    result.rejected
        || (explicit_hosts && reported)
        || (result.is_empty() && (result.target_count > 0 || reported))
}
