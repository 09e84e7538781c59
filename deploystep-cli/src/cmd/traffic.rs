use deploystep_core::flags::{FeatureFlags, RELAXED_TRAFFIC_SHIFT};
use deploystep_core::selection::check_traffic_shift;
use deploystep_exec::EngineConfig;
use serde_json::json;

use crate::error::CliError;
use crate::exit_codes;
use crate::output::print_result;
use crate::OutputArgs;

pub fn traffic_cmd(
    config: &EngineConfig,
    output: &OutputArgs,
    percent: u32,
    account: &str,
) -> Result<i32, CliError> {
    let relaxed = config.flags.is_enabled(RELAXED_TRAFFIC_SHIFT, account);
    let rules = &config.selection;
    let max = if relaxed {
        rules.relaxed_max_traffic_shift_percent
    } else {
        rules.max_traffic_shift_percent
    };

    match check_traffic_shift(percent, rules, relaxed) {
        Ok(()) => {
            print_result(
                output.format,
                output.quiet,
                &json!({ "percent": percent, "max": max, "allowed": true }),
            );
            Ok(exit_codes::SUCCESS)
        }
        Err(e) => {
            print_result(
                output.format,
                output.quiet,
                &json!({
                    "percent": percent,
                    "max": max,
                    "allowed": false,
                    "reason": e.to_string(),
                }),
            );
            Ok(exit_codes::STEP_FAILED)
        }
    }
}
