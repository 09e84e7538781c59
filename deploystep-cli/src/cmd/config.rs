use deploystep_exec::EngineConfig;

use crate::error::CliError;
use crate::exit_codes;
use crate::output::print_result;
use crate::OutputArgs;

pub fn config_cmd(config: &EngineConfig, output: &OutputArgs) -> Result<i32, CliError> {
    print_result(output.format, output.quiet, config);
    Ok(exit_codes::SUCCESS)
}
