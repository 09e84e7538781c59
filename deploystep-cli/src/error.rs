use crate::exit_codes;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Unreadable or malformed input files and arguments.
    #[error("{0}")]
    Input(String),
    #[error("{0}")]
    Runtime(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input(_) => exit_codes::INVALID_INPUT,
            CliError::Runtime(_) => exit_codes::RUNTIME_ERROR,
        }
    }
}
