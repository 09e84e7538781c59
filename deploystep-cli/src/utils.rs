use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use deploystep_exec::EngineConfig;
use serde::de::DeserializeOwned;

use crate::error::CliError;

pub const CONFIG_ENV: &str = "DEPLOYSTEP_CONFIG";

/// Read a JSON or YAML document. JSON is tried first.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Input(format!("failed to read {}: {e}", path.display())))?;
    if let Ok(v) = serde_json::from_str(&content) {
        return Ok(v);
    }
    serde_yaml::from_str(&content)
        .map_err(|e| CliError::Input(format!("{} is neither valid JSON nor YAML: {e}", path.display())))
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading engine configuration");
            load_document(&path)
        }
        None => Ok(EngineConfig::default()),
    }
}

pub fn parse_set(pairs: &[String]) -> Result<BTreeMap<String, String>, CliError> {
    pairs
        .iter()
        .map(|s| {
            s.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| CliError::Input(format!("expected KEY=VALUE, got '{s}'")))
        })
        .collect()
}
