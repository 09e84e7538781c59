use std::collections::BTreeMap;

use async_trait::async_trait;
use deploystep_core::types::Payload;
use deploystep_core::{CorrelationId, Outcome, RemoteTaskHandle, ResultEnvelope, StepError};
use serde_json::json;

use crate::step::kinds::{remote_task, require, single_payload, unexpected_phase};
use crate::step::{Step, StepContext, StepOutcome};

pub const TASK_GIT_FETCH: &str = "git.fetch";
pub const TASK_SCRIPT_EXEC: &str = "script.exec";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GitSource {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptShell {
    #[default]
    Bash,
    PowerShell,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunScriptConfig {
    pub script: String,
    /// When set, the script runs against a fresh checkout fetched first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<GitSource>,
    #[serde(default)]
    pub shell: ScriptShell,
    #[serde(default, rename = "workingDirectory", skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default, rename = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptPhase {
    #[default]
    Pending,
    GitFetch,
    RemoteExec,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptData {
    pub phase: ScriptPhase,
    pub commit_id: Option<String>,
    pub output: Option<Payload>,
}

/// Runs a script remotely, optionally after a git fetch leg.
#[derive(Debug)]
pub struct RunScriptStep {
    config: RunScriptConfig,
    data: ScriptData,
}

impl RunScriptStep {
    pub fn new(config: RunScriptConfig) -> Self {
        Self {
            config,
            data: ScriptData::default(),
        }
    }

    pub fn data(&self) -> &ScriptData {
        &self.data
    }

    fn exec_task(&self, ctx: &StepContext<'_>) -> Result<RemoteTaskHandle, StepError> {
        let script = require(ctx.render(&self.config.script), "Script must not be blank")?;
        let working_directory = self
            .config
            .working_directory
            .as_deref()
            .map(|d| ctx.render(d));
        Ok(remote_task(
            ctx,
            TASK_SCRIPT_EXEC,
            json!({
                "script": script,
                "shell": self.config.shell,
                "workingDirectory": working_directory,
                "commitId": self.data.commit_id,
            }),
            self.config.timeout_ms,
        ))
    }
}

#[async_trait]
impl Step for RunScriptStep {
    fn kind(&self) -> &'static str {
        "run_script"
    }

    async fn begin(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, StepError> {
        // A blank script must fail before the fetch leg.
        require(ctx.render(&self.config.script), "Script must not be blank")?;

        let Some(repo) = &self.config.repository else {
            let task = self.exec_task(ctx)?;
            self.data.phase = ScriptPhase::RemoteExec;
            return Ok(StepOutcome::Await(vec![task]));
        };

        let url = require(ctx.render(&repo.url), "Repository url must not be blank")?;
        let branch = repo.branch.as_deref().map(|b| ctx.render(b));
        let task = remote_task(
            ctx,
            TASK_GIT_FETCH,
            json!({ "url": url, "branch": branch }),
            self.config.timeout_ms,
        );
        self.data.phase = ScriptPhase::GitFetch;
        Ok(StepOutcome::Await(vec![task]))
    }

    async fn resume(
        &mut self,
        ctx: &StepContext<'_>,
        results: BTreeMap<CorrelationId, ResultEnvelope>,
    ) -> Result<StepOutcome, StepError> {
        match self.data.phase {
            ScriptPhase::GitFetch => {
                let fetched = single_payload(results)?;
                self.data.commit_id = fetched
                    .get("commitId")
                    .and_then(|c| c.as_str())
                    .map(str::to_string);
                let task = self.exec_task(ctx)?;
                self.data.phase = ScriptPhase::RemoteExec;
                Ok(StepOutcome::Await(vec![task]))
            }
            ScriptPhase::RemoteExec => {
                let output = single_payload(results)?;
                let exit_code = output.get("exitCode").and_then(|c| c.as_i64());
                if let Some(code) = exit_code.filter(|c| *c != 0) {
                    return Err(StepError::remote(format!("Script exited with code {code}")));
                }
                self.data.output = Some(output.clone());
                self.data.phase = ScriptPhase::Done;
                Ok(StepOutcome::Done(Outcome::success().with_payload(json!({
                    "commitId": self.data.commit_id,
                    "output": output,
                }))))
            }
            phase => Err(unexpected_phase(self.kind(), phase)),
        }
    }

    fn cleanup(&mut self, _ctx: &StepContext<'_>) {
        self.data = ScriptData::default();
    }
}
