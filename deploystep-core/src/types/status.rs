use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Running,
    Success,
    Failed,
    Error,
    Skipped,
    Aborted,
    Rejected,
    Queued,
}

impl Status {
    /// `Running` is the only placeholder a suspended step may carry.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Running)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success | Status::Skipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Running => "RUNNING",
            Status::Success => "SUCCESS",
            Status::Failed => "FAILED",
            Status::Error => "ERROR",
            Status::Skipped => "SKIPPED",
            Status::Aborted => "ABORTED",
            Status::Rejected => "REJECTED",
            Status::Queued => "QUEUED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
