use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a generation job.
///
/// Transitions are monotonic along pending -> processing -> {completed,
/// failed}. A processing row goes back to pending only through startup
/// recovery or an explicit manual retry reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("Unknown job status: {}", other)),
        }
    }
}

/// A single unit of asynchronous generation work.
///
/// Rows are created in status pending with attempts = 0 by the catalogue's
/// CRUD layer and are never physically deleted by the queue engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// BIGSERIAL primary key; the total order is used for FIFO tie-break.
    pub id: i64,
    /// Selects the registered handler.
    #[serde(rename = "type")]
    pub job_type: String,
    /// Selects the downstream model variant and gates auto-eligibility.
    pub model: String,
    /// Opaque payload handed to the handler.
    pub prompt: String,
    pub status: JobStatus,
    /// Incremented exactly once per claim, before any external call.
    pub attempts: i32,
    pub response: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Read-only projection served to UI status polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusSummary {
    pub id: i64,
    pub status: JobStatus,
    pub error: Option<String>,
}
