//! Job statuses reported by the try-on service.
//!
//! Transitions are owned by the remote service; the client only observes
//! them. Three statuses mean "keep polling", `completed` is terminal
//! success, and any other value (including ones this client has never
//! heard of) is terminal failure.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const STATUS_STARTING: &str = "starting";
pub const STATUS_IN_QUEUE: &str = "in_queue";
pub const STATUS_PROCESSING: &str = "processing";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

/// Observed status of a try-on job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Starting,
    InQueue,
    Processing,
    Completed,
    Failed,
    /// A value outside the known set. Treated as terminal failure.
    Other(String),
}

impl JobStatus {
    /// True while the job is still moving through the service and
    /// another poll is warranted.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            JobStatus::Starting | JobStatus::InQueue | JobStatus::Processing
        )
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobStatus::Completed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Starting => STATUS_STARTING,
            JobStatus::InQueue => STATUS_IN_QUEUE,
            JobStatus::Processing => STATUS_PROCESSING,
            JobStatus::Completed => STATUS_COMPLETED,
            JobStatus::Failed => STATUS_FAILED,
            JobStatus::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            STATUS_STARTING => JobStatus::Starting,
            STATUS_IN_QUEUE => JobStatus::InQueue,
            STATUS_PROCESSING => JobStatus::Processing,
            STATUS_COMPLETED => JobStatus::Completed,
            STATUS_FAILED => JobStatus::Failed,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        JobStatus::from(s.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
