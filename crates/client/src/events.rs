//! Progress events emitted by the try-on workflow.
//!
//! Every event carries the `attempt_id` of the attempt that produced it
//! so subscribers can correlate events back to a session. Events are
//! advisory: the terminal outcome is always returned by
//! [`TryOnWorkflow::run`](crate::workflow::TryOnWorkflow::run) as well.

use serde::Serialize;
use tryon_core::category::Category;
use tryon_core::job_status::JobStatus;
use tryon_core::selection::ImageRole;
use tryon_core::types::JobId;
use uuid::Uuid;

/// A workflow-level event for one attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TryOnEvent {
    /// Both images are being sent to the image host.
    UploadsStarted { attempt_id: Uuid },

    /// One image is now publicly hosted.
    ImageUploaded {
        attempt_id: Uuid,
        role: ImageRole,
        url: String,
    },

    /// Both URLs are known and the job is being submitted.
    SubmittingJob {
        attempt_id: Uuid,
        category: Category,
    },

    /// The try-on service accepted the job.
    JobSubmitted { attempt_id: Uuid, job_id: JobId },

    /// A status check returned.
    StatusObserved {
        attempt_id: Uuid,
        job_id: JobId,
        status: JobStatus,
        /// 1-based count of status checks so far.
        attempt: u32,
    },

    /// The job completed and produced a result image.
    Completed {
        attempt_id: Uuid,
        job_id: JobId,
        output_url: String,
    },

    /// The attempt ended without a result.
    Failed {
        attempt_id: Uuid,
        /// Human-readable error description.
        error: String,
    },
}

impl TryOnEvent {
    pub fn attempt_id(&self) -> Uuid {
        match self {
            TryOnEvent::UploadsStarted { attempt_id }
            | TryOnEvent::ImageUploaded { attempt_id, .. }
            | TryOnEvent::SubmittingJob { attempt_id, .. }
            | TryOnEvent::JobSubmitted { attempt_id, .. }
            | TryOnEvent::StatusObserved { attempt_id, .. }
            | TryOnEvent::Completed { attempt_id, .. }
            | TryOnEvent::Failed { attempt_id, .. } => *attempt_id,
        }
    }
}
