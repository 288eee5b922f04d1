//! Job status polling until a terminal status is observed.
//!
//! The first check is issued immediately; later checks wait according
//! to the [`PollPolicy`]. Polling continues exactly while the service
//! reports `starting`, `in_queue` or `processing`, and stops early when
//! the [`CancellationToken`] fires or the attempt budget runs out.

use tokio_util::sync::CancellationToken;
use tryon_core::job_status::JobStatus;
use tryon_core::polling::PollPolicy;
use tryon_core::types::JobId;

use crate::api::{TryOnApiError, TryOnService};

/// Why polling ended without a result image.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// A status request failed.
    #[error(transparent)]
    Api(#[from] TryOnApiError),

    /// The service reported a terminal status other than `completed`.
    #[error("Prediction failed: {reason}")]
    JobFailed {
        status: JobStatus,
        /// The service's error, or the status itself when none was given.
        reason: String,
    },

    /// `completed` arrived with an empty `output` list.
    #[error("Prediction completed without an output image")]
    MissingOutput,

    /// The job was still pending after the last allowed check.
    #[error("Prediction still pending after {attempts} status checks")]
    Exhausted { attempts: u32 },

    #[error("Polling was cancelled")]
    Cancelled,
}

/// Poll `job_id` until it reaches a terminal status.
///
/// `on_status` is invoked with every observed status and the 1-based
/// check number. Returns the first output URL on `completed`.
pub async fn poll_until_terminal<F>(
    service: &dyn TryOnService,
    job_id: &JobId,
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut on_status: F,
) -> Result<String, PollError>
where
    F: FnMut(&JobStatus, u32) + Send,
{
    let mut delay = policy.interval;

    for attempt in 1..=policy.max_attempts {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job_id, attempt, "Polling cancelled");
                return Err(PollError::Cancelled);
            }
            result = service.status(job_id) => result?,
        };

        on_status(&response.status, attempt);

        match &response.status {
            status if status.is_pending() => {
                tracing::debug!(job_id = %job_id, %status, attempt, "Prediction status");
            }
            JobStatus::Completed => {
                return match response.first_output() {
                    Some(url) => {
                        tracing::info!(job_id = %job_id, attempt, output_url = %url, "Prediction completed");
                        Ok(url.to_string())
                    }
                    None => {
                        tracing::warn!(job_id = %job_id, "Prediction completed without output");
                        Err(PollError::MissingOutput)
                    }
                };
            }
            status => {
                let reason = response
                    .error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| status.to_string());
                tracing::warn!(job_id = %job_id, %status, error = %reason, "Prediction failed");
                return Err(PollError::JobFailed {
                    status: status.clone(),
                    reason,
                });
            }
        }

        if attempt == policy.max_attempts {
            break;
        }

        // Wait before the next check, respecting cancellation.
        tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        delay = policy.next_delay(delay);
    }

    tracing::warn!(job_id = %job_id, attempts = policy.max_attempts, "Gave up polling");
    Err(PollError::Exhausted {
        attempts: policy.max_attempts,
    })
}
