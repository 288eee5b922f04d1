//! End-to-end try-on orchestration.
//!
//! [`TryOnWorkflow`] drives one attempt from two selected images to a
//! result URL: both images are uploaded concurrently, the job is
//! submitted, and its status is polled until terminal. Progress is
//! broadcast as [`TryOnEvent`]s; call [`TryOnWorkflow::subscribe`] to
//! receive them.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tryon_core::polling::PollPolicy;
use tryon_core::selection::{ImageRole, SelectedImage};
use tryon_core::session::AttemptInputs;
use tryon_core::types::JobId;
use uuid::Uuid;

use crate::api::{TryOnApi, TryOnApiError, TryOnService};
use crate::config::ClientConfig;
use crate::events::TryOnEvent;
use crate::messages::SubmitRequest;
use crate::poller::{poll_until_terminal, PollError};
use crate::upload::{ImageHost, UploadApi, UploadApiError};

/// Broadcast channel capacity for workflow events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A successful attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TryOnOutcome {
    pub job_id: JobId,
    pub output_url: String,
    pub model_url: String,
    pub garment_url: String,
    /// Number of status checks it took to reach `completed`.
    pub poll_attempts: u32,
}

/// Why an attempt ended without a result.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Failed to upload {role} image: {source}")]
    Upload {
        role: ImageRole,
        #[source]
        source: UploadApiError,
    },

    #[error(transparent)]
    Submit(TryOnApiError),

    #[error(transparent)]
    Poll(PollError),

    #[error("Try-on was cancelled")]
    Cancelled,
}

impl WorkflowError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkflowError::Cancelled)
    }
}

impl From<PollError> for WorkflowError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Cancelled => WorkflowError::Cancelled,
            other => WorkflowError::Poll(other),
        }
    }
}

/// Uploads, submits and polls on behalf of any number of sessions.
///
/// Cheap to share behind an `Arc`; each call to [`run`](Self::run) is
/// independent.
pub struct TryOnWorkflow {
    host: Arc<dyn ImageHost>,
    service: Arc<dyn TryOnService>,
    policy: PollPolicy,
    event_tx: broadcast::Sender<TryOnEvent>,
}

impl TryOnWorkflow {
    pub fn new(
        host: Arc<dyn ImageHost>,
        service: Arc<dyn TryOnService>,
        policy: PollPolicy,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            host,
            service,
            policy,
            event_tx,
        }
    }

    /// Build the real HTTP collaborators from `config`, sharing one
    /// connection pool between them.
    pub fn from_config(config: &ClientConfig) -> Self {
        let client = reqwest::Client::new();
        let host = UploadApi::with_client(client.clone(), config.upload.clone());
        let service = TryOnApi::with_client(client, config.tryon.clone());
        Self::new(Arc::new(host), Arc::new(service), config.poll.clone())
    }

    /// Subscribe to progress events for all attempts.
    pub fn subscribe(&self) -> broadcast::Receiver<TryOnEvent> {
        self.event_tx.subscribe()
    }

    /// Run one attempt to completion.
    ///
    /// A terminal `Failed` event is emitted for every error, including
    /// cancellation.
    pub async fn run(
        &self,
        inputs: &AttemptInputs,
        cancel: &CancellationToken,
    ) -> Result<TryOnOutcome, WorkflowError> {
        let attempt_id = inputs.attempt_id;
        let result = self.run_inner(inputs, cancel).await;

        match &result {
            Ok(outcome) => {
                self.emit(TryOnEvent::Completed {
                    attempt_id,
                    job_id: outcome.job_id.clone(),
                    output_url: outcome.output_url.clone(),
                });
            }
            Err(e) => {
                if e.is_cancelled() {
                    tracing::info!(%attempt_id, "Try-on attempt cancelled");
                } else {
                    tracing::error!(%attempt_id, error = %e, "Try-on attempt failed");
                }
                self.emit(TryOnEvent::Failed {
                    attempt_id,
                    error: e.to_string(),
                });
            }
        }

        result
    }

    // ---- private helpers ----

    async fn run_inner(
        &self,
        inputs: &AttemptInputs,
        cancel: &CancellationToken,
    ) -> Result<TryOnOutcome, WorkflowError> {
        let attempt_id = inputs.attempt_id;

        self.emit(TryOnEvent::UploadsStarted { attempt_id });
        let (model_url, garment_url) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WorkflowError::Cancelled),
            urls = futures::future::try_join(
                self.upload(attempt_id, &inputs.model),
                self.upload(attempt_id, &inputs.garment),
            ) => urls?,
        };

        self.emit(TryOnEvent::SubmittingJob {
            attempt_id,
            category: inputs.category,
        });
        let request = SubmitRequest {
            model_image: model_url.clone(),
            garment_image: garment_url.clone(),
            category: inputs.category,
        };
        let job_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WorkflowError::Cancelled),
            result = self.service.submit(&request) => result.map_err(WorkflowError::Submit)?,
        };
        self.emit(TryOnEvent::JobSubmitted {
            attempt_id,
            job_id: job_id.clone(),
        });

        let mut poll_attempts = 0;
        let output_url = poll_until_terminal(
            self.service.as_ref(),
            &job_id,
            &self.policy,
            cancel,
            |status, attempt| {
                poll_attempts = attempt;
                self.emit(TryOnEvent::StatusObserved {
                    attempt_id,
                    job_id: job_id.clone(),
                    status: status.clone(),
                    attempt,
                });
            },
        )
        .await?;

        Ok(TryOnOutcome {
            job_id,
            output_url,
            model_url,
            garment_url,
            poll_attempts,
        })
    }

    async fn upload(&self, attempt_id: Uuid, image: &SelectedImage) -> Result<String, WorkflowError> {
        let url = self
            .host
            .upload(image)
            .await
            .map_err(|source| WorkflowError::Upload {
                role: image.role,
                source,
            })?;
        self.emit(TryOnEvent::ImageUploaded {
            attempt_id,
            role: image.role,
            url: url.clone(),
        });
        Ok(url)
    }

    fn emit(&self, event: TryOnEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}
