//! In-memory registry of live try-on sessions.
//!
//! Each session is stored together with its own [`CancellationToken`]
//! (a child of the server's master token). Removing a session cancels
//! that token, which stops any in-flight attempt at its next suspension
//! point, and drops the session, which releases its previews.
//!
//! Sessions that no client has touched for longer than the idle TTL are
//! reclaimed by [`SessionRegistry::remove_idle`], driven from
//! [`crate::background::session_sweeper`].
//!
//! Progress events from the shared [`TryOnWorkflow`](tryon_client::workflow::TryOnWorkflow)
//! are routed back to sessions by attempt id in [`run_event_listener`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tryon_client::events::TryOnEvent;
use tryon_client::workflow::{TryOnOutcome, WorkflowError};
use tryon_core::category::Category;
use tryon_core::error::CoreError;
use tryon_core::selection::{ImageRole, SelectedImage};
use tryon_core::session::{AttemptInputs, SessionPhase, TryOnSession};
use tryon_core::types::Timestamp;
use uuid::Uuid;

/// Client-facing snapshot of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub created_at: Timestamp,
    pub category: Category,
    pub phase: SessionPhase,
    pub loading: bool,
    pub result_url: Option<String>,
    pub error: Option<String>,
    pub model: Option<ImageView>,
    pub garment: Option<ImageView>,
}

/// A selected image as shown on the page.
#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
    /// Relative URL of the local preview; never sent to a collaborator.
    pub preview_url: String,
}

impl SessionView {
    pub fn from_session(session: &TryOnSession) -> Self {
        let image = |role: ImageRole| {
            let selected: &SelectedImage = session.image(role)?;
            let preview_id = session.preview_id(role)?;
            Some(ImageView {
                file_name: selected.file_name.clone(),
                content_type: selected.content_type.clone(),
                size: selected.len(),
                preview_url: preview_url(preview_id),
            })
        };

        Self {
            id: session.id(),
            created_at: session.created_at(),
            category: session.category(),
            phase: session.phase().clone(),
            loading: session.is_loading(),
            result_url: session.result_url().map(str::to_string),
            error: session.error().map(str::to_string),
            model: image(ImageRole::Model),
            garment: image(ImageRole::Garment),
        }
    }
}

pub fn preview_url(preview_id: Uuid) -> String {
    format!("/api/v1/previews/{preview_id}")
}

struct ManagedSession {
    session: TryOnSession,
    cancel: CancellationToken,
    /// Last client request against this session.
    last_seen: Instant,
}

impl ManagedSession {
    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Cancel the attempt token and mark any running attempt abandoned.
    /// Previews are released when `self` drops.
    fn discard(mut self, id: Uuid, reason: &'static str) {
        self.cancel.cancel();
        let abandoned = self.session.cancel();
        tracing::info!(session_id = %id, abandoned_attempt = abandoned, reason, "Session removed");
    }
}

/// A freshly started attempt, ready to be handed to the workflow.
pub struct StartedAttempt {
    pub inputs: AttemptInputs,
    pub cancel: CancellationToken,
    pub view: SessionView,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, ManagedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session whose token is a child of `parent`.
    pub async fn create(&self, parent: &CancellationToken) -> SessionView {
        let session = TryOnSession::new(Uuid::new_v4());
        let view = SessionView::from_session(&session);
        self.sessions.write().await.insert(
            view.id,
            ManagedSession {
                session,
                cancel: parent.child_token(),
                last_seen: Instant::now(),
            },
        );
        tracing::info!(session_id = %view.id, "Session created");
        view
    }

    pub async fn view(&self, id: Uuid) -> Result<SessionView, CoreError> {
        let mut sessions = self.sessions.write().await;
        let managed = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        managed.touch();
        Ok(SessionView::from_session(&managed.session))
    }

    /// Mutate a session under the write lock and return its new view.
    pub async fn update<F>(&self, id: Uuid, f: F) -> Result<SessionView, CoreError>
    where
        F: FnOnce(&mut TryOnSession) -> Result<(), CoreError>,
    {
        let mut sessions = self.sessions.write().await;
        let managed = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        managed.touch();
        f(&mut managed.session)?;
        Ok(SessionView::from_session(&managed.session))
    }

    /// Validate and start a new attempt for session `id`.
    pub async fn begin_attempt(&self, id: Uuid) -> Result<StartedAttempt, CoreError> {
        let mut sessions = self.sessions.write().await;
        let managed = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        managed.touch();
        let inputs = managed.session.begin_attempt()?;
        Ok(StartedAttempt {
            inputs,
            cancel: managed.cancel.clone(),
            view: SessionView::from_session(&managed.session),
        })
    }

    /// Apply the terminal outcome of an attempt.
    ///
    /// A session that was removed in the meantime is silently skipped.
    pub async fn finish(
        &self,
        session_id: Uuid,
        attempt_id: Uuid,
        result: &Result<TryOnOutcome, WorkflowError>,
    ) {
        let mut sessions = self.sessions.write().await;
        let Some(managed) = sessions.get_mut(&session_id) else {
            tracing::debug!(%session_id, %attempt_id, "Session gone before attempt finished");
            return;
        };
        match result {
            Ok(outcome) => managed
                .session
                .complete(attempt_id, outcome.output_url.clone()),
            Err(e) => managed.session.fail(attempt_id, e.to_string()),
        }
    }

    /// Remove a session, cancelling its in-flight attempt.
    pub async fn remove(&self, id: Uuid) -> Result<(), CoreError> {
        let managed = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| not_found(id))?;
        managed.discard(id, "deleted");
        Ok(())
    }

    /// Remove every session idle for longer than `idle_ttl`.
    ///
    /// Returns the number of sessions removed.
    pub async fn remove_idle(&self, idle_ttl: Duration) -> usize {
        let expired: Vec<(Uuid, ManagedSession)> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, m)| m.last_seen.elapsed() > idle_ttl)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|m| (id, m)))
                .collect()
        };

        let removed = expired.len();
        for (id, managed) in expired {
            managed.discard(id, "idle");
        }
        removed
    }

    /// Record a progress event against the session running its attempt.
    pub async fn apply_event(&self, event: &TryOnEvent) {
        let Some(phase) = phase_for(event) else {
            return;
        };
        let attempt_id = event.attempt_id();
        let mut sessions = self.sessions.write().await;
        if let Some(managed) = sessions
            .values_mut()
            .find(|m| m.session.current_attempt() == Some(attempt_id))
        {
            managed.session.advance(attempt_id, phase);
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Session phase implied by a non-terminal event.
///
/// Terminal events are applied by [`SessionRegistry::finish`] from the
/// attempt's return value instead.
fn phase_for(event: &TryOnEvent) -> Option<SessionPhase> {
    match event {
        TryOnEvent::UploadsStarted { .. } => Some(SessionPhase::Uploading),
        TryOnEvent::SubmittingJob { .. } => Some(SessionPhase::Submitting),
        TryOnEvent::JobSubmitted { job_id, .. } => Some(SessionPhase::Polling {
            job_id: job_id.clone(),
            attempts: 0,
        }),
        TryOnEvent::StatusObserved {
            job_id, attempt, ..
        } => Some(SessionPhase::Polling {
            job_id: job_id.clone(),
            attempts: *attempt,
        }),
        TryOnEvent::ImageUploaded { .. }
        | TryOnEvent::Completed { .. }
        | TryOnEvent::Failed { .. } => None,
    }
}

fn not_found(id: Uuid) -> CoreError {
    CoreError::NotFound {
        entity: "Session",
        id: id.to_string(),
    }
}

/// Forward workflow events to their sessions until `cancel` fires or the
/// channel closes.
pub async fn run_event_listener(
    registry: Arc<SessionRegistry>,
    mut receiver: broadcast::Receiver<TryOnEvent>,
    cancel: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = receiver.recv() => received,
        };
        match received {
            Ok(event) => registry.apply_event(&event).await,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Session event listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::info!("Session event listener stopped");
}
