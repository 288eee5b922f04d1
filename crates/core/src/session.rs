//! Per-user try-on session state machine.
//!
//! A session owns the two image selections, the chosen category and the
//! outcome of the latest attempt. Only one attempt may be in flight at a
//! time; [`TryOnSession::begin_attempt`] validates the inputs and flips
//! `loading`, and every terminal transition clears it again.
//!
//! ```text
//! Idle -> Uploading -> Submitting -> Polling -> Completed
//!            |             |            |
//!            +-------------+------------+----> Failed
//! ```

use serde::Serialize;
use uuid::Uuid;

use crate::category::Category;
use crate::error::CoreError;
use crate::preview::{PreviewGuard, PreviewStore};
use crate::selection::{require_both, ImageRole, SelectedImage};
use crate::types::{JobId, Timestamp};

/// Reason recorded when an in-flight attempt is cancelled.
pub const CANCELLED_REASON: &str = "Try-on was cancelled";

/// Where the latest attempt stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionPhase {
    /// No attempt has been started yet.
    Idle,
    Uploading,
    Submitting,
    Polling {
        job_id: JobId,
        /// Status checks issued so far.
        attempts: u32,
    },
    Completed {
        output_url: String,
    },
    Failed {
        reason: String,
    },
}

impl SessionPhase {
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SessionPhase::Uploading | SessionPhase::Submitting | SessionPhase::Polling { .. }
        )
    }
}

/// Inputs captured for one attempt. Owned copies, so the session may
/// change its selection while the attempt runs.
#[derive(Debug, Clone)]
pub struct AttemptInputs {
    /// Correlates progress reports back to this attempt.
    pub attempt_id: Uuid,
    pub model: SelectedImage,
    pub garment: SelectedImage,
    pub category: Category,
}

/// A selected image together with its live preview.
#[derive(Debug)]
struct SelectedSlot {
    image: SelectedImage,
    preview: PreviewGuard,
}

/// Ephemeral state for one user working through the try-on flow.
#[derive(Debug)]
pub struct TryOnSession {
    id: Uuid,
    created_at: Timestamp,
    category: Category,
    model: Option<SelectedSlot>,
    garment: Option<SelectedSlot>,
    phase: SessionPhase,
    loading: bool,
    /// Attempt currently in flight, if any.
    current_attempt: Option<Uuid>,
    result_url: Option<String>,
    error: Option<String>,
}

impl TryOnSession {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            created_at: chrono::Utc::now(),
            category: Category::default(),
            model: None,
            garment: None,
            phase: SessionPhase::Idle,
            loading: false,
            current_attempt: None,
            result_url: None,
            error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn image(&self, role: ImageRole) -> Option<&SelectedImage> {
        self.slot(role).as_ref().map(|s| &s.image)
    }

    /// Id of the live preview for `role`, if an image is selected.
    pub fn preview_id(&self, role: ImageRole) -> Option<Uuid> {
        self.slot(role).as_ref().map(|s| s.preview.id())
    }

    /// Select an image for its role, replacing (and releasing the preview
    /// of) any earlier selection. Returns the new preview id.
    pub fn select_image(&mut self, image: SelectedImage, previews: &PreviewStore) -> Uuid {
        let preview = previews.acquire(&image);
        let preview_id = preview.id();
        let role = image.role;
        *self.slot_mut(role) = Some(SelectedSlot { image, preview });
        preview_id
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;
    }

    /// Start a new attempt.
    ///
    /// Fails with [`CoreError::Conflict`] while another attempt is in
    /// flight and with [`CoreError::Validation`] when either image is
    /// missing. On failure the session is left untouched.
    pub fn begin_attempt(&mut self) -> Result<AttemptInputs, CoreError> {
        if self.loading {
            return Err(CoreError::Conflict(
                "A try-on is already in progress for this session".to_string(),
            ));
        }

        let (model, garment) =
            require_both(self.image(ImageRole::Model), self.image(ImageRole::Garment))?;
        let inputs = AttemptInputs {
            attempt_id: Uuid::new_v4(),
            model: model.clone(),
            garment: garment.clone(),
            category: self.category,
        };

        self.loading = true;
        self.current_attempt = Some(inputs.attempt_id);
        self.phase = SessionPhase::Uploading;
        self.result_url = None;
        self.error = None;
        Ok(inputs)
    }

    /// Attempt currently in flight, if any.
    pub fn current_attempt(&self) -> Option<Uuid> {
        self.current_attempt
    }

    /// Record a non-terminal transition of `attempt_id`.
    ///
    /// Ignored unless `attempt_id` is the attempt in flight, so late
    /// reports from a cancelled or finished attempt cannot rewind state.
    pub fn advance(&mut self, attempt_id: Uuid, phase: SessionPhase) {
        if !self.is_current(attempt_id) || !phase.is_in_flight() {
            return;
        }
        self.phase = phase;
    }

    /// Terminal success: show the result and clear `loading`.
    pub fn complete(&mut self, attempt_id: Uuid, output_url: String) {
        if !self.is_current(attempt_id) {
            return;
        }
        self.finish();
        self.result_url = Some(output_url.clone());
        self.error = None;
        self.phase = SessionPhase::Completed { output_url };
    }

    /// Terminal failure: surface `reason`, show no result, clear `loading`.
    pub fn fail(&mut self, attempt_id: Uuid, reason: impl Into<String>) {
        if !self.is_current(attempt_id) {
            return;
        }
        let reason = reason.into();
        self.finish();
        self.result_url = None;
        self.error = Some(reason.clone());
        self.phase = SessionPhase::Failed { reason };
    }

    /// Abandon the in-flight attempt, if any.
    ///
    /// Returns `true` when an attempt was running.
    pub fn cancel(&mut self) -> bool {
        match self.current_attempt {
            Some(attempt_id) => {
                self.fail(attempt_id, CANCELLED_REASON);
                true
            }
            None => false,
        }
    }

    fn is_current(&self, attempt_id: Uuid) -> bool {
        self.loading && self.current_attempt == Some(attempt_id)
    }

    fn finish(&mut self) {
        self.loading = false;
        self.current_attempt = None;
    }

    fn slot(&self, role: ImageRole) -> &Option<SelectedSlot> {
        match role {
            ImageRole::Model => &self.model,
            ImageRole::Garment => &self.garment,
        }
    }

    fn slot_mut(&mut self, role: ImageRole) -> &mut Option<SelectedSlot> {
        match role {
            ImageRole::Model => &mut self.model,
            ImageRole::Garment => &mut self.garment,
        }
    }
}
