//! Local-only image previews with scoped lifetimes.
//!
//! A preview is acquired when an image is selected and lives exactly as
//! long as the returned [`PreviewGuard`]. Dropping the guard (because a
//! new file replaced the selection, or the owning session went away)
//! releases the preview, so long-lived servers do not accumulate stale
//! image bytes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::selection::SelectedImage;

/// Bytes and content type served for a live preview.
#[derive(Debug, Clone)]
pub struct PreviewEntry {
    pub content_type: String,
    pub bytes: Arc<[u8]>,
}

/// Registry of live previews, shared between sessions and the handler
/// that serves preview bytes.
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    entries: Arc<Mutex<HashMap<Uuid, PreviewEntry>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a preview for `image`. The preview is released when the
    /// returned guard is dropped.
    pub fn acquire(&self, image: &SelectedImage) -> PreviewGuard {
        let id = Uuid::new_v4();
        let entry = PreviewEntry {
            content_type: image.content_type.clone(),
            bytes: Arc::from(image.bytes.as_slice()),
        };
        self.lock().insert(id, entry);
        tracing::debug!(preview_id = %id, role = %image.role, "Preview acquired");

        PreviewGuard {
            id,
            store: self.clone(),
        }
    }

    /// Look up a live preview.
    pub fn get(&self, id: Uuid) -> Option<PreviewEntry> {
        self.lock().get(&id).cloned()
    }

    /// Number of live previews.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn release(&self, id: Uuid) {
        if self.lock().remove(&id).is_some() {
            tracing::debug!(preview_id = %id, "Preview released");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, PreviewEntry>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Ownership of one live preview. Releases it on drop.
#[derive(Debug)]
pub struct PreviewGuard {
    id: Uuid,
    store: PreviewStore,
}

impl PreviewGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for PreviewGuard {
    fn drop(&mut self) {
        self.store.release(self.id);
    }
}
