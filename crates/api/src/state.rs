use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tryon_client::workflow::TryOnWorkflow;
use tryon_core::preview::PreviewStore;

use crate::config::ServerConfig;
use crate::sessions::SessionRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Upload, submit and poll orchestration shared by every session.
    pub workflow: Arc<TryOnWorkflow>,
    /// Live sessions keyed by id.
    pub sessions: Arc<SessionRegistry>,
    /// Preview bytes served back to the page.
    pub previews: PreviewStore,
    /// Master cancellation token; cancelled during shutdown.
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(config: ServerConfig, workflow: TryOnWorkflow) -> Self {
        Self {
            config: Arc::new(config),
            workflow: Arc::new(workflow),
            sessions: Arc::new(SessionRegistry::new()),
            previews: PreviewStore::new(),
            cancel: CancellationToken::new(),
        }
    }
}
