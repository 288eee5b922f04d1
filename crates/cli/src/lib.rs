//! Command-line front end for the try-on workflow.
//!
//! Runs a single attempt against two local files and reports progress
//! on stdout. The binary in `main.rs` wires this to the environment,
//! tracing and Ctrl-C.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tryon_client::events::TryOnEvent;
use tryon_client::workflow::{TryOnOutcome, TryOnWorkflow};
use tryon_core::category::Category;
use tryon_core::preview::PreviewStore;
use tryon_core::selection::{ImageRole, SelectedImage};
use tryon_core::session::TryOnSession;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "tryon", about = "Dress a model photo in a garment photo", version)]
pub struct Cli {
    /// Photo of the person wearing the garment.
    #[arg(long)]
    pub model: PathBuf,

    /// Photo of the garment.
    #[arg(long)]
    pub garment: PathBuf,

    /// tops, bottoms or one-pieces.
    #[arg(long, default_value = "tops")]
    pub category: Category,
}

/// Read an image from disk for `role`.
pub async fn load_image(path: &Path, role: ImageRole) -> anyhow::Result<SelectedImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {role} image {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{role}-image"));
    Ok(SelectedImage::new(role, file_name, None, bytes)?)
}

/// Run one attempt for the images named in `cli`.
///
/// Goes through the same session state machine as the server, so a
/// missing image fails validation before any network call.
pub async fn run(
    cli: &Cli,
    workflow: &TryOnWorkflow,
    cancel: &CancellationToken,
) -> anyhow::Result<TryOnOutcome> {
    let previews = PreviewStore::new();
    let mut session = TryOnSession::new(Uuid::new_v4());
    session.select_image(load_image(&cli.model, ImageRole::Model).await?, &previews);
    session.select_image(load_image(&cli.garment, ImageRole::Garment).await?, &previews);
    session.set_category(cli.category);

    let inputs = session.begin_attempt()?;
    tracing::info!(
        attempt_id = %inputs.attempt_id,
        category = %inputs.category,
        "Starting try-on",
    );

    match workflow.run(&inputs, cancel).await {
        Ok(outcome) => {
            session.complete(inputs.attempt_id, outcome.output_url.clone());
            Ok(outcome)
        }
        Err(e) => {
            session.fail(inputs.attempt_id, e.to_string());
            Err(e.into())
        }
    }
}

/// One line of user-facing progress for `event`, if it warrants one.
pub fn progress_line(event: &TryOnEvent) -> Option<String> {
    match event {
        TryOnEvent::UploadsStarted { .. } => Some("Uploading images...".to_string()),
        TryOnEvent::ImageUploaded { role, url, .. } => {
            Some(format!("Uploaded {role} image: {url}"))
        }
        TryOnEvent::SubmittingJob { category, .. } => {
            Some(format!("Submitting try-on ({})", category.label()))
        }
        TryOnEvent::JobSubmitted { job_id, .. } => Some(format!("Prediction started, ID: {job_id}")),
        TryOnEvent::StatusObserved {
            status, attempt, ..
        } => Some(format!("Prediction status: {status} (check {attempt})")),
        TryOnEvent::Completed { .. } | TryOnEvent::Failed { .. } => None,
    }
}
