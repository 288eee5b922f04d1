//! `tryon` -- run a virtual try-on from the command line.
//!
//! Uploads the two images, submits the job, polls until it finishes and
//! prints the result URL. Ctrl-C cancels the attempt.
//!
//! Collaborator settings come from the environment (see
//! [`tryon_client::config`]); `TRYON_API_KEY`, `UPLOAD_CLOUD_NAME` and
//! `UPLOAD_PRESET` are required.

use std::process::ExitCode;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tryon_cli::{progress_line, run, Cli};
use tryon_client::config::ClientConfig;
use tryon_client::workflow::TryOnWorkflow;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tryon_cli=info,tryon_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let workflow = TryOnWorkflow::from_config(&config);

    // Print progress as it happens.
    let mut events = workflow.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = progress_line(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "Progress output lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C, cancelling");
            ctrl_c_cancel.cancel();
        }
    });

    let result = run(&cli, &workflow, &cancel).await;
    drop(workflow);
    let _ = printer.await;

    match result {
        Ok(outcome) => {
            println!("Generated try-on result: {}", outcome.output_url);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
