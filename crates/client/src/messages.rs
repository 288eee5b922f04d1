//! Wire types for the image host and the try-on service.

use std::fmt;

use serde::{Deserialize, Serialize};
use tryon_core::category::Category;
use tryon_core::job_status::JobStatus;

/// Body of `POST /run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitRequest {
    pub model_image: String,
    pub garment_image: String,
    pub category: Category,
}

/// Response of `POST /run`.
///
/// The service answers with an `id` on success and a `message` (or an
/// `error`) otherwise; every field is optional so that a body missing
/// the id can be reported precisely instead of as a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

impl SubmitResponse {
    /// Best human-readable explanation carried by a failed submission.
    pub fn failure_message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error.as_ref().map(ToString::to_string))
    }
}

/// Response of `GET /status/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub status: JobStatus,
    /// Result image URLs, present once the job has completed.
    #[serde(default)]
    pub output: Option<Vec<String>>,
    /// Failure details, present once the job has failed.
    #[serde(default)]
    pub error: Option<ServiceError>,
}

impl StatusResponse {
    /// First output URL, which is the displayed result.
    pub fn first_output(&self) -> Option<&str> {
        self.output
            .as_deref()
            .and_then(|urls| urls.first())
            .map(String::as_str)
    }
}

/// Error payload reported by the try-on service. Seen both as a bare
/// string and as a `{name, message}` object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ServiceError {
    Message(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        message: String,
    },
    Other(serde_json::Value),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Message(msg) => f.write_str(msg),
            ServiceError::Detailed {
                name: Some(name),
                message,
            } => write!(f, "{name}: {message}"),
            ServiceError::Detailed { name: None, message } => f.write_str(message),
            ServiceError::Other(value) => write!(f, "{value}"),
        }
    }
}

/// Response of the image host's upload endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponse {
    /// Publicly reachable HTTPS URL of the stored image.
    #[serde(default)]
    pub secure_url: Option<String>,
    #[serde(default)]
    pub error: Option<UploadErrorBody>,
}

/// Error object returned by the image host.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadErrorBody {
    pub message: String,
}
