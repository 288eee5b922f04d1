//! REST client for the try-on service.
//!
//! Wraps job submission (`POST /run`) and status retrieval
//! (`GET /status/{id}`) using [`reqwest`]. Every request carries the
//! static bearer credential from [`TryOnConfig`].

use async_trait::async_trait;
use tryon_core::types::JobId;

use crate::config::TryOnConfig;
use crate::messages::{StatusResponse, SubmitRequest, SubmitResponse};

/// Message used when a failed submission carries no explanation.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Job submission and status lookup against a try-on backend.
#[async_trait]
pub trait TryOnService: Send + Sync {
    /// Queue a job and return its id.
    async fn submit(&self, request: &SubmitRequest) -> Result<JobId, TryOnApiError>;

    /// Fetch the current status of a job.
    async fn status(&self, job_id: &JobId) -> Result<StatusResponse, TryOnApiError>;
}

/// Errors from the try-on REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum TryOnApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("API Error: {message}")]
    ApiError { status: u16, message: String },

    /// The body was not the JSON we expected.
    #[error("Try-on response could not be parsed: {0}")]
    Decode(#[from] serde_json::Error),

    /// Submission succeeded at the HTTP level but returned no job id.
    #[error("Failed to start the try-on process")]
    MissingJobId,

    /// The configured base URL cannot have path segments appended.
    #[error("Invalid try-on base URL '{0}'")]
    InvalidBaseUrl(String),
}

/// HTTP client for the try-on service.
pub struct TryOnApi {
    client: reqwest::Client,
    config: TryOnConfig,
}

impl TryOnApi {
    pub fn new(config: TryOnConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for sharing a connection pool with the upload client).
    pub fn with_client(client: reqwest::Client, config: TryOnConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// `{base}/status/{job_id}` with the id encoded as one path segment.
    fn status_url(&self, job_id: &JobId) -> Result<reqwest::Url, TryOnApiError> {
        let invalid = || TryOnApiError::InvalidBaseUrl(self.config.base_url.clone());
        let mut url = reqwest::Url::parse(&self.config.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push("status")
            .push(job_id.as_str());
        Ok(url)
    }

    // ---- private helpers ----

    /// Read the body and return it with the status code.
    async fn read_body(
        response: reqwest::Response,
    ) -> Result<(reqwest::StatusCode, String), TryOnApiError> {
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl TryOnService for TryOnApi {
    async fn submit(&self, request: &SubmitRequest) -> Result<JobId, TryOnApiError> {
        tracing::debug!(
            model_image = %request.model_image,
            garment_image = %request.garment_image,
            category = %request.category,
            "Submitting try-on job",
        );

        let response = self
            .client
            .post(self.url("run"))
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        let (status, body) = Self::read_body(response).await?;

        if !status.is_success() {
            let message = serde_json::from_str::<SubmitResponse>(&body)
                .ok()
                .and_then(|r| r.failure_message())
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
            tracing::warn!(status = status.as_u16(), message = %message, "Try-on submission rejected");
            return Err(TryOnApiError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SubmitResponse = serde_json::from_str(&body)?;
        let job_id = parsed
            .id
            .filter(|id| !id.is_empty())
            .map(JobId::new)
            .ok_or(TryOnApiError::MissingJobId)?;

        tracing::info!(job_id = %job_id, "Try-on job started");
        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> Result<StatusResponse, TryOnApiError> {
        let response = self
            .client
            .get(self.status_url(job_id)?)
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let (status, body) = Self::read_body(response).await?;

        if !status.is_success() {
            let message = serde_json::from_str::<SubmitResponse>(&body)
                .ok()
                .and_then(|r| r.failure_message())
                .unwrap_or(body);
            return Err(TryOnApiError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
