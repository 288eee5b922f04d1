//! Client for the image host that turns local files into public URLs.
//!
//! Sends a multipart `POST` with the file plus the fixed
//! `upload_preset` and `cloud` fields, and returns the `secure_url` from
//! the response.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tryon_core::selection::SelectedImage;

use crate::config::UploadConfig;
use crate::messages::UploadResponse;

/// Anything that can host an image and hand back a public URL.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, image: &SelectedImage) -> Result<String, UploadApiError>;
}

/// Errors from the image host.
#[derive(Debug, thiserror::Error)]
pub enum UploadApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("Upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The host returned a non-2xx status code.
    #[error("Upload failed ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// The body was not the JSON we expected.
    #[error("Upload response could not be parsed: {0}")]
    Decode(#[from] serde_json::Error),

    /// A success response that carried no URL.
    #[error("Upload response did not include a secure URL")]
    MissingUrl,
}

/// HTTP client for the image upload endpoint.
pub struct UploadApi {
    client: reqwest::Client,
    config: UploadConfig,
}

impl UploadApi {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create an upload client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: UploadConfig) -> Self {
        Self { client, config }
    }

    fn build_form(&self, image: &SelectedImage) -> Result<Form, UploadApiError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;

        // Text fields first; the binary part goes last.
        Ok(Form::new()
            .text("upload_preset", self.config.upload_preset.clone())
            .text("cloud", self.config.cloud_name.clone())
            .part("file", part))
    }
}

#[async_trait]
impl ImageHost for UploadApi {
    async fn upload(&self, image: &SelectedImage) -> Result<String, UploadApiError> {
        let form = self.build_form(image)?;

        tracing::debug!(
            role = %image.role,
            file_name = %image.file_name,
            bytes = image.len(),
            "Uploading image",
        );

        let response = self
            .client
            .post(&self.config.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<UploadResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(UploadApiError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: UploadResponse = serde_json::from_str(&body)?;
        let url = parsed.secure_url.ok_or(UploadApiError::MissingUrl)?;

        tracing::info!(role = %image.role, url = %url, "Image uploaded");
        Ok(url)
    }
}
