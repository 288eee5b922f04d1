//! In-memory image selections for the two workflow roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Message shown when a try-on is requested without both images.
pub const MISSING_IMAGES_MESSAGE: &str = "Please upload both images.";

/// Largest image accepted for upload.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Which side of the try-on an image plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRole {
    /// The person who will "wear" the garment.
    Model,
    /// The clothing item composited onto the model.
    Garment,
}

impl ImageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageRole::Model => "model",
            ImageRole::Garment => "garment",
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" => Ok(ImageRole::Model),
            "garment" => Ok(ImageRole::Garment),
            other => Err(CoreError::Validation(format!(
                "Invalid image role '{other}'. Must be one of: model, garment"
            ))),
        }
    }
}

/// A locally chosen image, held only in memory until the session ends
/// or another file is chosen for the same role.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub role: ImageRole,
    pub file_name: String,
    /// MIME type, sniffed from the bytes when the format is recognised.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for SelectedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedImage")
            .field("role", &self.role)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl SelectedImage {
    /// Accept a chosen file for `role`.
    ///
    /// The content type is sniffed from the file header. Formats the
    /// sniffer does not know are still accepted when the caller declared
    /// an `image/*` type, matching a browser `accept="image/*"` picker.
    pub fn new(
        role: ImageRole,
        file_name: impl Into<String>,
        declared_content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, CoreError> {
        let file_name = file_name.into();

        if bytes.is_empty() {
            return Err(CoreError::Validation(format!(
                "The {role} image '{file_name}' is empty"
            )));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(CoreError::Validation(format!(
                "The {role} image '{file_name}' exceeds {} MB",
                MAX_IMAGE_BYTES / (1024 * 1024)
            )));
        }

        let content_type = match image::guess_format(&bytes) {
            Ok(format) => format.to_mime_type().to_string(),
            Err(_) => match declared_content_type {
                Some(ct) if ct.starts_with("image/") => ct.to_string(),
                _ => {
                    return Err(CoreError::Validation(format!(
                        "The {role} image '{file_name}' is not a recognised image"
                    )))
                }
            },
        };

        Ok(Self {
            role,
            file_name,
            content_type,
            bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Require both images before any network call is made.
pub fn require_both<'a>(
    model: Option<&'a SelectedImage>,
    garment: Option<&'a SelectedImage>,
) -> Result<(&'a SelectedImage, &'a SelectedImage), CoreError> {
    match (model, garment) {
        (Some(m), Some(g)) => Ok((m, g)),
        _ => Err(CoreError::Validation(MISSING_IMAGES_MESSAGE.to_string())),
    }
}
