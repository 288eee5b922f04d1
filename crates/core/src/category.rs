//! Garment categories accepted by the try-on service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Garment type classifier sent verbatim with every job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[default]
    Tops,
    Bottoms,
    /// Full-body garments (dresses, jumpsuits).
    OnePieces,
}

/// All categories in display order.
pub const ALL_CATEGORIES: &[Category] = &[Category::Tops, Category::Bottoms, Category::OnePieces];

impl Category {
    /// Wire value expected by the try-on service.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Tops => "tops",
            Category::Bottoms => "bottoms",
            Category::OnePieces => "one-pieces",
        }
    }

    /// Human-readable label for the page.
    pub fn label(self) -> &'static str {
        match self {
            Category::Tops => "Tops",
            Category::Bottoms => "Bottoms",
            Category::OnePieces => "Full Body",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_CATEGORIES
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = ALL_CATEGORIES.iter().map(|c| c.as_str()).collect();
                CoreError::Validation(format!(
                    "Invalid category '{s}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}
