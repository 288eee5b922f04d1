//! Collaborator configuration loaded from environment variables.
//!
//! | Env Var                   | Default                                              |
//! |---------------------------|------------------------------------------------------|
//! | `TRYON_API_KEY`           | required                                             |
//! | `TRYON_BASE_URL`          | `https://api.fashn.ai/v1`                            |
//! | `UPLOAD_CLOUD_NAME`       | required                                             |
//! | `UPLOAD_PRESET`           | required                                             |
//! | `UPLOAD_URL`              | `https://api.cloudinary.com/v1_1/{cloud}/image/upload` |
//! | `POLL_INTERVAL_MS`        | `3000`                                               |
//! | `POLL_MAX_INTERVAL_MS`    | `30000`                                              |
//! | `POLL_BACKOFF_MULTIPLIER` | `1.0`                                                |
//! | `POLL_MAX_ATTEMPTS`       | `200`                                                |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tryon_core::polling::PollPolicy;

pub const DEFAULT_TRYON_BASE_URL: &str = "https://api.fashn.ai/v1";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("Invalid poll policy: {0}")]
    Policy(String),
}

/// Connection settings for the try-on service.
#[derive(Clone)]
pub struct TryOnConfig {
    /// Base URL without trailing `/run` or `/status`.
    pub base_url: String,
    /// Static bearer credential. Never logged.
    pub api_key: String,
}

impl fmt::Debug for TryOnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryOnConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Connection settings for the image host.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub upload_url: String,
    pub cloud_name: String,
    pub upload_preset: String,
}

/// Everything the workflow needs to talk to both collaborators.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub tryon: TryOnConfig,
    pub upload: UploadConfig,
    pub poll: PollPolicy,
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let api_key = required("TRYON_API_KEY")?;
        let base_url =
            lookup("TRYON_BASE_URL").unwrap_or_else(|| DEFAULT_TRYON_BASE_URL.to_string());

        let cloud_name = required("UPLOAD_CLOUD_NAME")?;
        let upload_preset = required("UPLOAD_PRESET")?;
        let upload_url = lookup("UPLOAD_URL").unwrap_or_else(|| {
            format!("https://api.cloudinary.com/v1_1/{cloud_name}/image/upload")
        });

        let defaults = PollPolicy::default();
        let interval = parse_or(&lookup, "POLL_INTERVAL_MS", defaults.interval.as_millis() as u64)
            .map(Duration::from_millis)?;
        // An unset ceiling never undercuts a configured interval.
        let max_interval = parse_or(
            &lookup,
            "POLL_MAX_INTERVAL_MS",
            defaults.max_interval.max(interval).as_millis() as u64,
        )
        .map(Duration::from_millis)?;
        let poll = PollPolicy {
            interval,
            max_interval,
            multiplier: parse_or(&lookup, "POLL_BACKOFF_MULTIPLIER", defaults.multiplier)?,
            max_attempts: parse_or(&lookup, "POLL_MAX_ATTEMPTS", defaults.max_attempts)?,
        };
        poll.validate()
            .map_err(|e| ConfigError::Policy(e.to_string()))?;

        Ok(Self {
            tryon: TryOnConfig { base_url, api_key },
            upload: UploadConfig {
                upload_url,
                cloud_name,
                upload_preset,
            },
            poll,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
