#![allow(clippy::result_large_err)]

use super::GisquickConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::path::{Component, Path};
use url::Url;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &GisquickConfig) -> Result<(), AppError> {
        Self::server_url(&config.compose.server_url)?;

        if config.compose.publish_dir.as_os_str().is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "compose.publish_dir cannot be empty",
            ));
        }

        // The output is written next to the generated auxiliary files, never elsewhere.
        let output = Path::new(&config.compose.output);
        let mut components = output.components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!(
                    "compose.output must be a plain file name, got '{}'",
                    config.compose.output
                ),
            ));
        }

        Ok(())
    }

    /// Parse a server URL, accepting only http and https with a host.
    pub fn server_url(value: &str) -> Result<Url, AppError> {
        let url = Url::parse(value).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("invalid server URL '{}': {}", value, e),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("server URL '{}' must use http or https and name a host", value),
            ));
        }
        Ok(url)
    }
}
