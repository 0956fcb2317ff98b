#![allow(clippy::result_large_err)]

use super::{ConfigValidator, GisquickConfig};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::utils::files::write_atomic;
use std::env;
use std::path::{Path, PathBuf};

/// Settings file read from the deployment directory.
pub const CONFIG_FILE: &str = "gisquick.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from the deployment directory (dir/gisquick.toml)
    /// Environment variables override config file values
    pub fn load_from_workspace(workspace_path: &Path) -> Result<GisquickConfig, AppError> {
        let config = Self::load_layers(workspace_path)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Defaults, config file and environment merged but not validated, for callers that apply
    /// further overrides and validate the result themselves.
    pub fn load_layers(workspace_path: &Path) -> Result<GisquickConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE);
        let mut config = Self::load_from_file(&config_path)?.unwrap_or_default();
        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Returns Ok(None) if the file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<GisquickConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::with_source(
                ErrorCategory::IoError,
                format!("Failed to read config file {}", path.display()),
                e,
            )
        })?;

        let config: GisquickConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_context("path", path.display().to_string())
        })?;

        Ok(Some(config))
    }

    /// Write `config` to dir/gisquick.toml, replacing any previous file.
    pub fn save(workspace_path: &Path, config: &GisquickConfig) -> Result<PathBuf, AppError> {
        let path = workspace_path.join(CONFIG_FILE);
        let content = toml::to_string_pretty(config).map_err(|e| {
            AppError::with_source(
                ErrorCategory::InternalError,
                "Failed to serialize configuration",
                e,
            )
        })?;
        write_atomic(&path, &content).map_err(|e| {
            AppError::with_source(
                ErrorCategory::IoError,
                format!("Failed to write config file {}", path.display()),
                e,
            )
        })?;
        Ok(path)
    }

    /// Environment variables take precedence over config file values. Unlike boolean toggles,
    /// enum values that fail to parse are reported instead of ignored.
    fn apply_env_overrides(config: &mut GisquickConfig) -> Result<(), AppError> {
        if let Ok(profile) = env::var("GISQUICK_PROFILE") {
            config.compose.profile = profile.parse().map_err(|msg: String| {
                AppError::new(ErrorCategory::ValidationError, msg)
                    .with_context("variable", "GISQUICK_PROFILE")
            })?;
        }

        if let Ok(backend) = env::var("GISQUICK_BACKEND") {
            config.compose.backend = backend.parse().map_err(|msg: String| {
                AppError::new(ErrorCategory::ValidationError, msg)
                    .with_context("variable", "GISQUICK_BACKEND")
            })?;
        }

        if let Ok(server_url) = env::var("GISQUICK_SERVER_URL") {
            config.compose.server_url = server_url;
        }

        if let Ok(publish_dir) = env::var("GISQUICK_PUBLISH_DIR") {
            config.compose.publish_dir = PathBuf::from(publish_dir);
        }

        if let Ok(template_dir) = env::var("GISQUICK_TEMPLATE_DIR") {
            config.compose.template_dir = Some(PathBuf::from(template_dir));
        }

        for (var, flag) in [
            ("GISQUICK_ACCOUNTS", &mut config.services.accounts),
            ("GISQUICK_CADVISOR", &mut config.services.cadvisor),
            ("GISQUICK_NODE_EXPORTER", &mut config.services.node_exporter),
        ] {
            if let Ok(value) = env::var(var) {
                if let Ok(enabled) = value.parse::<bool>() {
                    *flag = enabled;
                }
            }
        }

        Ok(())
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "GISQUICK_PROFILE - Override the deployment profile (local/public, default: local)",
            "GISQUICK_BACKEND - Override the database backend (sqlite/postgres, default: postgres)",
            "GISQUICK_SERVER_URL - Override the public server URL (default: http://localhost)",
            "GISQUICK_PUBLISH_DIR - Override the published projects directory (default: data/publish)",
            "GISQUICK_TEMPLATE_DIR - Override the template directory",
            "GISQUICK_ACCOUNTS - Enable the accounts service (true/false)",
            "GISQUICK_CADVISOR - Enable the cAdvisor exporter (true/false)",
            "GISQUICK_NODE_EXPORTER - Enable the node exporter (true/false)",
            "GISQUICK_LOG_DIR - Override the log directory",
        ]
    }
}
