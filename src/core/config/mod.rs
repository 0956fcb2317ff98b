use crate::core::types::{DatabaseBackend, Profile};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Deployment settings loaded from gisquick.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GisquickConfig {
    /// Compose generation settings
    #[serde(default)]
    pub compose: ComposeConfig,

    /// Optional services
    #[serde(default)]
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComposeConfig {
    #[serde(default)]
    pub profile: Profile,

    #[serde(default)]
    pub backend: DatabaseBackend,

    /// Public URL of the deployment
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Published projects directory, relative to the deployment directory
    #[serde(default = "default_publish_dir")]
    pub publish_dir: PathBuf,

    /// Generated compose file name
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ServicesConfig {
    #[serde(default)]
    pub accounts: bool,

    #[serde(default)]
    pub cadvisor: bool,

    #[serde(default)]
    pub node_exporter: bool,
}

fn default_server_url() -> String {
    "http://localhost".to_string()
}

fn default_publish_dir() -> PathBuf {
    PathBuf::from(crate::core::compose::context::DEFAULT_PUBLISH_DIR)
}

fn default_output() -> String {
    crate::core::compose::context::DEFAULT_OUTPUT.to_string()
}

impl Default for ComposeConfig {
    fn default() -> Self {
        ComposeConfig {
            profile: Profile::default(),
            backend: DatabaseBackend::default(),
            server_url: default_server_url(),
            publish_dir: default_publish_dir(),
            output: default_output(),
            template_dir: None,
        }
    }
}

pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
