use crate::core::types::{DatabaseBackend, Profile};
use crate::utils::secrets::{RandomSecretGenerator, SecretGenerator};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use url::{Position, Url};

pub const DEFAULT_OUTPUT: &str = "docker-compose.yml";
pub const DEFAULT_PUBLISH_DIR: &str = "data/publish";
pub const DEFAULT_INVOCATION: &str = "gisquick-cli";

/// `SERVICE=PATH`: run a service from a local source checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevOverride {
    pub service: String,
    pub source: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DevOverrideError {
    #[error("expected SERVICE=PATH, got '{0}'")]
    MissingSeparator(String),
    #[error("missing service name in '{0}'")]
    EmptyService(String),
    #[error("missing source path in '{0}'")]
    EmptySource(String),
}

impl FromStr for DevOverride {
    type Err = DevOverrideError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (service, source) = value
            .split_once('=')
            .ok_or_else(|| DevOverrideError::MissingSeparator(value.to_string()))?;
        let service = service.trim();
        let source = source.trim();
        if service.is_empty() {
            return Err(DevOverrideError::EmptyService(value.to_string()));
        }
        if source.is_empty() {
            return Err(DevOverrideError::EmptySource(value.to_string()));
        }
        Ok(DevOverride {
            service: service.to_string(),
            source: PathBuf::from(source),
        })
    }
}

/// Services that are only kept when requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionalServices {
    /// User registration web app (`web-accounts`).
    pub accounts: bool,
    pub cadvisor: bool,
    pub node_exporter: bool,
}

/// Resolved inputs of one compose run. Transforms only read it.
#[derive(Clone)]
pub struct ComposeContext {
    pub profile: Profile,
    pub backend: DatabaseBackend,
    pub dev_overrides: Vec<DevOverride>,
    pub optional: OptionalServices,
    /// Deployment directory receiving the compose file and auxiliary files.
    pub output_dir: PathBuf,
    pub output_name: String,
    pub template_dir: PathBuf,
    pub server_url: Url,
    /// Published projects directory; relative paths are resolved against the deployment.
    pub publish_dir: PathBuf,
    pub overwrite: bool,
    /// Command line recorded in the banner of the generated file.
    pub invocation: String,
    pub secrets: Arc<dyn SecretGenerator>,
}

impl ComposeContext {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        template_dir: impl Into<PathBuf>,
        server_url: Url,
    ) -> Self {
        ComposeContext {
            profile: Profile::default(),
            backend: DatabaseBackend::default(),
            dev_overrides: Vec::new(),
            optional: OptionalServices::default(),
            output_dir: output_dir.into(),
            output_name: DEFAULT_OUTPUT.to_string(),
            template_dir: template_dir.into(),
            server_url,
            publish_dir: PathBuf::from(DEFAULT_PUBLISH_DIR),
            overwrite: false,
            invocation: DEFAULT_INVOCATION.to_string(),
            secrets: Arc::new(RandomSecretGenerator),
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_backend(mut self, backend: DatabaseBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_optional(mut self, optional: OptionalServices) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_dev_override(mut self, dev: DevOverride) -> Self {
        self.dev_overrides.push(dev);
        self
    }

    pub fn with_publish_dir(mut self, publish_dir: impl Into<PathBuf>) -> Self {
        self.publish_dir = publish_dir.into();
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_invocation(mut self, invocation: impl Into<String>) -> Self {
        self.invocation = invocation.into();
        self
    }

    pub fn with_secrets(mut self, secrets: Arc<dyn SecretGenerator>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }

    pub fn dev_mode(&self) -> bool {
        !self.dev_overrides.is_empty()
    }

    /// Site address for the proxy: the URL's host and port, or `:<port>` for localhost so the
    /// proxy answers on any interface without requesting a certificate.
    pub fn server_name(&self) -> String {
        if self.server_url.host_str() == Some("localhost") {
            return format!(":{}", self.server_url.port().unwrap_or(80));
        }
        self.server_url[Position::BeforeHost..Position::AfterPort].to_string()
    }

    /// Host ports the proxy publishes.
    pub fn proxy_ports(&self) -> Vec<u16> {
        match self.server_url.port() {
            Some(port) => vec![port],
            None if self.server_url.scheme() == "http" => vec![80],
            None => vec![80, 443],
        }
    }

    /// Whether https is served on a port the proxy cannot obtain certificates for.
    pub fn needs_manual_certificates(&self) -> bool {
        self.server_url.scheme() == "https" && self.server_url.port().is_some()
    }

    /// Device of the `publish` volume as seen by docker compose.
    pub fn publish_device(&self) -> String {
        if self.publish_dir.is_absolute() {
            self.publish_dir.display().to_string()
        } else {
            let relative = self
                .publish_dir
                .strip_prefix(".")
                .unwrap_or(&self.publish_dir);
            format!("${{PWD}}/{}", relative.display())
        }
    }

    /// `path` inside the deployment directory.
    pub fn output_file(&self, path: impl AsRef<Path>) -> PathBuf {
        self.output_dir.join(path)
    }

    /// `path` inside the template directory.
    pub fn template_file(&self, path: impl AsRef<Path>) -> PathBuf {
        self.template_dir.join(path)
    }
}

impl fmt::Debug for ComposeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposeContext")
            .field("profile", &self.profile)
            .field("backend", &self.backend)
            .field("dev_overrides", &self.dev_overrides)
            .field("optional", &self.optional)
            .field("output_dir", &self.output_dir)
            .field("output_name", &self.output_name)
            .field("template_dir", &self.template_dir)
            .field("server_url", &self.server_url.as_str())
            .field("publish_dir", &self.publish_dir)
            .field("overwrite", &self.overwrite)
            .finish_non_exhaustive()
    }
}
