use serde::{Deserialize, Serialize};

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Template or auxiliary document is malformed or uses unsupported syntax.
    ParseError,
    /// A document path segment (mapping key or sequence index) is absent.
    PathNotFound,
    /// A keyed lookup that was required to succeed found nothing.
    KeyNotFound,
    /// A transform cannot apply given the current context.
    PreconditionFailed,
    IoError,
    /// The requested output already exists and overwriting was not requested.
    DuplicateOutput,
    /// Invalid command-line or configuration value.
    ValidationError,
    InternalError,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Deployment variant selecting the profile-stage transforms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Developer machine: no restart policies.
    #[default]
    Local,
    /// Public-facing server: every service restarts unless stopped.
    Public,
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Profile::Local => write!(f, "local"),
            Profile::Public => write!(f, "public"),
        }
    }
}

impl std::str::FromStr for Profile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "local" => Ok(Profile::Local),
            "public" => Ok(Profile::Public),
            other => Err(format!(
                "invalid profile '{}'; supported values are local, public",
                other
            )),
        }
    }
}

/// Database used by the application services.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    #[default]
    Postgres,
}

impl std::fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseBackend::Sqlite => write!(f, "sqlite"),
            DatabaseBackend::Postgres => write!(f, "postgres"),
        }
    }
}

impl std::str::FromStr for DatabaseBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "sqlite" => Ok(DatabaseBackend::Sqlite),
            "postgres" | "postgresql" => Ok(DatabaseBackend::Postgres),
            other => Err(format!(
                "invalid database backend '{}'; supported values are sqlite, postgres",
                other
            )),
        }
    }
}
