use crate::core::compose::DevOverride;
use crate::core::types::{DatabaseBackend, Profile};
use clap::Args;
use std::path::PathBuf;

/// Deployment options shared by `create` and `compose`. Unset options fall back to
/// gisquick.toml, then to the built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Deployment profile (default: local)
    #[arg(long, value_enum, value_name = "PROFILE")]
    pub profile: Option<Profile>,

    /// Database backend (default: postgres)
    #[arg(long, value_enum, value_name = "BACKEND")]
    pub backend: Option<DatabaseBackend>,

    /// Public URL of the deployment (default: http://localhost)
    #[arg(long, value_name = "URL")]
    pub server_url: Option<String>,

    /// Directory of published projects, relative to the deployment (default: data/publish)
    #[arg(long, value_name = "DIR")]
    pub publish_dir: Option<PathBuf>,

    /// Include the web app for user registration
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help_heading = "Optional Services"
    )]
    pub accounts: Option<bool>,

    /// Include the cAdvisor container metrics exporter
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help_heading = "Optional Services"
    )]
    pub cadvisor: Option<bool>,

    /// Include the Prometheus node exporter
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help_heading = "Optional Services"
    )]
    pub node_exporter: Option<bool>,

    /// Run a service from a local source checkout (repeatable)
    #[arg(
        long = "dev",
        value_name = "SERVICE=PATH",
        value_parser = parse_dev_override,
        help_heading = "Development"
    )]
    pub dev: Vec<DevOverride>,

    /// Directory holding the compose template and configuration files
    #[arg(long, value_name = "DIR", help_heading = "Development")]
    pub template_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Directory of the new deployment; must not exist yet
    #[arg(value_name = "NAME")]
    pub name: PathBuf,

    #[command(flatten)]
    pub options: ComposeOptions,
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Deployment directory (default: current directory)
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Name of the generated compose file (default: docker-compose.yml)
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<String>,

    /// Replace the output file if it already exists
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub options: ComposeOptions,
}

#[derive(Args, Debug)]
pub struct UseArgs {
    /// Compose file to make the default one
    #[arg(value_name = "COMPOSE_FILE")]
    pub compose_file: PathBuf,

    /// Deployment directory (default: current directory)
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Deployment directory (default: current directory)
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Location of the migrations (driver://url)
    #[arg(long, value_name = "URL")]
    pub source: Option<String>,

    /// Local migrations directory, mounted into the container (default: ./migrations)
    #[arg(long, value_name = "PATH", default_value = "migrations", conflicts_with = "source")]
    pub path: PathBuf,

    /// Print the docker command instead of running it
    #[arg(long)]
    pub print: bool,

    /// Arguments passed to migrate (for example `up` or `down 1`)
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct UpdateQgisPluginsArgs {
    /// Deployment directory (default: current directory)
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Directory holding the template `qgis` directory
    #[arg(long, value_name = "DIR")]
    pub template_dir: Option<PathBuf>,
}

/// `SERVICE=PATH` whose path must exist; the path is made absolute.
fn parse_dev_override(value: &str) -> Result<DevOverride, String> {
    let mut dev: DevOverride = value.parse().map_err(|e| format!("{}", e))?;
    dev.source = std::fs::canonicalize(&dev.source)
        .map_err(|e| format!("source path '{}': {}", dev.source.display(), e))?;
    Ok(dev)
}
