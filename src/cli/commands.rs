use crate::{
    cli::args::{ComposeArgs, ComposeOptions, MigrateArgs, UpdateQgisPluginsArgs, UseArgs},
    core::{
        compose::{
            self,
            context::{DEFAULT_INVOCATION, DEFAULT_OUTPUT},
            transform::POSTGRES_ENV_FILE,
            ComposeContext,
        },
        config::{ConfigLoader, ConfigValidator, GisquickConfig},
        AppError, ErrorCategory, OptionalServices,
    },
    utils::files::{copy_tree, create_symlink, read_env_file},
    Result,
};
use anyhow::{anyhow, Context};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    process::Command,
};

/// Template shipped with the sources, used when no template directory is configured.
pub const BUNDLED_TEMPLATE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/template");

const MIGRATE_IMAGE: &str = "migrate/migrate";
const DEFAULT_POSTGRES_HOST: &str = "postgres:5432";
const DEFAULT_SSL_MODE: &str = "prefer";

/// Characters left unescaped in the password part of the database URL.
const PASSWORD_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Effective settings for `dir`: defaults, gisquick.toml, environment, then command-line options.
/// Validation runs once on the merged result.
pub fn resolve_config(
    dir: &Path,
    options: &ComposeOptions,
    output: Option<String>,
) -> Result<GisquickConfig> {
    let mut config = ConfigLoader::load_layers(dir)?;
    let compose = &mut config.compose;
    if let Some(profile) = options.profile {
        compose.profile = profile;
    }
    if let Some(backend) = options.backend {
        compose.backend = backend;
    }
    if let Some(server_url) = &options.server_url {
        compose.server_url = server_url.clone();
    }
    if let Some(publish_dir) = &options.publish_dir {
        compose.publish_dir = publish_dir.clone();
    }
    if let Some(template_dir) = &options.template_dir {
        compose.template_dir = Some(template_dir.clone());
    }
    if let Some(output) = output {
        compose.output = output;
    }

    let services = &mut config.services;
    if let Some(accounts) = options.accounts {
        services.accounts = accounts;
    }
    if let Some(cadvisor) = options.cadvisor {
        services.cadvisor = cadvisor;
    }
    if let Some(node_exporter) = options.node_exporter {
        services.node_exporter = node_exporter;
    }

    ConfigValidator::validate(&config)?;
    Ok(config)
}

pub fn template_dir(config: &GisquickConfig) -> PathBuf {
    config
        .compose
        .template_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(BUNDLED_TEMPLATE_DIR))
}

/// Compose context for the deployment in `dir`.
pub fn build_context(
    dir: &Path,
    config: &GisquickConfig,
    options: &ComposeOptions,
    overwrite: bool,
) -> Result<ComposeContext> {
    let server_url = ConfigValidator::server_url(&config.compose.server_url)?;
    let mut ctx = ComposeContext::new(dir, template_dir(config), server_url)
        .with_profile(config.compose.profile)
        .with_backend(config.compose.backend)
        .with_optional(OptionalServices {
            accounts: config.services.accounts,
            cadvisor: config.services.cadvisor,
            node_exporter: config.services.node_exporter,
        })
        .with_publish_dir(config.compose.publish_dir.clone())
        .with_output_name(config.compose.output.clone())
        .with_overwrite(overwrite)
        .with_invocation(invocation_line(std::env::args()));
    for dev in &options.dev {
        ctx = ctx.with_dev_override(dev.clone());
    }
    Ok(ctx)
}

/// Command line recorded in the generated file's banner, with the program reduced to its name.
pub fn invocation_line<I>(args: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let program = args
        .next()
        .and_then(|program| {
            Path::new(&program)
                .file_stem()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| DEFAULT_INVOCATION.to_string());
    std::iter::once(program).chain(args).collect::<Vec<_>>().join(" ")
}

/// Handles `gisquick-cli compose`.
pub fn compose(args: ComposeArgs) -> Result<()> {
    if !args.dir.is_dir() {
        return Err(anyhow!(
            "deployment directory {} does not exist",
            args.dir.display()
        ));
    }
    let config = resolve_config(&args.dir, &args.options, args.output.clone())?;
    let ctx = build_context(&args.dir, &config, &args.options, args.force)?;
    tracing::debug!(context = ?ctx, "compose context");
    let path = compose::compose(&ctx)?;
    println!("Docker Compose file saved to {}", path.display());
    Ok(())
}

/// Handles `gisquick-cli use`: make `docker-compose.yml` a symlink to the chosen file.
pub fn use_compose_file(args: UseArgs) -> Result<()> {
    let target = args.dir.join(&args.compose_file);
    if !target.is_file() {
        return Err(AppError::new(
            ErrorCategory::ValidationError,
            format!("compose file does not exist: {}", target.display()),
        )
        .into());
    }
    if args.compose_file.as_os_str() == DEFAULT_OUTPUT {
        return Err(anyhow!("{} cannot point at itself", DEFAULT_OUTPUT));
    }
    let link = args.dir.join(DEFAULT_OUTPUT);
    create_symlink(&args.compose_file, &link)?;
    tracing::info!(link = %link.display(), target = %args.compose_file.display(), "default compose file updated");
    println!("{} -> {}", link.display(), args.compose_file.display());
    Ok(())
}

/// Full `docker run` command line for the migrate image.
pub fn migrate_command(
    network: &str,
    env: &BTreeMap<String, String>,
    source: Option<&str>,
    migrations_dir: Option<&Path>,
    args: &[String],
) -> std::result::Result<Vec<String>, AppError> {
    let database = format!(
        "postgres://{user}:{password}@{host}/{db}?sslmode={sslmode}",
        user = required(env, "POSTGRES_USER")?,
        password = utf8_percent_encode(required(env, "POSTGRES_PASSWORD")?, PASSWORD_ENCODE_SET),
        host = env
            .get("POSTGRES_HOST")
            .map_or(DEFAULT_POSTGRES_HOST, String::as_str),
        db = required(env, "POSTGRES_DB")?,
        sslmode = env
            .get("POSTGRES_SSL_MODE")
            .map_or(DEFAULT_SSL_MODE, String::as_str),
    );

    let mut command: Vec<String> = ["docker", "run", "--rm", "--network", network]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut migrate = Vec::new();
    match (source, migrations_dir) {
        (Some(source), _) => {
            migrate.extend(["-source".to_string(), source.to_string()]);
        }
        (None, Some(dir)) => {
            command.extend(["-v".to_string(), format!("{}:/migrations", dir.display())]);
            migrate.extend(["-path".to_string(), "/migrations/".to_string()]);
        }
        (None, None) => {
            return Err(AppError::precondition(
                "either a migrations source or a migrations directory is required",
            ))
        }
    }
    command.push(MIGRATE_IMAGE.to_string());
    command.extend(migrate);
    command.extend(["-database".to_string(), database]);
    command.extend(args.iter().cloned());
    Ok(command)
}

fn required<'a>(
    env: &'a BTreeMap<String, String>,
    key: &str,
) -> std::result::Result<&'a str, AppError> {
    env.get(key)
        .map(String::as_str)
        .ok_or_else(|| AppError::key_not_found(key).with_context("file", POSTGRES_ENV_FILE))
}

/// Handles `gisquick-cli migrate`.
pub fn migrate(args: MigrateArgs) -> Result<()> {
    let dir = fs::canonicalize(&args.dir)
        .with_context(|| format!("deployment directory {}", args.dir.display()))?;
    let name = dir
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("cannot derive a network name from {}", dir.display()))?;
    let network = format!("{}_default", name);
    let env = read_env_file(&dir.join(POSTGRES_ENV_FILE))?;

    let migrations_dir = match &args.source {
        Some(_) => None,
        None => {
            let path = dir.join(&args.path);
            Some(fs::canonicalize(&path).with_context(|| {
                format!("migrations directory {} does not exist", path.display())
            })?)
        }
    };
    let command = migrate_command(
        &network,
        &env,
        args.source.as_deref(),
        migrations_dir.as_deref(),
        &args.args,
    )?;

    if args.print {
        println!("{}", command.join(" "));
        return Ok(());
    }

    tracing::info!(network = %network, "running migrations");
    let status = Command::new(&command[0])
        .args(&command[1..])
        .status()
        .with_context(|| format!("failed to start {}", command[0]))?;
    if !status.success() {
        return Err(anyhow!(
            "migrate exited with {}",
            status
                .code()
                .map_or_else(|| "a signal".to_string(), |code| format!("exit code {}", code))
        ));
    }
    Ok(())
}

/// Handles `gisquick-cli update-qgis-plugins`.
pub fn update_qgis_plugins(args: UpdateQgisPluginsArgs) -> Result<()> {
    let config = ConfigLoader::load_from_workspace(&args.dir)?;
    let template = args
        .template_dir
        .clone()
        .unwrap_or_else(|| template_dir(&config));
    let source = template.join("qgis");
    if !source.is_dir() {
        return Err(anyhow!("template plugins directory {} not found", source.display()));
    }
    let dest = args.dir.join("qgis");
    if dest.exists() {
        fs::remove_dir_all(&dest)
            .with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    copy_tree(&source, &dest).with_context(|| format!("failed to copy {}", source.display()))?;
    tracing::info!(path = %dest.display(), "QGIS plugins updated");
    println!("QGIS plugins updated in {}", dest.display());
    Ok(())
}
