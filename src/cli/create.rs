use crate::cli::args::CreateArgs;
use crate::cli::commands::{build_context, resolve_config};
use crate::core::compose::{self, transform::postgres_env, transform::POSTGRES_ENV_FILE, TEMPLATE_FILE};
use crate::core::config::ConfigLoader;
use crate::core::{AppError, ComposeContext, ErrorCategory};
use crate::utils::files::{copy_tree, write_env_file};
use crate::utils::secrets::{generate_password, quote_env_value};
use crate::Result;
use anyhow::{anyhow, Context};
use std::fs;
use std::path::Path;

/// Configuration directories copied from the template into a new deployment.
pub const CONF_DIRS: &[&str] = &["qgis", "migrations", "redis", "loki", "promtail", "prometheus"];

const SECRET_KEY_LENGTH: usize = 50;
/// Owner of the publish directory inside the application containers.
const PUBLISH_DIR_OWNER: u32 = 1000;

/// Handles `gisquick-cli create` by scaffolding a deployment directory and generating its
/// compose file.
pub fn run(args: CreateArgs) -> Result<()> {
    let dir = args.name;
    if fs::symlink_metadata(&dir).is_ok() {
        return Err(AppError::new(
            ErrorCategory::DuplicateOutput,
            format!("Directory already exists: {}", dir.display()),
        )
        .with_context("path", dir.display().to_string())
        .into());
    }

    let config = resolve_config(&dir, &args.options, None)?;
    let ctx = build_context(&dir, &config, &args.options, false)?;
    let template = ctx.template_file(TEMPLATE_FILE);
    if !template.is_file() {
        return Err(anyhow!("compose template {} not found", template.display()));
    }

    println!("Creating a new deployment environment in directory: {}", dir.display());
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    write_env_files(&ctx)?;
    create_publish_dir(&ctx)?;
    copy_conf_dirs(&ctx)?;

    let config_path = ConfigLoader::save(&dir, &config)?;
    tracing::info!(path = %config_path.display(), "deployment settings saved");

    let path = compose::compose(&ctx)?;
    println!("Docker Compose file saved to {}", path.display());
    Ok(())
}

fn write_env_files(ctx: &ComposeContext) -> Result<()> {
    let env_path = ctx.output_file(".env");
    let written = write_env_file(
        &env_path,
        &[
            ("SECRET_KEY", quote_env_value(&generate_password(SECRET_KEY_LENGTH))),
            ("SERVER_URL", server_url_setting(ctx)),
        ],
        false,
    )
    .with_context(|| format!("failed to write {}", env_path.display()))?;
    if written {
        println!("Created \".env\" file for the global settings");
    }

    let postgres_path = ctx.output_file(POSTGRES_ENV_FILE);
    let written = write_env_file(&postgres_path, &postgres_env(ctx.secrets.as_ref()), false)
        .with_context(|| format!("failed to write {}", postgres_path.display()))?;
    if written {
        println!("Created \"{}\" file for the main database settings", POSTGRES_ENV_FILE);
    }
    Ok(())
}

/// Server URL without the trailing slash `Url` adds to bare hosts.
fn server_url_setting(ctx: &ComposeContext) -> String {
    ctx.server_url.as_str().trim_end_matches('/').to_string()
}

fn create_publish_dir(ctx: &ComposeContext) -> Result<()> {
    let publish_dir = ctx.output_dir.join(&ctx.publish_dir);
    if publish_dir.exists() {
        return Ok(());
    }
    fs::create_dir_all(&publish_dir)
        .with_context(|| format!("failed to create {}", publish_dir.display()))?;
    if let Err(err) = set_owner(&publish_dir) {
        tracing::warn!(path = %publish_dir.display(), error = %err, "failed to set owner of publish directory");
    }
    println!("Created directory for published projects");
    Ok(())
}

#[cfg(unix)]
fn set_owner(path: &Path) -> std::io::Result<()> {
    std::os::unix::fs::chown(path, Some(PUBLISH_DIR_OWNER), Some(PUBLISH_DIR_OWNER))
}

#[cfg(not(unix))]
fn set_owner(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn copy_conf_dirs(ctx: &ComposeContext) -> Result<()> {
    for name in CONF_DIRS {
        let dest = ctx.output_file(name);
        if dest.exists() {
            continue;
        }
        let src = ctx.template_file(name);
        copy_tree(&src, &dest)
            .with_context(|| format!("failed to copy {} to {}", src.display(), dest.display()))?;
        tracing::debug!(dir = name, "copied configuration directory");
    }
    Ok(())
}
