#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Recursively copy `from` into `to`, creating `to` and any missing parents.
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Write through a temporary file in the target directory and rename it into place.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(contents.as_bytes())?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn param_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("parameter pattern is valid")
    })
}

/// Replace `${NAME}` placeholders whose name appears in `params`; unknown names are kept.
pub fn subst_params(text: &str, params: &[(&str, &str)]) -> String {
    param_pattern()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// `KEY=value` lines in the given order, newline terminated.
pub fn format_env_file(vars: &[(&str, String)]) -> String {
    let mut out = String::new();
    for (key, value) in vars {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// Write an env file unless it exists and `overwrite` is false. Returns whether it was written.
pub fn write_env_file(path: &Path, vars: &[(&str, String)], overwrite: bool) -> io::Result<bool> {
    if path.exists() && !overwrite {
        return Ok(false);
    }
    write_atomic(path, &format_env_file(vars))?;
    Ok(true)
}

/// Parse a dotenv-style file: `KEY=value` lines, `#` comments, optional `export ` prefix and
/// matching surrounding quotes.
pub fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>, AppError> {
    let text = fs::read_to_string(path).map_err(|e| {
        AppError::with_source(
            ErrorCategory::IoError,
            format!("failed to read {}", path.display()),
            e,
        )
        .with_context("path", path.display().to_string())
    })?;
    let mut vars = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        vars.insert(key.trim().to_string(), unquote(value.trim()).to_string());
    }
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Point `dest` at `src`. An existing `dest` is replaced only when it is itself a symlink.
pub fn create_symlink(src: &Path, dest: &Path) -> Result<(), AppError> {
    if let Ok(metadata) = fs::symlink_metadata(dest) {
        if !metadata.file_type().is_symlink() {
            return Err(AppError::precondition(format!(
                "only symlinks can be replaced: {}",
                dest.display()
            ))
            .with_context("path", dest.display().to_string()));
        }
        fs::remove_file(dest)?;
    }
    symlink(src, dest)?;
    Ok(())
}

/// Final target of `path` when it is a symlink (relative links resolve against the link's
/// directory), `path` itself otherwise. The target does not have to exist.
pub fn resolve_link(path: &Path) -> io::Result<PathBuf> {
    const MAX_HOPS: usize = 40;
    let mut current = path.to_path_buf();
    for _ in 0..MAX_HOPS {
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                let target = fs::read_link(&current)?;
                current = match current.parent() {
                    Some(parent) if target.is_relative() => parent.join(target),
                    _ => target,
                };
            }
            _ => return Ok(current),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::Other,
        format!("too many levels of symbolic links: {}", path.display()),
    ))
}

#[cfg(unix)]
fn symlink(src: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dest)
}

#[cfg(windows)]
fn symlink(src: &Path, dest: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dest)
}
