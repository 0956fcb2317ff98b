#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::utils::files::{copy_tree, write_atomic};
use std::path::{Path, PathBuf};

/// File side effect requested by a transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedFile {
    /// Copy a template directory unless the destination already exists.
    CopyTreeIfMissing { from: PathBuf, to: PathBuf },
    Write { path: PathBuf, contents: String },
}

/// Auxiliary files collected during a run and written only after the whole pipeline succeeded.
#[derive(Debug, Default)]
pub struct FileStage {
    ops: Vec<StagedFile>,
}

impl FileStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy_tree_if_missing(&mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) {
        self.ops.push(StagedFile::CopyTreeIfMissing {
            from: from.into(),
            to: to.into(),
        });
    }

    pub fn write(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.ops.push(StagedFile::Write {
            path: path.into(),
            contents: contents.into(),
        });
    }

    pub fn ops(&self) -> &[StagedFile] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Contents of the last staged write to `path`.
    pub fn staged_contents(&self, path: &Path) -> Option<&str> {
        self.ops.iter().rev().find_map(|op| match op {
            StagedFile::Write { path: staged, contents } if staged == path => {
                Some(contents.as_str())
            }
            _ => None,
        })
    }

    /// Apply the staged operations in the order they were requested.
    pub fn commit(self) -> Result<(), AppError> {
        for op in self.ops {
            match op {
                StagedFile::CopyTreeIfMissing { from, to } => {
                    if to.exists() {
                        tracing::debug!(path = %to.display(), "keeping existing directory");
                        continue;
                    }
                    copy_tree(&from, &to).map_err(|e| io_error("copy", &from, e))?;
                    tracing::debug!(from = %from.display(), to = %to.display(), "copied template directory");
                }
                StagedFile::Write { path, contents } => {
                    write_atomic(&path, &contents).map_err(|e| io_error("write", &path, e))?;
                    tracing::debug!(path = %path.display(), "wrote auxiliary file");
                }
            }
        }
        Ok(())
    }
}

fn io_error(action: &str, path: &Path, source: std::io::Error) -> AppError {
    AppError::with_source(
        ErrorCategory::IoError,
        format!("failed to {} {}", action, path.display()),
        source,
    )
    .with_context("path", path.display().to_string())
}
