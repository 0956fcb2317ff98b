//! Compose file generation: load the template, run the transform pipeline for the context,
//! write the result together with the staged auxiliary files.

#![allow(clippy::result_large_err)]

pub mod context;
pub mod staging;
pub mod transform;

pub use context::{ComposeContext, DevOverride, DevOverrideError, OptionalServices};
pub use staging::{FileStage, StagedFile};
pub use transform::{
    apply_pipeline, canonicalize_service, select_transforms, ComposeTransform, Stage,
    SERVICE_KEY_ORDER,
};

use crate::core::document::{Document, TriviaSnapshot};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::utils::files::{resolve_link, write_atomic};
use std::fs;
use std::path::PathBuf;

/// Compose template file inside the template directory.
pub const TEMPLATE_FILE: &str = "docker-compose.yml";

/// Generate the compose file for `ctx` and return its path.
///
/// Nothing is written unless every transform succeeded and the generated text parses as YAML.
pub fn compose(ctx: &ComposeContext) -> Result<PathBuf, AppError> {
    let output = ctx.output_path();
    if !ctx.overwrite && fs::symlink_metadata(&output).is_ok() {
        return Err(AppError::new(
            ErrorCategory::DuplicateOutput,
            format!("{} already exists", output.display()),
        )
        .with_context("path", output.display().to_string()));
    }

    let template = ctx.template_file(TEMPLATE_FILE);
    let source = fs::read_to_string(&template).map_err(|e| {
        AppError::with_source(
            ErrorCategory::IoError,
            format!("failed to read template {}", template.display()),
            e,
        )
        .with_context("path", template.display().to_string())
    })?;

    let mut files = FileStage::new();
    let rendered = render(&source, ctx, &mut files)?;

    // A symlink left by `use` keeps pointing where it did; its target receives the output.
    let target = resolve_link(&output)?;
    files.commit()?;
    write_atomic(&target, &rendered).map_err(|e| {
        AppError::with_source(
            ErrorCategory::IoError,
            format!("failed to write {}", target.display()),
            e,
        )
        .with_context("path", target.display().to_string())
    })?;
    tracing::info!(path = %output.display(), target = %target.display(), "compose file written");
    Ok(output)
}

/// Transform template text into the generated compose text, staging auxiliary files in `files`.
pub fn render(source: &str, ctx: &ComposeContext, files: &mut FileStage) -> Result<String, AppError> {
    let mut doc = Document::load(source)?;
    doc.mapping_mut(&["volumes"])?;
    let snapshot = TriviaSnapshot::capture_children(doc.mapping_mut(&["services"])?);

    apply_pipeline(&mut doc, ctx, files)?;

    snapshot.restore_children(doc.mapping_mut(&["services"])?);
    let text = format!("{}{}", banner(ctx), doc.serialize());
    serde_yaml::from_str::<serde_yaml::Value>(&text).map_err(|e| {
        AppError::with_source(
            ErrorCategory::InternalError,
            "generated compose file is not valid YAML",
            e,
        )
    })?;
    Ok(text)
}

pub fn banner(ctx: &ComposeContext) -> String {
    format!("# Generated with: {}\n\n", ctx.invocation)
}
