use super::backend::{PostgresBackendTransform, SqliteBackendTransform};
use super::canonical::CanonicalKeyOrderTransform;
use super::dev::DevOverrideTransform;
use super::optional::{OptionalServicesTransform, ScrapeTargetsTransform};
use super::profile::{
    AppServerTransform, ProxyPortsTransform, PublishVolumeTransform, RestartPolicyTransform,
};
use super::{ComposeTransform, Stage};
use crate::core::compose::context::ComposeContext;
use crate::core::compose::staging::FileStage;
use crate::core::document::Document;
use crate::core::error::AppError;
use crate::core::types::DatabaseBackend;

struct TransformRow {
    stage: Stage,
    applies: fn(&ComposeContext) -> bool,
    build: fn(&ComposeContext) -> Box<dyn ComposeTransform>,
}

/// Every transform in pipeline order, with the condition under which it runs.
const TRANSFORM_TABLE: &[TransformRow] = &[
    TransformRow {
        stage: Stage::Profile,
        applies: |_| true,
        build: |_| Box::new(ProxyPortsTransform),
    },
    TransformRow {
        stage: Stage::Profile,
        applies: |_| true,
        build: |_| Box::new(PublishVolumeTransform),
    },
    TransformRow {
        stage: Stage::Profile,
        applies: |_| true,
        build: |_| Box::new(AppServerTransform),
    },
    TransformRow {
        stage: Stage::Profile,
        applies: |_| true,
        build: |_| Box::new(RestartPolicyTransform),
    },
    TransformRow {
        stage: Stage::Backend,
        applies: |ctx| ctx.backend == DatabaseBackend::Postgres,
        build: |_| Box::new(PostgresBackendTransform),
    },
    TransformRow {
        stage: Stage::Backend,
        applies: |ctx| ctx.backend == DatabaseBackend::Sqlite,
        build: |_| Box::new(SqliteBackendTransform),
    },
    TransformRow {
        stage: Stage::DevOverrides,
        applies: ComposeContext::dev_mode,
        build: |_| Box::new(DevOverrideTransform),
    },
    TransformRow {
        stage: Stage::OptionalRemoval,
        applies: |ctx| !OptionalServicesTransform::for_context(ctx).disabled().is_empty(),
        build: |ctx| Box::new(OptionalServicesTransform::for_context(ctx)),
    },
    TransformRow {
        stage: Stage::OptionalRemoval,
        applies: |ctx| !ctx.optional.cadvisor || !ctx.optional.node_exporter,
        build: |_| Box::new(ScrapeTargetsTransform),
    },
    TransformRow {
        stage: Stage::Canonicalization,
        applies: |_| true,
        build: |_| Box::new(CanonicalKeyOrderTransform),
    },
];

/// Transforms that apply to `ctx`, in stage order.
pub fn select_transforms(ctx: &ComposeContext) -> Vec<Box<dyn ComposeTransform>> {
    TRANSFORM_TABLE
        .iter()
        .filter(|row| (row.applies)(ctx))
        .map(|row| {
            let transform = (row.build)(ctx);
            debug_assert_eq!(transform.stage(), row.stage);
            transform
        })
        .collect()
}

/// Run each transform once, in the given order. The first failure aborts the run.
pub fn run_transforms(
    doc: &mut Document,
    ctx: &ComposeContext,
    files: &mut FileStage,
    transforms: &[Box<dyn ComposeTransform>],
) -> Result<(), AppError> {
    for transform in transforms {
        tracing::info!(
            transform = transform.name(),
            stage = ?transform.stage(),
            "applying transform"
        );
        transform
            .apply(doc, ctx, files)
            .map_err(|e| e.with_context("transform", transform.name()))?;
    }
    Ok(())
}

pub fn apply_pipeline(
    doc: &mut Document,
    ctx: &ComposeContext,
    files: &mut FileStage,
) -> Result<(), AppError> {
    let transforms = select_transforms(ctx);
    run_transforms(doc, ctx, files, &transforms)
}
