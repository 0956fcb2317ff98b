use super::profile::read_aux;
use super::{for_each_service, remove_reference, services_mut, ComposeTransform, Stage};
use crate::core::compose::context::ComposeContext;
use crate::core::compose::staging::FileStage;
use crate::core::document::{Document, Node};
use crate::core::error::AppError;
use crate::core::types::DatabaseBackend;
use std::path::Path;

/// Removes optional services that were not requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalServicesTransform {
    disabled: Vec<&'static str>,
}

impl OptionalServicesTransform {
    pub fn for_context(ctx: &ComposeContext) -> Self {
        let mut disabled = Vec::new();
        if !ctx.optional.accounts {
            disabled.push("web-accounts");
        }
        if !ctx.optional.cadvisor {
            disabled.push("cadvisor");
        }
        if !ctx.optional.node_exporter {
            disabled.push("node-exporter");
        }
        // The database admin UI is only useful while developing against postgres.
        if !(ctx.dev_mode() && ctx.backend == DatabaseBackend::Postgres) {
            disabled.push("adminer");
        }
        OptionalServicesTransform { disabled }
    }

    pub fn disabled(&self) -> &[&'static str] {
        &self.disabled
    }
}

impl ComposeTransform for OptionalServicesTransform {
    fn name(&self) -> &'static str {
        "OptionalServicesTransform"
    }

    fn stage(&self) -> Stage {
        Stage::OptionalRemoval
    }

    fn apply(
        &self,
        doc: &mut Document,
        _ctx: &ComposeContext,
        _files: &mut FileStage,
    ) -> Result<(), AppError> {
        let services = services_mut(doc)?;
        for name in &self.disabled {
            services
                .remove(name)
                .ok_or_else(|| AppError::key_not_found(name))?;
            tracing::debug!(service = name, "removed optional service");
        }
        for_each_service(doc, |_, service| {
            for name in &self.disabled {
                remove_reference(service, "depends_on", name)?;
            }
            Ok(())
        })
    }
}

/// Drops monitoring scrape jobs whose exporters were removed.
pub struct ScrapeTargetsTransform;

impl ScrapeTargetsTransform {
    fn disabled_jobs(ctx: &ComposeContext) -> Vec<&'static str> {
        let mut jobs = Vec::new();
        if !ctx.optional.node_exporter {
            jobs.push("node");
        }
        if !ctx.optional.cadvisor {
            jobs.push("cadvisor");
        }
        jobs
    }
}

impl ComposeTransform for ScrapeTargetsTransform {
    fn name(&self) -> &'static str {
        "ScrapeTargetsTransform"
    }

    fn stage(&self) -> Stage {
        Stage::OptionalRemoval
    }

    fn apply(
        &self,
        _doc: &mut Document,
        ctx: &ComposeContext,
        files: &mut FileStage,
    ) -> Result<(), AppError> {
        let jobs = Self::disabled_jobs(ctx);
        if jobs.is_empty() {
            return Ok(());
        }
        let relative = Path::new("prometheus").join("prometheus.yml");
        let output = ctx.output_file(&relative);
        let source = if output.is_file() {
            output.clone()
        } else {
            ctx.template_file(&relative)
        };
        let text = read_aux(&source)?;
        let mut config = Document::load(&text)
            .map_err(|e| e.with_context("path", source.display().to_string()))?;
        let scrape_configs = config
            .root_mut()
            .sequence_mut("scrape_configs")
            .ok_or_else(|| AppError::path_not_found("scrape_configs"))?;
        for job in jobs {
            let position = scrape_configs.iter().position(|node| {
                node.as_mapping()
                    .and_then(|mapping| mapping.get("job_name"))
                    .and_then(Node::as_str)
                    == Some(job)
            });
            match position {
                Some(index) => {
                    scrape_configs.remove(index);
                }
                None => tracing::warn!(job, "scrape job not found"),
            }
        }

        files.copy_tree_if_missing(ctx.template_file("prometheus"), ctx.output_file("prometheus"));
        files.write(output, config.serialize());
        Ok(())
    }
}
