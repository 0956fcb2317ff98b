use super::{edit_list, service_mut, ComposeTransform, Stage};
use crate::core::compose::context::ComposeContext;
use crate::core::compose::staging::FileStage;
use crate::core::document::{Document, Scalar, VolumeMount};
use crate::core::error::AppError;

/// Development image of a service and where it expects the source checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevImage {
    pub service: &'static str,
    pub image: &'static str,
    pub target: &'static str,
}

pub const DEV_IMAGES: &[DevImage] = &[
    DevImage {
        service: "app",
        image: "gisquick/server-dev",
        target: "/go/server",
    },
    DevImage {
        service: "web-accounts",
        image: "gisquick/web-accounts-dev",
        target: "/usr/src/app",
    },
];

/// Runs services from local source checkouts.
pub struct DevOverrideTransform;

impl ComposeTransform for DevOverrideTransform {
    fn name(&self) -> &'static str {
        "DevOverrideTransform"
    }

    fn stage(&self) -> Stage {
        Stage::DevOverrides
    }

    fn apply(
        &self,
        doc: &mut Document,
        ctx: &ComposeContext,
        _files: &mut FileStage,
    ) -> Result<(), AppError> {
        for dev in &ctx.dev_overrides {
            let image = DEV_IMAGES
                .iter()
                .find(|image| image.service == dev.service)
                .ok_or_else(|| {
                    AppError::precondition(format!(
                        "service '{}' has no development image",
                        dev.service
                    ))
                    .with_context("service", dev.service.as_str())
                })?;
            if image.service == "web-accounts" && !ctx.optional.accounts {
                return Err(AppError::precondition(
                    "web-accounts is disabled; enable accounts to run it from source",
                )
                .with_context("service", image.service));
            }

            let source = dev.source.display().to_string();
            tracing::info!(service = image.service, source = %source, "using development image");
            let service = service_mut(doc, image.service)?;
            service.insert("image", Scalar::string(image.image));
            edit_list::<VolumeMount, _>(service, "volumes", |mounts| {
                mounts.upsert([VolumeMount::new(source, image.target)]);
                Ok(())
            })?;
        }
        Ok(())
    }
}
