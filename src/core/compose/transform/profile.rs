use super::{edit_list, for_each_service, service_mut, ComposeTransform, Stage};
use crate::core::compose::context::ComposeContext;
use crate::core::compose::staging::FileStage;
use crate::core::document::{Document, EnvAssignment, KeyedEntry, PortMapping, Scalar};
use crate::core::error::AppError;
use crate::core::types::{ErrorCategory, Profile};
use crate::utils::files::subst_params;
use std::fs;
use std::path::Path;

pub const PROXY_SERVICE: &str = "caddy";
pub const APP_SERVICE: &str = "app";
pub const RESTART_POLICY: &str = "unless-stopped";

/// Publishes the proxy ports for the server URL and renders the proxy configuration.
pub struct ProxyPortsTransform;

impl ComposeTransform for ProxyPortsTransform {
    fn name(&self) -> &'static str {
        "ProxyPortsTransform"
    }

    fn stage(&self) -> Stage {
        Stage::Profile
    }

    fn apply(
        &self,
        doc: &mut Document,
        ctx: &ComposeContext,
        files: &mut FileStage,
    ) -> Result<(), AppError> {
        if ctx.needs_manual_certificates() {
            tracing::warn!(
                url = %ctx.server_url,
                "https on a non-standard port: ssl certificates must be configured manually"
            );
        }
        let ports = ctx
            .proxy_ports()
            .into_iter()
            .map(|port| PortMapping::new(port.to_string(), port.to_string()));
        let proxy = service_mut(doc, PROXY_SERVICE)?;
        edit_list::<PortMapping, _>(proxy, "ports", |list| {
            list.upsert(ports);
            Ok(())
        })?;

        let template_dir = ctx.template_file(PROXY_SERVICE);
        let output_dir = ctx.output_file(PROXY_SERVICE);
        let caddyfile = Path::new("Caddyfile");
        let existing = output_dir.join(caddyfile);
        let source = if existing.is_file() {
            existing
        } else {
            template_dir.join(caddyfile)
        };
        let text = read_aux(&source)?;
        let server_name = ctx.server_name();
        files.copy_tree_if_missing(template_dir, &output_dir);
        files.write(
            output_dir.join(caddyfile),
            subst_params(&text, &[("SERVER_NAME", server_name.as_str())]),
        );
        Ok(())
    }
}

/// Points the `publish` volume at the publish directory.
pub struct PublishVolumeTransform;

impl ComposeTransform for PublishVolumeTransform {
    fn name(&self) -> &'static str {
        "PublishVolumeTransform"
    }

    fn stage(&self) -> Stage {
        Stage::Profile
    }

    fn apply(
        &self,
        doc: &mut Document,
        ctx: &ComposeContext,
        _files: &mut FileStage,
    ) -> Result<(), AppError> {
        let driver_opts = doc.mapping_mut(&["volumes", "publish", "driver_opts"])?;
        driver_opts.insert("device", Scalar::string(ctx.publish_device()));
        Ok(())
    }
}

/// Tells the application server whether user registration is available.
pub struct AppServerTransform;

impl ComposeTransform for AppServerTransform {
    fn name(&self) -> &'static str {
        "AppServerTransform"
    }

    fn stage(&self) -> Stage {
        Stage::Profile
    }

    fn apply(
        &self,
        doc: &mut Document,
        ctx: &ComposeContext,
        _files: &mut FileStage,
    ) -> Result<(), AppError> {
        let app = service_mut(doc, APP_SERVICE)?;
        edit_list::<EnvAssignment, _>(app, "environment", |env| {
            env.upsert([EnvAssignment::parse(&format!(
                "GISQUICK_SIGNUP_API={}",
                ctx.optional.accounts
            ))]);
            Ok(())
        })
    }
}

/// `public` restarts every service unless stopped; `local` drops restart policies.
pub struct RestartPolicyTransform;

impl ComposeTransform for RestartPolicyTransform {
    fn name(&self) -> &'static str {
        "RestartPolicyTransform"
    }

    fn stage(&self) -> Stage {
        Stage::Profile
    }

    fn apply(
        &self,
        doc: &mut Document,
        ctx: &ComposeContext,
        _files: &mut FileStage,
    ) -> Result<(), AppError> {
        for_each_service(doc, |_, service| {
            match ctx.profile {
                Profile::Public => {
                    service.insert("restart", Scalar::string(RESTART_POLICY));
                }
                Profile::Local => {
                    service.remove("restart");
                }
            }
            Ok(())
        })
    }
}

pub(crate) fn read_aux(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|e| {
        AppError::with_source(
            ErrorCategory::IoError,
            format!("failed to read {}", path.display()),
            e,
        )
        .with_context("path", path.display().to_string())
    })
}
