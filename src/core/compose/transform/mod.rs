#![allow(clippy::result_large_err)] // Transform pipeline returns AppError for structured diagnostics.

use crate::core::compose::context::ComposeContext;
use crate::core::compose::staging::FileStage;
use crate::core::document::{Document, KeyedEntry, KeyedList, Mapping, NameRef, Node};
use crate::core::error::AppError;

mod backend;
mod canonical;
mod dev;
mod optional;
mod pipeline;
mod profile;

pub use backend::{
    postgres_env, PostgresBackendTransform, SqliteBackendTransform, DATABASE_CLIENTS,
    POSTGRES_ENV_FILE,
};
pub use canonical::{canonicalize_service, CanonicalKeyOrderTransform, SERVICE_KEY_ORDER};
pub use dev::{DevImage, DevOverrideTransform, DEV_IMAGES};
pub use optional::{OptionalServicesTransform, ScrapeTargetsTransform};
pub use pipeline::{apply_pipeline, run_transforms, select_transforms};
pub use profile::{
    AppServerTransform, ProxyPortsTransform, PublishVolumeTransform, RestartPolicyTransform,
};

/// Position of a transform in the pipeline. Stages run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Profile,
    Backend,
    DevOverrides,
    OptionalRemoval,
    Canonicalization,
}

/// In-place mutation of the compose document for one concern.
///
/// Implementations may read files from the template or deployment directory but must route
/// every write through `files`, which is only committed once all transforms succeeded.
pub trait ComposeTransform {
    fn name(&self) -> &'static str;
    fn stage(&self) -> Stage;
    fn apply(
        &self,
        doc: &mut Document,
        ctx: &ComposeContext,
        files: &mut FileStage,
    ) -> Result<(), AppError>;
}

pub(crate) fn services_mut(doc: &mut Document) -> Result<&mut Mapping, AppError> {
    doc.mapping_mut(&["services"])
}

/// Service `name`, failing with `PreconditionFailed` when the template does not define it.
pub(crate) fn service_mut<'a>(
    doc: &'a mut Document,
    name: &str,
) -> Result<&'a mut Mapping, AppError> {
    services_mut(doc)?.mapping_mut(name).ok_or_else(|| {
        AppError::precondition(format!("service '{}' is not defined", name))
            .with_context("service", name)
    })
}

/// Edit the list stored under `key` of a service, creating it when missing.
pub(crate) fn edit_list<E, F>(service: &mut Mapping, key: &str, f: F) -> Result<(), AppError>
where
    E: KeyedEntry,
    F: FnOnce(&mut KeyedList<E>) -> Result<(), AppError>,
{
    KeyedList::<E>::edit(service.sequence_entry(key)?, f)
}

/// Drop `name` from the list under `key`, removing the key once the list is empty. Absent keys
/// and names are ignored.
pub(crate) fn remove_reference(
    service: &mut Mapping,
    key: &str,
    name: &str,
) -> Result<(), AppError> {
    let Some(list) = service.sequence_mut(key) else {
        return Ok(());
    };
    KeyedList::<NameRef>::edit(list, |refs| refs.remove(name, false).map(|_| ()))?;
    if list.is_empty() {
        service.remove(key);
    }
    Ok(())
}

/// Apply `f` to every service entry that is a mapping.
pub(crate) fn for_each_service<F>(doc: &mut Document, mut f: F) -> Result<(), AppError>
where
    F: FnMut(&str, &mut Mapping) -> Result<(), AppError>,
{
    for entry in services_mut(doc)?.entries_mut() {
        let name = entry.key().to_string();
        if let Node::Mapping(service) = &mut entry.node {
            f(&name, service)?;
        }
    }
    Ok(())
}
