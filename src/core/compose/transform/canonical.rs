use super::{for_each_service, ComposeTransform, Stage};
use crate::core::compose::context::ComposeContext;
use crate::core::compose::staging::FileStage;
use crate::core::document::{Document, Mapping};
use crate::core::error::AppError;

/// Relative order imposed on the recognized keys of a service.
pub const SERVICE_KEY_ORDER: &[&str] = &[
    "restart",
    "image",
    "volumes",
    "environment",
    "env_file",
    "expose",
    "ports",
    "logging",
    "command",
];

/// Stable reorder: unrecognized keys first in their existing order, then recognized keys in
/// canonical order. Values and trivia move with their keys.
pub fn canonicalize_service(service: &mut Mapping) {
    service.sort_entries_by_key(|key| {
        SERVICE_KEY_ORDER
            .iter()
            .position(|known| *known == key)
            .map_or(0, |index| index + 1)
    });
}

pub struct CanonicalKeyOrderTransform;

impl ComposeTransform for CanonicalKeyOrderTransform {
    fn name(&self) -> &'static str {
        "CanonicalKeyOrderTransform"
    }

    fn stage(&self) -> Stage {
        Stage::Canonicalization
    }

    fn apply(
        &self,
        doc: &mut Document,
        _ctx: &ComposeContext,
        _files: &mut FileStage,
    ) -> Result<(), AppError> {
        for_each_service(doc, |_, service| {
            canonicalize_service(service);
            Ok(())
        })
    }
}
