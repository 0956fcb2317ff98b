use super::{edit_list, for_each_service, remove_reference, service_mut, services_mut};
use super::{ComposeTransform, Stage};
use crate::core::compose::context::ComposeContext;
use crate::core::compose::staging::FileStage;
use crate::core::document::{
    Document, EnvAssignment, KeyedEntry, KeyedList, NameRef, Node, VolumeMount,
};
use crate::core::error::AppError;
use crate::utils::files::format_env_file;
use crate::utils::secrets::SecretGenerator;

pub const POSTGRES_SERVICE: &str = "postgres";
pub const POSTGRES_ENV_FILE: &str = "postgres.env";
/// Services that connect to the main database.
pub const DATABASE_CLIENTS: &[&str] = &["app", "web-accounts"];

pub const SQLITE_DB_ENV: &str = "GISQUICK_SQLITE_DB=/var/lib/gisquick/db/gisquick.sqlite3";
pub const SQLITE_DB_MOUNT: &str = "./data/db:/var/lib/gisquick/db";

const POSTGRES_PASSWORD_LENGTH: usize = 14;

/// Variables of a fresh `postgres.env` with a generated password.
pub fn postgres_env(secrets: &dyn SecretGenerator) -> Vec<(&'static str, String)> {
    vec![
        ("POSTGRES_DB", "gisquick".to_string()),
        ("POSTGRES_USER", "postgres".to_string()),
        (
            "POSTGRES_PASSWORD",
            secrets.generate_secret(POSTGRES_PASSWORD_LENGTH),
        ),
    ]
}

/// Wires the database clients to the `postgres` service.
pub struct PostgresBackendTransform;

impl ComposeTransform for PostgresBackendTransform {
    fn name(&self) -> &'static str {
        "PostgresBackendTransform"
    }

    fn stage(&self) -> Stage {
        Stage::Backend
    }

    fn apply(
        &self,
        doc: &mut Document,
        ctx: &ComposeContext,
        files: &mut FileStage,
    ) -> Result<(), AppError> {
        service_mut(doc, POSTGRES_SERVICE)?;
        for client in DATABASE_CLIENTS {
            let service = service_mut(doc, client)?;
            edit_list::<NameRef, _>(service, "env_file", |list| {
                list.upsert([NameRef::new(POSTGRES_ENV_FILE)]);
                Ok(())
            })?;
            edit_list::<NameRef, _>(service, "depends_on", |list| {
                list.upsert([NameRef::new(POSTGRES_SERVICE)]);
                Ok(())
            })?;
        }

        let env_path = ctx.output_file(POSTGRES_ENV_FILE);
        if !env_path.exists() && files.staged_contents(&env_path).is_none() {
            files.write(env_path, format_env_file(&postgres_env(ctx.secrets.as_ref())));
        }
        Ok(())
    }
}

/// Replaces the `postgres` service with an sqlite database file on a bind mount.
pub struct SqliteBackendTransform;

impl ComposeTransform for SqliteBackendTransform {
    fn name(&self) -> &'static str {
        "SqliteBackendTransform"
    }

    fn stage(&self) -> Stage {
        Stage::Backend
    }

    fn apply(
        &self,
        doc: &mut Document,
        _ctx: &ComposeContext,
        _files: &mut FileStage,
    ) -> Result<(), AppError> {
        let removed = services_mut(doc)?
            .remove(POSTGRES_SERVICE)
            .ok_or_else(|| AppError::key_not_found(POSTGRES_SERVICE))?;
        let named_volumes = named_volumes(&removed)?;
        let volumes = doc.mapping_mut(&["volumes"])?;
        for name in &named_volumes {
            if volumes.remove(name).is_some() {
                tracing::debug!(volume = %name, "removed postgres volume");
            }
        }

        for_each_service(doc, |_, service| {
            remove_reference(service, "depends_on", POSTGRES_SERVICE)?;
            remove_reference(service, "env_file", POSTGRES_ENV_FILE)
        })?;
        for client in DATABASE_CLIENTS {
            let service = service_mut(doc, client)?;
            edit_list::<EnvAssignment, _>(service, "environment", |env| {
                env.upsert([EnvAssignment::parse(SQLITE_DB_ENV)]);
                Ok(())
            })?;
            edit_list::<VolumeMount, _>(service, "volumes", |mounts| {
                mounts.upsert([VolumeMount::parse(SQLITE_DB_MOUNT)]);
                Ok(())
            })?;
        }
        Ok(())
    }
}

/// Mount sources of a service that refer to named volumes rather than host paths.
fn named_volumes(service: &Node) -> Result<Vec<String>, AppError> {
    let Some(mounts) = service
        .as_mapping()
        .and_then(|service| service.get("volumes"))
        .and_then(Node::as_sequence)
    else {
        return Ok(Vec::new());
    };
    let list = KeyedList::<VolumeMount>::from_sequence(mounts)?;
    Ok(list
        .iter()
        .map(|mount| mount.identity())
        .filter(|source| {
            !source.is_empty()
                && !source.starts_with(['.', '/', '~', '$'])
                && !source.contains('/')
        })
        .map(str::to_string)
        .collect())
}
