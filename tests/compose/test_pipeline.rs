use gisquick_cli::core::compose::transform::{
    run_transforms, DevOverrideTransform, PostgresBackendTransform,
};
use gisquick_cli::core::compose::{
    compose, render, ComposeContext, ComposeTransform, DevOverride, FileStage, OptionalServices,
};
use gisquick_cli::core::document::{Document, Node};
use gisquick_cli::core::{DatabaseBackend, ErrorCategory, Profile};
use gisquick_cli::utils::SecretGenerator;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;

struct FixedSecrets;

impl SecretGenerator for FixedSecrets {
    fn generate_secret(&self, length: usize) -> String {
        "s".repeat(length)
    }
}

fn template_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("template")
}

fn template_source() -> String {
    fs::read_to_string(template_dir().join("docker-compose.yml")).unwrap()
}

fn context(output: &Path, url: &str) -> ComposeContext {
    ComposeContext::new(output, template_dir(), Url::parse(url).unwrap())
        .with_secrets(Arc::new(FixedSecrets))
}

fn strings(doc: &Document, path: &[&str]) -> Vec<String> {
    doc.get(path)
        .unwrap()
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(Node::as_str)
        .map(str::to_string)
        .collect()
}

fn service_names(doc: &Document) -> Vec<String> {
    doc.get(&["services"])
        .unwrap()
        .as_mapping()
        .unwrap()
        .keys()
        .map(str::to_string)
        .collect()
}

#[test]
fn local_sqlite_without_options() {
    let out = TempDir::new().unwrap();
    let ctx = context(out.path(), "http://localhost").with_backend(DatabaseBackend::Sqlite);
    let mut files = FileStage::new();
    let text = render(&template_source(), &ctx, &mut files).unwrap();
    let doc = Document::load(&text).unwrap();

    assert!(text.starts_with("# Generated with: gisquick-cli\n\n# Gisquick deployment\n"));
    assert_eq!(
        service_names(&doc),
        vec!["app", "caddy", "qgisserver", "redis", "prometheus", "loki", "promtail"]
    );
    assert!(!text.contains("postgres"));
    assert!(!text.contains("restart"));
    assert!(!text.contains("\n\n\n"));

    let app = doc.get(&["services", "app"]).unwrap().as_mapping().unwrap();
    assert_eq!(
        app.keys().collect::<Vec<_>>(),
        vec!["depends_on", "image", "volumes", "environment", "env_file", "expose", "logging"]
    );
    assert!(strings(&doc, &["services", "app", "volumes"])
        .contains(&"./data/db:/var/lib/gisquick/db".to_string()));
    let env = strings(&doc, &["services", "app", "environment"]);
    assert!(env.contains(&"GISQUICK_SIGNUP_API=false".to_string()));
    assert!(env.contains(&"GISQUICK_SQLITE_DB=/var/lib/gisquick/db/gisquick.sqlite3".to_string()));
    assert_eq!(strings(&doc, &["services", "app", "depends_on"]), vec!["redis"]);

    assert!(text.contains(
        "\n\n  # Reverse proxy, obtains certificates for public deployments\n  caddy:\n    depends_on:\n      - app\n    image: caddy:2\n    volumes:\n      - ./caddy/Caddyfile:/etc/caddy/Caddyfile:ro\n      - caddy-data:/data\n    ports:\n      - 80:80\n\n  qgisserver:\n"
    ));
    assert_eq!(
        doc.get(&["volumes", "publish", "driver_opts", "device"]).unwrap().as_str(),
        Some("${PWD}/data/publish")
    );
    let volumes = doc.get(&["volumes"]).unwrap().as_mapping().unwrap();
    assert_eq!(
        volumes.keys().collect::<Vec<_>>(),
        vec!["publish", "caddy-data", "prometheus-data"]
    );

    let caddyfile = files
        .staged_contents(&out.path().join("caddy/Caddyfile"))
        .unwrap();
    assert!(caddyfile.starts_with(":80 {\n"));
    let prometheus = files
        .staged_contents(&out.path().join("prometheus/prometheus.yml"))
        .unwrap();
    assert!(!prometheus.contains("job_name: node"));
    assert!(!prometheus.contains("job_name: cadvisor"));
    assert!(prometheus.contains("job_name: app"));
    assert!(files.staged_contents(&out.path().join("postgres.env")).is_none());

    // render stages only; nothing reaches the deployment directory
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn public_postgres_with_accounts() {
    let out = TempDir::new().unwrap();
    let ctx = context(out.path(), "https://maps.example.com")
        .with_profile(Profile::Public)
        .with_optional(OptionalServices {
            accounts: true,
            ..OptionalServices::default()
        });
    let mut files = FileStage::new();
    let text = render(&template_source(), &ctx, &mut files).unwrap();
    let doc = Document::load(&text).unwrap();

    assert_eq!(
        service_names(&doc),
        vec![
            "app",
            "caddy",
            "qgisserver",
            "redis",
            "postgres",
            "web-accounts",
            "prometheus",
            "loki",
            "promtail"
        ]
    );
    for service in service_names(&doc) {
        assert_eq!(
            doc.get(&["services", service.as_str(), "restart"]).unwrap().as_str(),
            Some("unless-stopped"),
            "{}",
            service
        );
    }
    assert_eq!(strings(&doc, &["services", "caddy", "ports"]), vec!["80:80", "443:443"]);
    assert_eq!(strings(&doc, &["services", "app", "env_file"]), vec![".env", "postgres.env"]);
    assert_eq!(strings(&doc, &["services", "app", "depends_on"]), vec!["redis", "postgres"]);
    assert_eq!(
        strings(&doc, &["services", "web-accounts", "depends_on"]),
        vec!["app", "postgres"]
    );
    assert!(strings(&doc, &["services", "app", "environment"])
        .contains(&"GISQUICK_SIGNUP_API=true".to_string()));

    assert_eq!(
        files.staged_contents(&out.path().join("postgres.env")),
        Some("POSTGRES_DB=gisquick\nPOSTGRES_USER=postgres\nPOSTGRES_PASSWORD=ssssssssssssss\n")
    );
    let caddyfile = files
        .staged_contents(&out.path().join("caddy/Caddyfile"))
        .unwrap();
    assert!(caddyfile.starts_with("maps.example.com {\n"));
}

#[test]
fn postgres_wiring_is_idempotent() {
    let out = TempDir::new().unwrap();
    let ctx = context(out.path(), "http://localhost");
    let mut doc = Document::load(&template_source()).unwrap();
    let mut files = FileStage::new();
    let transforms: Vec<Box<dyn ComposeTransform>> =
        vec![Box::new(PostgresBackendTransform), Box::new(PostgresBackendTransform)];
    run_transforms(&mut doc, &ctx, &mut files, &transforms).unwrap();

    assert_eq!(strings(&doc, &["services", "app", "env_file"]), vec![".env", "postgres.env"]);
    assert_eq!(strings(&doc, &["services", "app", "depends_on"]), vec!["redis", "postgres"]);
    assert_eq!(files.ops().len(), 1);
}

#[test]
fn existing_postgres_env_is_not_regenerated() {
    let out = TempDir::new().unwrap();
    fs::write(out.path().join("postgres.env"), "POSTGRES_PASSWORD=kept\n").unwrap();
    let ctx = context(out.path(), "http://localhost");
    let mut files = FileStage::new();
    render(&template_source(), &ctx, &mut files).unwrap();
    assert!(files.staged_contents(&out.path().join("postgres.env")).is_none());
}

#[test]
fn dev_override_replaces_image_and_mounts_source() {
    let out = TempDir::new().unwrap();
    let ctx = context(out.path(), "http://localhost:8000").with_dev_override(DevOverride {
        service: "app".to_string(),
        source: PathBuf::from("/src/gisquick/server"),
    });
    let mut files = FileStage::new();
    let text = render(&template_source(), &ctx, &mut files).unwrap();
    let doc = Document::load(&text).unwrap();

    assert_eq!(
        doc.get(&["services", "app", "image"]).unwrap().as_str(),
        Some("gisquick/server-dev")
    );
    let mounts = strings(&doc, &["services", "app", "volumes"]);
    assert_eq!(
        mounts.iter().filter(|m| *m == "/src/gisquick/server:/go/server").count(),
        1
    );
    assert!(service_names(&doc).contains(&"adminer".to_string()));
    assert_eq!(strings(&doc, &["services", "caddy", "ports"]), vec!["8000:8000"]);

    let mut doc = Document::load(&template_source()).unwrap();
    let transforms: Vec<Box<dyn ComposeTransform>> =
        vec![Box::new(DevOverrideTransform), Box::new(DevOverrideTransform)];
    run_transforms(&mut doc, &ctx, &mut files, &transforms).unwrap();
    let mounts = strings(&doc, &["services", "app", "volumes"]);
    assert_eq!(
        mounts.iter().filter(|m| m.starts_with("/src/gisquick/server:")).count(),
        1
    );
}

#[test]
fn dev_override_of_disabled_accounts_fails() {
    let out = TempDir::new().unwrap();
    let ctx = context(out.path(), "http://localhost").with_dev_override(DevOverride {
        service: "web-accounts".to_string(),
        source: PathBuf::from("/src/web-accounts"),
    });
    let err = render(&template_source(), &ctx, &mut FileStage::new()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::PreconditionFailed);

    let ctx = context(out.path(), "http://localhost").with_dev_override(DevOverride {
        service: "redis".to_string(),
        source: PathBuf::from("/src/redis"),
    });
    let err = render(&template_source(), &ctx, &mut FileStage::new()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::PreconditionFailed);
}

const MINIMAL_TEMPLATE: &str = "\
services:
  app:
    image: gisquick/server
  caddy:
    image: caddy:2
volumes:
  publish:
    driver_opts:
      device: ./data/publish
";

fn minimal_template() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("docker-compose.yml"), MINIMAL_TEMPLATE).unwrap();
    fs::create_dir_all(dir.path().join("caddy")).unwrap();
    fs::write(dir.path().join("caddy/Caddyfile"), "${SERVER_NAME} {\n}\n").unwrap();
    dir
}

#[test]
fn failed_runs_write_nothing() {
    let template = minimal_template();
    let out = TempDir::new().unwrap();
    let site = out.path().join("site");
    fs::create_dir_all(&site).unwrap();

    let ctx = ComposeContext::new(&site, template.path(), Url::parse("http://localhost").unwrap())
        .with_backend(DatabaseBackend::Sqlite);
    let err = compose(&ctx).unwrap_err();
    assert_eq!(err.category, ErrorCategory::KeyNotFound);

    let ctx = ComposeContext::new(&site, template.path(), Url::parse("http://localhost").unwrap());
    let err = compose(&ctx).unwrap_err();
    assert_eq!(err.category, ErrorCategory::PreconditionFailed);

    assert_eq!(fs::read_dir(&site).unwrap().count(), 0);
}

#[test]
fn compose_writes_output_and_auxiliary_files() {
    let out = TempDir::new().unwrap();
    let ctx = context(out.path(), "http://localhost").with_output_name("docker-compose.dev.yml");
    let path = compose(&ctx).unwrap();

    assert_eq!(path, out.path().join("docker-compose.dev.yml"));
    let text = fs::read_to_string(&path).unwrap();
    assert!(Document::load(&text).is_ok());
    assert!(out.path().join("postgres.env").is_file());
    assert!(out.path().join("caddy/Caddyfile").is_file());
    assert!(out.path().join("prometheus/prometheus.yml").is_file());

    let err = compose(&ctx).unwrap_err();
    assert_eq!(err.category, ErrorCategory::DuplicateOutput);
    assert_eq!(fs::read_to_string(&path).unwrap(), text);

    compose(&ctx.clone().with_overwrite(true)).unwrap();
}
