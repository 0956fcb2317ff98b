use gisquick_cli::core::config::{loader::CONFIG_FILE, ConfigLoader, GisquickConfig};
use gisquick_cli::core::{DatabaseBackend, ErrorCategory, Profile};
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_gisquick_env() {
    for v in &[
        "GISQUICK_PROFILE",
        "GISQUICK_BACKEND",
        "GISQUICK_SERVER_URL",
        "GISQUICK_PUBLISH_DIR",
        "GISQUICK_TEMPLATE_DIR",
        "GISQUICK_ACCOUNTS",
        "GISQUICK_CADVISOR",
        "GISQUICK_NODE_EXPORTER",
    ] {
        env::remove_var(v);
    }
}

/// Config file values with environment variables layered on top
#[test]
#[serial]
fn test_config_loading_integration() {
    clear_gisquick_env();
    let temp_dir = TempDir::new().unwrap();
    let workspace_path = temp_dir.path();

    let config_content = r#"
[compose]
profile = "public"
backend = "sqlite"
server_url = "https://maps.example.com"
publish_dir = "/srv/gisquick/publish"
output = "docker-compose.prod.yml"

[services]
accounts = true
node_exporter = true

[logging]
default_level = "debug"
"#;
    fs::write(workspace_path.join(CONFIG_FILE), config_content).unwrap();

    let config = ConfigLoader::load_from_workspace(workspace_path).unwrap();
    assert_eq!(config.compose.profile, Profile::Public);
    assert_eq!(config.compose.backend, DatabaseBackend::Sqlite);
    assert_eq!(config.compose.server_url, "https://maps.example.com");
    assert_eq!(
        config.compose.publish_dir,
        PathBuf::from("/srv/gisquick/publish")
    );
    assert_eq!(config.compose.output, "docker-compose.prod.yml");
    assert!(config.services.accounts);
    assert!(!config.services.cadvisor);
    assert!(config.services.node_exporter);

    env::set_var("GISQUICK_PROFILE", "local");
    env::set_var("GISQUICK_SERVER_URL", "http://localhost:8000");
    env::set_var("GISQUICK_ACCOUNTS", "false");
    env::set_var("GISQUICK_CADVISOR", "maybe");

    let config = ConfigLoader::load_from_workspace(workspace_path).unwrap();
    assert_eq!(config.compose.profile, Profile::Local);
    assert_eq!(config.compose.backend, DatabaseBackend::Sqlite);
    assert_eq!(config.compose.server_url, "http://localhost:8000");
    assert!(!config.services.accounts);
    assert!(!config.services.cadvisor);

    clear_gisquick_env();
}

#[test]
#[serial]
fn test_missing_config_uses_defaults() {
    clear_gisquick_env();
    let temp_dir = TempDir::new().unwrap();
    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    assert_eq!(config, GisquickConfig::default());
    assert_eq!(config.compose.output, "docker-compose.yml");
    assert_eq!(config.compose.publish_dir, PathBuf::from("data/publish"));
}

#[test]
#[serial]
fn test_saved_config_loads_back() {
    clear_gisquick_env();
    let temp_dir = TempDir::new().unwrap();
    let mut config = GisquickConfig::default();
    config.compose.backend = DatabaseBackend::Sqlite;
    config.compose.template_dir = Some(PathBuf::from("/opt/gisquick/template"));
    config.services.cadvisor = true;

    let path = ConfigLoader::save(temp_dir.path(), &config).unwrap();
    assert_eq!(path, temp_dir.path().join(CONFIG_FILE));
    assert_eq!(
        ConfigLoader::load_from_workspace(temp_dir.path()).unwrap(),
        config
    );
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    clear_gisquick_env();
    let temp_dir = TempDir::new().unwrap();

    fs::write(temp_dir.path().join(CONFIG_FILE), "[compose]\nbackend = \"mysql\"\n").unwrap();
    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);

    fs::write(
        temp_dir.path().join(CONFIG_FILE),
        "[compose]\nserver_url = \"ftp://example.com\"\n",
    )
    .unwrap();
    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);

    fs::remove_file(temp_dir.path().join(CONFIG_FILE)).unwrap();
    env::set_var("GISQUICK_BACKEND", "oracle");
    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);
    assert_eq!(
        err.context.get("variable").map(String::as_str),
        Some("GISQUICK_BACKEND")
    );
    clear_gisquick_env();
}

#[test]
#[serial]
fn test_layers_are_merged_before_validation() {
    clear_gisquick_env();
    let temp_dir = TempDir::new().unwrap();
    env::set_var("GISQUICK_SERVER_URL", "not a url");

    let config = ConfigLoader::load_layers(temp_dir.path()).unwrap();
    assert_eq!(config.compose.server_url, "not a url");
    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);
    clear_gisquick_env();
}
