use crate::config::{StorageConfig, constants::DEFAULT_ENDPOINT};

use super::*;

#[test]
fn test_load_configuration() {
    let config = load_configuration("./testdata/config.toml").expect("failed to load config");

    assert!(config.general.verbose);
    assert_eq!(config.general.default_model.as_deref(), Some("llama3.2"));

    let log = &config.log;
    assert_eq!(log.level.as_deref(), Some("debug"));
    let log_filters = log.filters.as_deref().unwrap_or_default();
    assert_eq!(log_filters.len(), 1);
    assert_eq!(log_filters[0].module.as_deref(), Some("parley::backend"));
    assert_eq!(log_filters[0].level.as_deref(), Some("trace"));

    let log_file = log.file.as_ref().expect("log file is not set");
    assert_eq!(log_file.path, "/var/log/parley.log");
    assert!(log_file.append);

    let backend = &config.backend;
    assert_eq!(backend.endpoint, "http://10.0.0.2:11434");
    assert_eq!(backend.timeout_secs, Some(60));
    assert_eq!(backend.title_keep_alive, "5m");
    assert!(!backend.auto_title);

    let session = &config.session;
    assert_eq!(session.system, "You are a helpful assistant.");
    assert_eq!(session.temperature, 0.2);
    assert_eq!(session.seed, "7");

    match &config.storage {
        StorageConfig::File(file) => assert_eq!(file.path(), "/var/lib/parley"),
        StorageConfig::Memory => panic!("expected file storage"),
    }
}

#[test]
fn test_load_configuration_with_some_default_fields() {
    let config =
        load_configuration("./testdata/config_with_default.toml").expect("failed to load config");

    assert!(!config.general.verbose);
    assert_eq!(config.log.level.as_deref(), Some("warn"));
    assert!(config.log.file.is_none());

    assert_eq!(config.backend.endpoint, DEFAULT_ENDPOINT);
    assert_eq!(config.backend.title_keep_alive, "0m");
    assert!(config.backend.auto_title);

    assert_eq!(config.session.temperature, 0.7);
    assert!(matches!(config.storage, StorageConfig::Memory));
}

#[test]
fn test_load_configuration_missing_file() {
    let err = load_configuration("./testdata/does-not-exist.toml").unwrap_err();
    assert_eq!(err.to_string(), "reading ./testdata/does-not-exist.toml");
}

#[test]
fn test_resolve_path() {
    let ret = resolve_path("$PARLEY_UNSET_VAR/config.toml").expect("failed to resolve path");
    assert_eq!(ret, "/config.toml");

    let dir = "/tmp/parley-test";
    let user_path = "user_path";
    unsafe {
        std::env::set_var("PARLEY_TEST_PATH", dir);
        std::env::set_var("PARLEY_USER_PATH", user_path);
    }
    let ret = resolve_path("$PARLEY_TEST_PATH/${PARLEY_USER_PATH}/config.toml")
        .expect("failed to resolve path");
    assert_eq!(ret, format!("{dir}/{user_path}/config.toml"));
}

#[test]
fn test_basename() {
    assert_eq!(basename("src/session/store.rs"), "store.rs");
    assert_eq!(basename("main.rs"), "main.rs");
}
