//! Integration tests for portico-config

use portico_config::*;
use std::fs;

#[test]
fn test_toml_then_json_layering() {
    let dir = tempfile::tempdir().unwrap();
    let toml_path = dir.path().join("portico.toml");
    let json_path = dir.path().join("override.json");
    fs::write(
        &toml_path,
        "host = \"127.0.0.1\"\nport = 9000\ncontext_path = \"/app\"\npersist_uploads = false\n",
    )
    .unwrap();
    fs::write(&json_path, r#"{"port": 9100, "log_format": "compact"}"#).unwrap();

    let manager = ConfigManager::new();
    manager.load_file(&toml_path).unwrap();
    manager.load_file(&json_path).unwrap();

    let settings = manager.settings().unwrap();
    assert_eq!(settings.port, 9100);
    assert_eq!(settings.context_path, "/app");
    assert_eq!(settings.log_format, "compact");
    assert_eq!(settings.socket_addr().unwrap().to_string(), "127.0.0.1:9100");

    let dispatcher = settings.to_dispatcher_config();
    assert_eq!(dispatcher.context_path, "/app");
    assert!(!dispatcher.persist_uploads);
    assert_eq!(dispatcher.dispatch_path("/app/user/1"), "/user/1");
}

#[test]
fn test_env_file_as_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.env");
    fs::write(&path, "SESSION_COOKIE=SID\nSESSION_TTL_SECS=120\nVIEW_PREFIX=/pages/\n").unwrap();

    let manager = ConfigManager::new();
    manager.load_file(&path).unwrap();

    let settings = manager.settings().unwrap();
    assert_eq!(settings.session_cookie, "SID");
    assert_eq!(settings.session_ttl_secs, 120);
    assert_eq!(settings.view_prefix, "/pages/");
}

#[test]
fn test_invalid_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "port = [").unwrap();

    let manager = ConfigManager::new();
    assert!(matches!(manager.load_file(&path), Err(ConfigError::ParseError(_))));
    assert!(matches!(
        manager.load_file(dir.path().join("missing.json")),
        Err(ConfigError::LoadError { .. })
    ));
}

#[test]
fn test_invalid_settings_fail_validation() {
    let manager = ConfigManager::new();
    manager.set("port", 0).unwrap();
    assert!(matches!(manager.settings(), Err(ConfigError::ValidationError(_))));
}
