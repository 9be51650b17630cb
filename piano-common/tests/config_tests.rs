//! Integration tests for bootstrap configuration
//!
//! Tests that manipulate PIANO_TUNER_CONFIG are marked with #[serial]
//! so they never race each other on the process environment.

use piano_common::config::{load_reward, resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use piano_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_arg_takes_precedence_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/piano-from-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/piano-from-cli.toml")), CONFIG_ENV_VAR);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/piano-from-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_arg() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/piano-from-env.toml");

    let resolved = resolve_config_path(None, CONFIG_ENV_VAR);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/piano-from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_empty_env_var_ignored() {
    env::set_var(CONFIG_ENV_VAR, "");

    let resolved = resolve_config_path(None, CONFIG_ENV_VAR);
    assert_ne!(resolved, Some(PathBuf::from("")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_no_file_gives_defaults() {
    assert_eq!(TomlConfig::load(None).unwrap(), TomlConfig::default());
}

#[test]
fn test_full_file_parses() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
bind_address = "127.0.0.1"
port = 8080
route_prefix = "/piano"
state_file = "/var/lib/piano/state.json"
reward_file = "/etc/piano/reward.txt"
assets_dir = "/srv/piano"
notes_dir = "/srv/piano/notes"
cooldown_secs = 30
max_tracked_sessions = 500
strict_persistence = true

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.listen_addr(), "127.0.0.1:8080");
    assert_eq!(config.normalized_prefix(), "/piano");
    assert_eq!(config.state_file, PathBuf::from("/var/lib/piano/state.json"));
    assert_eq!(config.notes_dir, PathBuf::from("/srv/piano/notes"));
    assert_eq!(config.cooldown_secs, 30);
    assert_eq!(config.max_tracked_sessions, 500);
    assert!(config.strict_persistence);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "port = 4000\n").unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.port, 4000);
    assert_eq!(config.route_prefix, "/viritys");
    assert_eq!(config.cooldown_secs, 60);
}

#[test]
fn test_malformed_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "port = \"not a number\"\n").unwrap();

    assert!(matches!(TomlConfig::load(Some(&path)), Err(Error::Config(_))));
}

#[test]
fn test_reward_loaded_verbatim() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("final-coords.txt");
    fs::write(&path, "60.1699 N, 24.9384 E\n").unwrap();

    assert_eq!(load_reward(&path).unwrap(), "60.1699 N, 24.9384 E\n");
}

#[test]
fn test_missing_reward_is_config_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        load_reward(&dir.path().join("nope.txt")),
        Err(Error::Config(_))
    ));
}
