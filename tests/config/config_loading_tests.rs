// Config loading tests - shipped sample, default-path fallback, CLI
// overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use neon_agent_core::model::AuthScheme;
use neon_agent_core::{AppConfig, ConfigError, ConfigOverrides};
use serial_test::serial;
use tempfile::tempdir;

fn sample_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/agent.toml")
}

#[test]
fn shipped_sample_matches_defaults() {
    let config = AppConfig::load(Some(&sample_path())).expect("sample parses");
    let defaults = AppConfig::default();

    assert_eq!(config.model, defaults.model);
    assert_eq!(config.tools, defaults.tools);
    assert_eq!(config.call_timeout, defaults.call_timeout);
    assert_eq!(config.max_round_trips, defaults.max_round_trips);
    assert_eq!(config.provider, defaults.provider);
    assert_eq!(config.neon, defaults.neon);
    assert!(
        config
            .render_instructions("2026-10-16")
            .contains("The current date is 2026-10-16.")
    );
}

#[test]
#[serial]
fn default_path_is_relative_to_working_directory() {
    let original = env::current_dir().expect("cwd");
    let dir = tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("config")).expect("config dir");
    fs::write(
        dir.path().join("config/agent.toml"),
        "model = \"gpt-4o-mini\"\n[provider]\nauth = \"api-key\"\n",
    )
    .expect("write config");

    env::set_current_dir(dir.path()).expect("enter tempdir");
    let loaded = AppConfig::load(None);
    env::set_current_dir(original).expect("restore cwd");

    let config = loaded.expect("loads default path");
    assert_eq!(config.model, "gpt-4o-mini");
    assert_eq!(config.provider.auth, AuthScheme::ApiKey);
}

#[test]
#[serial]
fn missing_default_file_uses_defaults() {
    let original = env::current_dir().expect("cwd");
    let dir = tempdir().expect("tempdir");

    env::set_current_dir(dir.path()).expect("enter tempdir");
    let loaded = AppConfig::load(None);
    env::set_current_dir(original).expect("restore cwd");

    assert_eq!(loaded.expect("defaults"), AppConfig::default());
}

#[test]
fn malformed_toml_reports_path() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("agent.toml");
    fs::write(&path, "model = [").expect("write");

    let err = AppConfig::load(Some(&path)).expect_err("parse error");

    match err {
        ConfigError::Parse { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn unknown_auth_scheme_is_a_parse_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("agent.toml");
    fs::write(&path, "[provider]\nauth = \"basic\"\n").expect("write");

    assert!(matches!(
        AppConfig::load(Some(&path)),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn overrides_then_validation() {
    let mut config = AppConfig::default();
    config.apply_overrides(ConfigOverrides {
        call_timeout_secs: Some(0),
        ..ConfigOverrides::default()
    });
    assert_eq!(config.call_timeout, Duration::ZERO);
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}
