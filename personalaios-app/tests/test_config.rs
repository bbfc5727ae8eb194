use personalaios_app::Config;
use personalaios_core::MatchPolicy;
use std::path::PathBuf;

#[test]
fn test_partial_file_keeps_defaults() {
    let config_yaml = r#"
model:
  base_url: http://localhost:9090
  autostart: true
match_policy: first_match
dry_run: true
"#;

    let config = Config::from_yaml(config_yaml).unwrap();
    assert_eq!(config.model.base_url, "http://localhost:9090");
    assert!(config.model.autostart);
    assert_eq!(config.model.max_tokens, 512);
    assert_eq!(config.model.top_p, 0.8);
    assert_eq!(config.model.health_poll_secs, 15);
    assert_eq!(config.match_policy, MatchPolicy::FirstMatch);
    assert!(config.dry_run);
    assert_eq!(config.command_timeout_secs, 5);
    assert_eq!(config.log_level, "warn");
    assert!(config.validate().is_ok());
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");

    let config = Config {
        data_dir: Some(PathBuf::from("/var/lib/paios")),
        files_root: Some(dir.path().to_path_buf()),
        dispatch_timeout_secs: 12,
        log_level: "debug".to_string(),
        ..Config::default()
    };
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.dispatch_timeout().as_secs(), 12);
}

#[test]
fn test_missing_file_means_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_or_default(&dir.path().join("absent.yaml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "model: [not, a, mapping").unwrap();
    assert!(Config::load_or_default(&path).is_err());
}

#[test]
fn test_validation_rejects_bad_values() {
    let cases: [(&str, fn(&mut Config)); 8] = [
        ("empty url", |c| c.model.base_url = "  ".to_string()),
        ("scheme", |c| c.model.base_url = "127.0.0.1:8080".to_string()),
        ("request timeout", |c| c.model.request_timeout_secs = 0),
        ("temperature", |c| c.model.temperature = 2.5),
        ("top_p", |c| c.model.top_p = 1.2),
        ("command timeout", |c| c.command_timeout_secs = 0),
        ("dispatch timeout", |c| c.dispatch_timeout_secs = 0),
        ("log level", |c| c.log_level = "loud".to_string()),
    ];
    for (label, mutate) in cases {
        let mut config = Config::default();
        mutate(&mut config);
        assert!(config.validate().is_err(), "{} should be rejected", label);
    }
}

#[test]
fn test_boundaries_are_valid() {
    let mut config = Config::default();
    config.model.temperature = 0.0;
    config.model.top_p = 1.0;
    config.model.base_url = "https://models.internal".to_string();
    config.log_level = "INFO".to_string();
    assert!(config.validate().is_ok());
}
