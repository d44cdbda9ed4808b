use sprig_core::config::{dirs_path, AmbiguityPolicy, GlobalConfig};
use sprig_util::errors::SprigError;

#[test]
fn test_global_config_default_first_declared() {
    let config = GlobalConfig::default();
    assert_eq!(config.dispatch.ambiguity, AmbiguityPolicy::FirstDeclared);
}

#[test]
fn test_global_config_empty_toml_uses_defaults() {
    let config: GlobalConfig = toml::from_str("").unwrap();
    assert_eq!(config.dispatch.ambiguity, AmbiguityPolicy::FirstDeclared);
}

#[test]
fn test_dirs_path_contains_sprig() {
    assert!(dirs_path().ends_with(".sprig"));
    assert!(GlobalConfig::default_path().ends_with(".sprig/config.toml"));
}

#[test]
fn test_global_config_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[dispatch]\nambiguity = \"error\"\n").unwrap();

    let config = GlobalConfig::from_path(&path).unwrap();
    assert_eq!(config.dispatch.ambiguity, AmbiguityPolicy::Error);
}

#[test]
fn test_global_config_rejects_unknown_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[dispatch]\nambiguity = \"random\"\n").unwrap();

    let err = GlobalConfig::from_path(&path).unwrap_err();
    assert!(matches!(err, SprigError::Config { .. }), "got: {err}");
}

#[test]
fn test_global_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = GlobalConfig::from_path(&dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read"), "got: {err}");
}
