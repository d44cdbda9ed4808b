use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use sprig_util::errors::{SprigError, SprigResult};

/// Global user configuration loaded from `~/.sprig/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Multimethod dispatch settings from `[dispatch]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub ambiguity: AmbiguityPolicy,
}

/// What to do when several equally specific implementations match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbiguityPolicy {
    /// Use the candidate registered first.
    #[default]
    FirstDeclared,
    /// Fail with [`SprigError::AmbiguousMethod`].
    Error,
}

impl GlobalConfig {
    /// Load the global configuration from `~/.sprig/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> SprigResult<Self> {
        let path = Self::default_path();
        if path.is_file() {
            Self::from_path(&path)
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Read configuration from an explicit file.
    pub fn from_path(path: &Path) -> SprigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SprigError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| SprigError::Config {
            message: format!("Failed to parse {}: {e}", path.display()),
        })?;
        tracing::debug!("loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the sprig data directory (`~/.sprig/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".sprig")
}
