//! Configuration for a semtag-managed repository
//!
//! Stored as TOML at `.semtag/config.toml`. Every field has a default, so a
//! missing file is the same as an empty one.

use crate::{validate_environment, ConfigError, DetectionRule, TagNamespace, DEFAULT_SCAN_LINES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding semtag state inside the repository.
pub const STATE_DIR: &str = ".semtag";
pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_REGISTRY_PATH: &str = ".semtag/registry.json";

pub const ENV_REGISTRY: &str = "SEMTAG_REGISTRY";
pub const ENV_REMOTE: &str = "SEMTAG_REMOTE";
pub const ENV_REPAIR_WINDOW_HOURS: &str = "SEMTAG_REPAIR_WINDOW_HOURS";

/// Log output format for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Extra discovery rules, evaluated before the built-in ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub rules: Vec<DetectionRule>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SemtagConfig {
    /// Registry location, relative to the repository root.
    pub registry_path: String,
    /// Remote used by push and remote delete.
    pub remote: String,
    pub namespace: TagNamespace,
    /// Known environments, in promotion order.
    pub environments: Vec<String>,
    /// Half-width of the search window when relocating a history entry.
    pub repair_window_hours: u32,
    pub header_scan_lines: usize,
    pub log_format: LogFormat,
    pub discovery: DiscoveryConfig,
}

impl Default for SemtagConfig {
    fn default() -> Self {
        Self {
            registry_path: DEFAULT_REGISTRY_PATH.to_string(),
            remote: "origin".to_string(),
            namespace: TagNamespace::Components,
            environments: vec!["dev".to_string(), "staging".to_string(), "prod".to_string()],
            repair_window_hours: 24,
            header_scan_lines: DEFAULT_SCAN_LINES,
            log_format: LogFormat::Text,
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl SemtagConfig {
    pub fn config_path(repo_root: &Path) -> PathBuf {
        repo_root.join(STATE_DIR).join(CONFIG_FILE)
    }

    /// Load `<repo_root>/.semtag/config.toml` (defaults if absent), apply
    /// environment overrides and validate.
    pub fn load(repo_root: &Path) -> Result<Self, ConfigError> {
        let path = Self::config_path(repo_root);
        let mut config = if path.exists() {
            Self::from_path(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&contents).map_err(|reason| ConfigError::Parse {
            path: path.display().to_string(),
            reason,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            value: String::new(),
            reason: e.to_string(),
        })
    }

    /// Apply `SEMTAG_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_REGISTRY) {
            self.registry_path = path;
        }
        if let Some(remote) = lookup(ENV_REMOTE) {
            self.remote = remote;
        }
        if let Some(raw) = lookup(ENV_REPAIR_WINDOW_HOURS) {
            self.repair_window_hours =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: ENV_REPAIR_WINDOW_HOURS.to_string(),
                    value: raw.clone(),
                    reason: "must be a whole number of hours".to_string(),
                })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "registry_path".to_string(),
                value: self.registry_path.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.remote.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "remote".to_string(),
                value: self.remote.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.repair_window_hours == 0 {
            return Err(ConfigError::InvalidValue {
                field: "repair_window_hours".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.header_scan_lines == 0 {
            return Err(ConfigError::InvalidValue {
                field: "header_scan_lines".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        for env in &self.environments {
            validate_environment(env).map_err(|e| ConfigError::InvalidValue {
                field: "environments".to_string(),
                value: env.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Absolute registry path for a repository rooted at `repo_root`.
    pub fn registry_file(&self, repo_root: &Path) -> PathBuf {
        let path = Path::new(&self.registry_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            repo_root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComponentType;

    #[test]
    fn test_defaults_are_valid() {
        let config = SemtagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.repair_window_hours, 24);
        assert_eq!(config.environments, vec!["dev", "staging", "prod"]);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SemtagConfig::from_toml(
            r#"
remote = "upstream"
namespace = "logic"

[[discovery.rules]]
glob = "**/*.yaml"
type = "config"
confidence = 0.7
"#,
        )
        .unwrap();
        assert_eq!(config.remote, "upstream");
        assert_eq!(config.namespace, TagNamespace::Logic);
        assert_eq!(config.registry_path, DEFAULT_REGISTRY_PATH);
        assert_eq!(config.discovery.rules[0].component_type, ComponentType::Config);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(SemtagConfig::from_toml("remotee = \"x\"").is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = SemtagConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(SemtagConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_overrides() {
        let mut config = SemtagConfig::default();
        config
            .apply_overrides(|key| match key {
                ENV_REMOTE => Some("mirror".to_string()),
                ENV_REPAIR_WINDOW_HOURS => Some("48".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.remote, "mirror");
        assert_eq!(config.repair_window_hours, 48);

        let err = config
            .apply_overrides(|key| (key == ENV_REPAIR_WINDOW_HOURS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SemtagConfig::default();
        config.repair_window_hours = 0;
        assert!(config.validate().is_err());

        let mut config = SemtagConfig::default();
        config.environments.push("v1.0.0".to_string());
        assert!(config.validate().is_err());

        let mut config = SemtagConfig::default();
        config.remote = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SemtagConfig::load(dir.path()).unwrap();
        assert_eq!(config.header_scan_lines, DEFAULT_SCAN_LINES);
    }

    #[test]
    fn test_from_path_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "registry_path = [").unwrap();
        assert!(matches!(
            SemtagConfig::from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
