//! Global Configuration (~/.tandem/config.toml)
//!
//! Handles user-level configuration stored in `~/.tandem/config.toml`.

use crate::project::validate_filter;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.tandem/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Log filter used when the project does not set one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,

    /// Library search paths appended after the project's own
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(filter) = self.default_log_filter() {
            validate_filter("defaults.log_filter", filter)?;
        }
        Ok(())
    }

    /// Get the global config file path (~/.tandem/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".tandem").join("config.toml"))
    }

    /// Get the default log filter
    pub fn default_log_filter(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.log_filter.as_deref())
    }

    /// Get the default library search paths
    pub fn search_paths(&self) -> &[PathBuf] {
        self.defaults
            .as_ref()
            .map(|d| d.search_paths.as_slice())
            .unwrap_or(&[])
    }

    /// Merge another global config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &GlobalConfig) {
        if other.defaults.is_some() {
            self.defaults = other.defaults.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_config() {
        let toml = r#"
[defaults]
log_filter = "info"
search_paths = ["/usr/local/lib/tandem"]
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_log_filter(), Some("info"));
        assert_eq!(
            config.search_paths(),
            &[PathBuf::from("/usr/local/lib/tandem")]
        );
    }

    #[test]
    fn test_blank_filter_rejected() {
        let config = GlobalConfig {
            defaults: Some(DefaultsConfig {
                log_filter: Some(" ".to_string()),
                search_paths: vec![],
            }),
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_configs() {
        let mut base = GlobalConfig::default();
        let override_config = GlobalConfig {
            defaults: Some(DefaultsConfig {
                log_filter: Some("debug".to_string()),
                search_paths: vec![],
            }),
        };

        base.merge(&override_config);
        assert_eq!(base.default_log_filter(), Some("debug"));
    }
}
