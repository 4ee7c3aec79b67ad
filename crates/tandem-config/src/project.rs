//! Project Configuration (tandem.toml)
//!
//! Handles project-level configuration stored in `tandem.toml` at the project root.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration from tandem.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Native library that implements the foreign side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<LibraryConfig>,

    /// Standard stream redirection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectConfig>,

    /// Interface proxy behaviour
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,

    /// Exception translation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceConfig>,

    /// Logging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Native library configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// Library path or bare library name (e.g. "tandem_node")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Extra directories searched when `path` is a bare name
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}

/// Stream redirection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RedirectConfig {
    /// Forward host stdout to the foreign side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<bool>,

    /// Forward host stderr to the foreign side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<bool>,
}

/// Proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// Keep released proxies alive as daemons until explicitly cleared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_as_daemon: Option<bool>,
}

/// Exception translation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TraceConfig {
    /// Declaring type attached to frames parsed from foreign traces
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_marker: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive (e.g. "tandem_bridge=debug")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl ProjectConfig {
    /// Load project configuration from a file
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

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(library) = &self.library {
            if let Some(path) = &library.path {
                if path.trim().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "library.path".to_string(),
                        reason: "path cannot be empty".to_string(),
                    });
                }
            }
            if library.search_paths.iter().any(|p| p.as_os_str().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: "library.search_paths".to_string(),
                    reason: "search paths cannot be empty".to_string(),
                });
            }
        }

        if let Some(marker) = self.trace.as_ref().and_then(|t| t.foreign_marker.as_deref()) {
            if !is_valid_marker(marker) {
                return Err(ConfigError::InvalidValue {
                    field: "trace.foreign_marker".to_string(),
                    reason: format!("invalid marker '{}'", marker),
                });
            }
        }

        if let Some(filter) = self.logging.as_ref().and_then(|l| l.filter.as_deref()) {
            validate_filter("logging.filter", filter)?;
        }

        Ok(())
    }

    /// Get the configured library path or name, if present
    pub fn library_path(&self) -> Option<&str> {
        self.library.as_ref().and_then(|l| l.path.as_deref())
    }

    /// Get the configured library search paths
    pub fn search_paths(&self) -> &[PathBuf] {
        self.library
            .as_ref()
            .map(|l| l.search_paths.as_slice())
            .unwrap_or(&[])
    }

    /// Get the configured log filter, if present
    pub fn log_filter(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.filter.as_deref())
    }

    /// Get the configured foreign frame marker, if present
    pub fn foreign_marker(&self) -> Option<&str> {
        self.trace.as_ref().and_then(|t| t.foreign_marker.as_deref())
    }

    /// Merge another project config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &ProjectConfig) {
        if other.library.is_some() {
            self.library = other.library.clone();
        }
        if other.redirect.is_some() {
            self.redirect = other.redirect.clone();
        }
        if other.proxy.is_some() {
            self.proxy = other.proxy.clone();
        }
        if other.trace.is_some() {
            self.trace = other.trace.clone();
        }
        if other.logging.is_some() {
            self.logging = other.logging.clone();
        }
    }
}

/// Markers end up as the declaring type of foreign frames, so keep them identifier-like
fn is_valid_marker(marker: &str) -> bool {
    !marker.is_empty()
        && marker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '$'))
}

pub(crate) fn validate_filter(field: &str, filter: &str) -> ConfigResult<()> {
    if filter.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "filter cannot be empty".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_project_config() {
        let toml = r#"
[library]
path = "native/libtandem_node.so"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.library_path(), Some("native/libtandem_node.so"));
        assert!(config.search_paths().is_empty());
    }

    #[test]
    fn test_parse_full_project_config() {
        let toml = r#"
[library]
path = "tandem_node"
search_paths = ["native", "/opt/tandem/lib"]

[redirect]
stdout = true
stderr = false

[proxy]
keep_as_daemon = true

[trace]
foreign_marker = "node"

[logging]
filter = "tandem_bridge=debug"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.library_path(), Some("tandem_node"));
        assert_eq!(config.search_paths().len(), 2);
        assert_eq!(config.foreign_marker(), Some("node"));
        assert_eq!(config.log_filter(), Some("tandem_bridge=debug"));
        assert_eq!(config.redirect.as_ref().unwrap().stdout, Some(true));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[redirect]
stdin = true
"#;
        assert!(toml::from_str::<ProjectConfig>(toml).is_err());
    }

    #[test]
    fn test_marker_validation() {
        assert!(is_valid_marker("external"));
        assert!(is_valid_marker("js.Runtime$1"));
        assert!(!is_valid_marker(""));
        assert!(!is_valid_marker("has space"));
    }

    #[test]
    fn test_empty_library_path_rejected() {
        let config = ProjectConfig {
            library: Some(LibraryConfig {
                path: Some("  ".to_string()),
                search_paths: vec![],
            }),
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_merge_configs() {
        let mut base = ProjectConfig::default();
        let override_config = ProjectConfig {
            trace: Some(TraceConfig {
                foreign_marker: Some("override".to_string()),
            }),
            ..Default::default()
        };

        base.merge(&override_config);
        assert_eq!(base.foreign_marker(), Some("override"));
    }
}
