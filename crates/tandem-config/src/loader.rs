//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{LibraryConfig, LoggingConfig, ProjectConfig, ProxyConfig, RedirectConfig};
use crate::{ConfigError, ConfigResult, PROJECT_CONFIG_FILE};
use std::env;
use std::path::{Path, PathBuf};

/// Marker used for foreign frames when nothing is configured
pub const DEFAULT_FOREIGN_MARKER: &str = "external";

/// Log filter used when nothing is configured
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.tandem/config.toml) - lowest priority
/// 2. Project config (./tandem.toml) - overrides global
/// 3. Environment variables (TANDEM_*) - overrides project
/// 4. Programmatic overrides - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where tandem.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use a specific global config file instead of ~/.tandem/config.toml
    pub fn with_global_config_path(mut self, path: PathBuf) -> Self {
        self.global_config_path = Some(path);
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find tandem.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;

        // A missing home directory just means there is no global layer
        let global_config = match self.load_global_config() {
            Ok(config) => config,
            Err(ConfigError::HomeNotFound) => GlobalConfig::default(),
            Err(e) => return Err(e),
        };

        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = match self.load_global_config() {
            Ok(config) => config,
            Err(ConfigError::HomeNotFound) => GlobalConfig::default(),
            Err(e) => return Err(e),
        };
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config), or a default config with no root
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration from ~/.tandem/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = GlobalConfig::global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        // Global config is optional - if it doesn't exist, return default
        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to project config
    ///
    /// Recognized variables: TANDEM_LIBRARY, TANDEM_LOG, TANDEM_REDIRECT_STDOUT,
    /// TANDEM_REDIRECT_STDERR, TANDEM_KEEP_AS_DAEMON
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(library) = env::var("TANDEM_LIBRARY") {
            config
                .library
                .get_or_insert_with(LibraryConfig::default)
                .path = Some(library);
        }

        if let Ok(filter) = env::var("TANDEM_LOG") {
            config
                .logging
                .get_or_insert_with(LoggingConfig::default)
                .filter = Some(filter);
        }

        if let Ok(stdout) = env::var("TANDEM_REDIRECT_STDOUT") {
            config
                .redirect
                .get_or_insert_with(RedirectConfig::default)
                .stdout = Some(parse_flag("TANDEM_REDIRECT_STDOUT", &stdout)?);
        }

        if let Ok(stderr) = env::var("TANDEM_REDIRECT_STDERR") {
            config
                .redirect
                .get_or_insert_with(RedirectConfig::default)
                .stderr = Some(parse_flag("TANDEM_REDIRECT_STDERR", &stderr)?);
        }

        if let Ok(daemon) = env::var("TANDEM_KEEP_AS_DAEMON") {
            config
                .proxy
                .get_or_insert_with(ProxyConfig::default)
                .keep_as_daemon = Some(parse_flag("TANDEM_KEEP_AS_DAEMON", &daemon)?);
        }

        // Environment values go through the same checks as file values
        config.validate()?;
        Ok(config)
    }

    /// Get the global configuration directory (~/.tandem)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".tandem"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_flag(variable: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: variable.to_string(),
            reason: format!("'{}' is not a boolean (use true/false, 1/0, yes/no)", value),
        }),
    }
}

impl Config {
    /// Get the configured library path or name
    pub fn library_path(&self) -> Option<&str> {
        self.project.library_path()
    }

    /// Library search paths: project root, project paths, then global paths
    ///
    /// Relative project paths are resolved against the project root.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(root) = &self.project_root {
            paths.push(root.clone());
        }
        for path in self.project.search_paths() {
            match &self.project_root {
                Some(root) if path.is_relative() => paths.push(root.join(path)),
                _ => paths.push(path.clone()),
            }
        }
        paths.extend(self.global.search_paths().iter().cloned());
        paths
    }

    /// Get the effective log filter (project > global > default)
    pub fn log_filter(&self) -> &str {
        self.project
            .log_filter()
            .or_else(|| self.global.default_log_filter())
            .unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Whether host stdout should be forwarded
    pub fn redirect_stdout(&self) -> bool {
        self.project
            .redirect
            .as_ref()
            .and_then(|r| r.stdout)
            .unwrap_or(false)
    }

    /// Whether host stderr should be forwarded
    pub fn redirect_stderr(&self) -> bool {
        self.project
            .redirect
            .as_ref()
            .and_then(|r| r.stderr)
            .unwrap_or(false)
    }

    /// Whether released proxies are kept alive as daemons
    pub fn keep_as_daemon(&self) -> bool {
        self.project
            .proxy
            .as_ref()
            .and_then(|p| p.keep_as_daemon)
            .unwrap_or(false)
    }

    /// Get the effective foreign frame marker
    pub fn foreign_marker(&self) -> &str {
        self.project
            .foreign_marker()
            .unwrap_or(DEFAULT_FOREIGN_MARKER)
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has tandem.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}
