//! User configuration read from `config.toml`.

use std::collections::BTreeMap;
use std::env;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Overrides the location of the configuration file.
pub const CONFIG_PATH_VAR: &str = "LLMCLI_CONFIG";

#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for [`Config`].
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path_display(path), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {}", path_display(path), source)
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Adapter used when `--api` is not given.
    pub default_adapter: Option<String>,
    /// Replaces the built-in default system prompt.
    pub system_prompt: Option<String>,
    /// Printed between messages instead of the terminal-wide rule.
    pub separator: Option<String>,
    /// `key=value` parameters per adapter id, applied before command-line
    /// options.
    #[serde(default)]
    pub adapter_options: BTreeMap<String, Vec<String>>,
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::load_from_path(&path),
            None => {
                debug!("no configuration directory available, using defaults");
                Ok(Config::default())
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;
        debug!(path = %config_path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_VAR) {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("", "", "llmcli").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Configured parameters for an adapter id, in file order.
    pub fn options_for(&self, adapter_id: &str) -> &[String] {
        self.adapter_options
            .get(adapter_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Display a path with the home directory shortened to `~`.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    if let Some(dirs) = directories::BaseDirs::new() {
        if let Ok(relative) = path.strip_prefix(dirs.home_dir()) {
            return format!("~/{}", relative.display());
        }
    }

    path.display().to_string()
}
