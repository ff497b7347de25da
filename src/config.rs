use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the database path
pub const DB_PATH_ENV: &str = "MODCOMPAT_DB";

/// Environment variable holding the tracing filter directive
pub const LOG_FILTER_ENV: &str = "MODCOMPAT_LOG";

/// Filter used when `MODCOMPAT_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "modcompat=info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Engine configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub propagation: PropagationConfig,
    pub cycles: CycleConfig,
}

/// Storage-related configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Database file; defaults to `<data_dir>/modcompat.db`
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PropagationConfig {
    /// How units of work opened with `Engine::begin` schedule resolution
    pub mode: PropagationMode,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CycleConfig {
    pub mode: CyclePolicy,
}

/// When derived rows are recomputed after a write
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PropagationMode {
    /// Recompute after every write
    Immediate,
    /// Collect targets and recompute once on commit
    #[default]
    Deferred,
}

/// What happens when a requirement write would close a dependency cycle
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CyclePolicy {
    /// Refuse the write
    #[default]
    Enforce,
    /// Log the cycle and persist anyway
    Advisory,
}

impl EngineConfig {
    /// Load configuration from a JSON file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the database path: config file, then `MODCOMPAT_DB`, then the data dir
    pub fn db_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .or_else(|| std::env::var_os(DB_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(db_path)
    }
}

/// Returns the path to the data directory for modcompat.
/// Uses $XDG_DATA_HOME/modcompat if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/modcompat,
/// or ./modcompat if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the default path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("modcompat.db")
}

/// Returns the default path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("modcompat.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("modcompat")
}
