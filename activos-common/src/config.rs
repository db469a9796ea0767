//! Bootstrap configuration and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is not an error: the compiled defaults are used and a
//! warning is logged.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Database file created inside the root folder
pub const DATABASE_FILE_NAME: &str = "activos.db";

/// Bootstrap configuration loaded from TOML
///
/// These settings cannot change while the service is running.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database path; overrides `<root_folder>/activos.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of areas reported in the plan discrepancy ranking
    #[serde(default = "default_top_areas_limit")]
    pub top_areas_limit: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_path: None,
            host: default_host(),
            port: default_port(),
            top_areas_limit: default_top_areas_limit(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5830
}

fn default_top_areas_limit() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::parse(content, "text")
    }

    fn parse(content: &str, origin: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            origin: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            origin: origin.clone(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, &origin)
    }

    /// Load from the explicit path if given, else from the platform config
    /// location, else fall back to compiled defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            // An explicitly requested file must exist
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            None => {
                warn!("No configuration file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    /// Database file location for a resolved root folder
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| root_folder.join(DATABASE_FILE_NAME))
    }
}

/// Resolve the root folder following the four-tier priority order
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    get_default_root_folder()
}

/// Platform configuration file, if one exists
///
/// Linux checks ~/.config/activos/conteo.toml then /etc/activos/conteo.toml.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("activos").join("conteo.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/activos/conteo.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
pub fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/activos (or /var/lib/activos for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("activos"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/activos"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("activos"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/activos"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("activos"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\activos"))
    } else {
        PathBuf::from("./activos_data")
    }
}
