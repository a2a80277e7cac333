//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a single TOML file. A missing file is
//! not an error: callers get a warning and the compiled defaults.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`MALT_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "MALT_ROOT_FOLDER";

/// Default cap for a single upload and for uncompressed archive content (25 MiB)
pub const DEFAULT_MAX_SIZE: u64 = 25 * 1024 * 1024;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Root folder for stored content (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upload ingestion limits and naming
    #[serde(default)]
    pub brewing: BrewingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Ingestion settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrewingConfig {
    /// Largest upload accepted before it is read, in bytes
    #[serde(default = "default_max_size")]
    pub max_upload_size: u64,

    /// Largest total declared size of archive members, in bytes
    #[serde(default = "default_max_size")]
    pub max_archive_size: u64,

    /// Form field name the single upload must use
    #[serde(default = "default_field_name")]
    pub field_name: String,

    /// Prefix of every URL returned by content handlers
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for BrewingConfig {
    fn default() -> Self {
        Self {
            max_upload_size: default_max_size(),
            max_archive_size: default_max_size(),
            field_name: default_field_name(),
            base_url: default_base_url(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_size() -> u64 {
    DEFAULT_MAX_SIZE
}

fn default_field_name() -> String {
    "file".to_string()
}

fn default_base_url() -> String {
    "/".to_string()
}

impl TomlConfig {
    /// Load and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse TOML text into a config
    pub fn parse(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config, falling back to defaults when the file is missing
    ///
    /// An explicit path that exists but does not parse is still an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) => path,
                None => {
                    warn!("Could not determine config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!("Config file not found: {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let config = Self::load(&path)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.brewing.field_name.trim().is_empty() {
            return Err(Error::Config("brewing.field_name must not be empty".to_string()));
        }
        if self.brewing.max_upload_size == 0 || self.brewing.max_archive_size == 0 {
            return Err(Error::Config("brewing size limits must be positive".to_string()));
        }
        Ok(())
    }
}

/// Default configuration file path for the platform
///
/// `<config_dir>/malt/malt.toml`, e.g. `~/.config/malt/malt.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("malt").join("malt.toml"))
}

/// Write config to disk atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Root folder resolution
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, config: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_value: config.root_folder.clone(),
        }
    }

    /// Resolve the root folder following the priority order above
    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        default_root_folder()
    }
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("malt"))
        .unwrap_or_else(|| PathBuf::from("./malt_data"))
}

/// Creates the root folder on first use
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            info!("Creating root folder: {}", self.root_folder.display());
            std::fs::create_dir_all(&self.root_folder)?;
        } else if !self.root_folder.is_dir() {
            return Err(Error::Config(format!(
                "Root folder is not a directory: {}",
                self.root_folder.display()
            )));
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.brewing.max_upload_size, 25 * 1024 * 1024);
        assert_eq!(config.brewing.max_archive_size, 25 * 1024 * 1024);
        assert_eq!(config.brewing.field_name, "file");
        assert_eq!(config.brewing.base_url, "/");
    }

    #[test]
    fn test_parse_empty_document_uses_defaults() {
        let config = TomlConfig::parse("").unwrap();
        assert_eq!(config, TomlConfig::default());
    }

    #[test]
    fn test_parse_partial_sections() {
        let config = TomlConfig::parse(
            "root_folder = \"/srv/malt\"\n[brewing]\nmax_archive_size = 1024\n",
        )
        .unwrap();
        assert_eq!(config.root_folder, Some(PathBuf::from("/srv/malt")));
        assert_eq!(config.brewing.max_archive_size, 1024);
        assert_eq!(config.brewing.max_upload_size, DEFAULT_MAX_SIZE);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_rejects_empty_field_name() {
        let result = TomlConfig::parse("[brewing]\nfield_name = \" \"\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_rejects_zero_limits() {
        let result = TomlConfig::parse("[brewing]\nmax_upload_size = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = TomlConfig::parse("root_folder = ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_cli_arg_wins() {
        let config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };
        let resolver = RootFolderResolver::new(Some(PathBuf::from("/from/cli")), &config);
        assert_eq!(resolver.resolve(), PathBuf::from("/from/cli"));
    }
}
