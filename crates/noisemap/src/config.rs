//! Configuration management for noisemap.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "noisemap";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "reports.db";

/// Default media directory name inside the data directory.
const MEDIA_DIR_NAME: &str = "media";

/// Prefix for environment overrides, e.g. `NOISEMAP_SERVER__PORT=8080`.
const ENV_PREFIX: &str = "NOISEMAP_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `NOISEMAP_`, nested keys split on `__`)
/// 2. TOML config file at `~/.config/noisemap/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Media configuration.
    pub media: MediaConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Largest accepted request body (the media upload dominates).
    pub max_upload_bytes: usize,
    /// Allow any origin, method and header.
    pub cors_permissive: bool,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/noisemap/reports.db`
    pub database_path: Option<PathBuf>,
}

/// Media-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory uploads are written to and served from.
    /// Defaults to `~/.local/share/noisemap/media`
    pub directory: Option<PathBuf>,
    /// Sub-folder for report media.
    pub folder: String,
    /// URL prefix under which the media directory is reachable.
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 50 * 1024 * 1024,
            cors_permissive: true,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            directory: None, // Will be resolved to default at runtime
            folder: "noise_reports".to_string(),
            public_base_url: "/media".to_string(),
        }
    }
}

impl MediaConfig {
    /// Get the media directory, resolving defaults if not set.
    #[must_use]
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| Config::default_data_dir().join(MEDIA_DIR_NAME))
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `NOISEMAP_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::ConfigValidation {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if self.server.max_upload_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "server.max_upload_bytes must be greater than 0".to_string(),
            });
        }

        self.bind_address()?;

        let folder = self.media.folder.trim();
        if folder.is_empty() || folder.contains(['/', '\\']) || folder == ".." {
            return Err(Error::ConfigValidation {
                message: format!(
                    "media.folder must be a single directory name, got {:?}",
                    self.media.folder
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the socket address the server binds to.
    ///
    /// # Errors
    ///
    /// Returns an error if `server.host` is not an IP address.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| Error::ConfigValidation {
                message: format!("invalid server.host {:?}: {e}", self.server.host),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert!(config.server.cors_permissive);
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.media.folder, "noise_reports");
        assert_eq!(config.media.public_base_url, "/media");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("server.port"));
    }

    #[test]
    fn test_validate_zero_upload_limit() {
        let mut config = Config::default();
        config.server.max_upload_bytes = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_upload_bytes"));
    }

    #[test]
    fn test_validate_bad_host() {
        let mut config = Config::default();
        config.server.host = "not a host".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("server.host"));
    }

    #[test]
    fn test_validate_media_folder() {
        let mut config = Config::default();
        config.media.folder = "a/b".to_string();
        assert!(config.validate().is_err());

        config.media.folder = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_address() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 8080;

        assert_eq!(
            config.bind_address().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("reports.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_media_directory_default() {
        let dir = MediaConfig::default().resolved_directory();
        assert!(dir.ends_with("noisemap/media"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("noisemap"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("noisemap_config_{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
            [server]
            port = 8088

            [storage]
            database_path = "/srv/noisemap/reports.db"

            [media]
            public_base_url = "https://cdn.example.org/noise"
            "#,
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/srv/noisemap/reports.db")
        );
        assert_eq!(config.media.public_base_url, "https://cdn.example.org/noise");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!("noisemap_config_{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[server]\nport = 0\n").unwrap();

        assert!(Config::load_from(Some(path.clone())).is_err());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_server_config_deserialize() {
        let json = r#"{"port": 9000}"#;
        let server: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(server.port, 9000);
        assert_eq!(server.host, "0.0.0.0");
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("max_upload_bytes"));
        assert!(json.contains("public_base_url"));
    }
}
