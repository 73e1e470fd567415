//! Configuration management
//!
//! This module handles loading, saving, and migrating the fs3 configuration
//! file. The configuration file is stored in TOML format at
//! ~/.config/fs3/config.toml, or under `$FS3_CONFIG_DIR` when set.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "FS3_CONFIG_DIR";

/// Default page size and the cap on requested page sizes
pub const DEFAULT_MAX_KEYS: usize = 1000;

/// Default read chunk size for file-backed blobs: 1 MiB
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Default multipart part size for remote uploads: 8 MiB
pub const DEFAULT_PART_SIZE: u64 = 8 * 1024 * 1024;

/// Minimum multipart part size: 5 MiB (S3 requirement)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum multipart part size: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

const DEFAULT_HOST: &str = "172.17.0.1";
const DEFAULT_PORT: &str = "4567";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// In-process engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Remote endpoint settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Conformance suite settings
    #[serde(default)]
    pub suite: SuiteConfig,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            engine: EngineConfig::default(),
            remote: RemoteConfig::default(),
            suite: SuiteConfig::default(),
        }
    }
}

/// Where the engine keeps object bodies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    /// Shared in-memory chunks
    #[default]
    Memory,
    /// One file per blob under `data_dir`
    Filesystem,
}

/// In-process engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Body storage backend
    #[serde(default)]
    pub backend: BlobBackend,

    /// Directory for the filesystem backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Read chunk size for file-backed blobs
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Default and maximum page size for listings
    #[serde(default = "default_max_keys")]
    pub max_keys: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_keys() -> usize {
    DEFAULT_MAX_KEYS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::default(),
            data_dir: None,
            chunk_size: default_chunk_size(),
            max_keys: default_max_keys(),
        }
    }
}

/// Remote S3-compatible endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Endpoint URL; derived from `HOST` and `PORT` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Access key ID
    #[serde(default = "default_access_key")]
    pub access_key: String,

    /// Secret access key
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    /// Region name sent to the endpoint
    #[serde(default = "default_region")]
    pub region: String,

    /// Use path-style bucket addressing
    #[serde(default = "default_true")]
    pub path_style: bool,

    /// Multipart part size for large uploads
    #[serde(default = "default_part_size")]
    pub part_size: u64,
}

fn default_access_key() -> String {
    "key".to_string()
}

fn default_secret_key() -> String {
    "secret".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_part_size() -> u64 {
    DEFAULT_PART_SIZE
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key: default_access_key(),
            secret_key: default_secret_key(),
            region: default_region(),
            path_style: true,
            part_size: default_part_size(),
        }
    }
}

impl RemoteConfig {
    /// Resolve the endpoint URL, falling back to the `HOST` and `PORT`
    /// environment variables
    pub fn endpoint_url(&self) -> Result<Url> {
        resolve_endpoint(
            self.endpoint.as_deref(),
            std::env::var("HOST").ok().as_deref(),
            std::env::var("PORT").ok().as_deref(),
        )
    }

    /// Part size clamped to what S3 accepts
    pub fn effective_part_size(&self) -> u64 {
        self.part_size.clamp(MIN_PART_SIZE, MAX_PART_SIZE)
    }
}

/// Build the endpoint URL from an explicit value or host and port parts
pub fn resolve_endpoint(
    endpoint: Option<&str>,
    host: Option<&str>,
    port: Option<&str>,
) -> Result<Url> {
    let raw = match endpoint {
        Some(endpoint) => endpoint.to_string(),
        None => {
            let host = host.filter(|h| !h.is_empty()).unwrap_or(DEFAULT_HOST);
            let port = port.filter(|p| !p.is_empty()).unwrap_or(DEFAULT_PORT);
            format!("http://{host}:{port}")
        }
    };

    let url = Url::parse(&raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config(format!(
            "Endpoint scheme '{other}' is not supported, use http or https"
        ))),
    }
}

/// Conformance suite settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Bucket the scenarios run in
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Size of the streamed upload/download scenario
    #[serde(default = "default_big_object_size")]
    pub big_object_size: u64,
}

fn default_bucket() -> String {
    "testbucket-plntr".to_string()
}

fn default_big_object_size() -> u64 {
    // "123456789_" repeated 7 Mi times
    10 * 7 * 1024 * 1024
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            big_object_size: default_big_object_size(),
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("fs3"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    /// If the schema version doesn't match, attempts migration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade fs3.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist.
    /// Sets file permissions to 600 (owner read/write only).
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        // Credentials may live in this file
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }

    /// Migrate configuration from older schema version
    fn migrate(&self, config: Config) -> Result<Config> {
        let mut config = config;
        tracing::debug!(
            from = config.schema_version,
            to = SCHEMA_VERSION,
            "Migrating configuration"
        );
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let manager = ConfigManager::with_path(config_path);
        (manager, temp_dir)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.engine.backend, BlobBackend::Memory);
        assert_eq!(config.engine.max_keys, 1000);
        assert_eq!(config.suite.bucket, "testbucket-plntr");
        assert_eq!(config.suite.big_object_size, 73_400_320);
        assert!(config.remote.path_style);
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (manager, _temp_dir) = temp_config_manager();
        let config = manager.load().unwrap();
        assert_eq!(config.engine.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_save_and_load() {
        let (manager, _temp_dir) = temp_config_manager();

        let mut config = Config::default();
        config.engine.backend = BlobBackend::Filesystem;
        config.engine.data_dir = Some(PathBuf::from("/var/lib/fs3"));
        config.remote.endpoint = Some("http://localhost:4567".to_string());

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(loaded.engine.backend, BlobBackend::Filesystem);
        assert_eq!(loaded.engine.data_dir, Some(PathBuf::from("/var/lib/fs3")));
        assert_eq!(
            loaded.remote.endpoint.as_deref(),
            Some("http://localhost:4567")
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(
            manager.config_path(),
            "[engine]\nbackend = \"filesystem\"\n\n[suite]\nbig_object_size = 1024\n",
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.engine.backend, BlobBackend::Filesystem);
        assert_eq!(config.engine.max_keys, DEFAULT_MAX_KEYS);
        assert_eq!(config.suite.big_object_size, 1024);
        assert_eq!(config.suite.bucket, "testbucket-plntr");
    }

    #[test]
    fn test_schema_version_too_new() {
        let (manager, _temp_dir) = temp_config_manager();

        let content = format!("schema_version = {}\n", SCHEMA_VERSION + 1);
        std::fs::write(manager.config_path(), content).unwrap();

        let result = manager.load();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("newer than supported")
        );
    }

    #[test]
    fn test_resolve_endpoint_defaults() {
        let url = resolve_endpoint(None, None, None).unwrap();
        assert_eq!(url.as_str(), "http://172.17.0.1:4567/");
    }

    #[test]
    fn test_resolve_endpoint_host_port() {
        let url = resolve_endpoint(None, Some("localhost"), Some("9000")).unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(9000));

        let url = resolve_endpoint(None, Some(""), Some("")).unwrap();
        assert_eq!(url.host_str(), Some("172.17.0.1"));
    }

    #[test]
    fn test_resolve_endpoint_explicit_wins() {
        let url = resolve_endpoint(Some("https://s3.local"), Some("ignored"), None).unwrap();
        assert_eq!(url.host_str(), Some("s3.local"));
    }

    #[test]
    fn test_resolve_endpoint_rejects_scheme() {
        assert!(matches!(
            resolve_endpoint(Some("ftp://s3.local"), None, None),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            resolve_endpoint(Some("not a url"), None, None),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_part_size_clamped() {
        let remote = RemoteConfig {
            part_size: 1024,
            ..Default::default()
        };
        assert_eq!(remote.effective_part_size(), MIN_PART_SIZE);
    }
}
