use std::fs;
use std::path::{Path, PathBuf};

use common::archive::ArchiveConfig;
use object_store::ObjectStoreConfig;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "zipper";
pub const CONFIG_FILE_NAME: &str = "zipper.toml";
/// Environment variable naming the config file when `--config` is not given
pub const CONFIG_FILE_ENV: &str = "CONFIG_FILE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Port the HTTP server listens on
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Default log level, `RUST_LOG` still wins when set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily rolling log files (stdout only if not set)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Where archived objects are read from
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    /// Where manifests are looked up
    #[serde(default)]
    pub redis: RedisConfig,
    /// Archive assembly tuning
    #[serde(default)]
    pub archive: ArchiveConfig,
}

fn default_listen_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            log_level: default_log_level(),
            log_dir: None,
            object_store: ObjectStoreConfig::default(),
            redis: RedisConfig::default(),
            archive: ArchiveConfig::default(),
        }
    }
}

/// Key-value store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379/0`
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Upper bound on open connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Idle connections older than this are closed instead of reused
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Idle connections older than this are PINGed before reuse
    #[serde(default = "default_test_on_borrow_after_secs")]
    pub test_on_borrow_after_secs: u64,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_max_connections() -> usize {
    10
}

fn default_idle_timeout_secs() -> u64 {
    240
}

fn default_test_on_borrow_after_secs() -> u64 {
    60
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            max_connections: default_max_connections(),
            idle_timeout_secs: default_idle_timeout_secs(),
            test_on_borrow_after_secs: default_test_on_borrow_after_secs(),
        }
    }
}

impl AppConfig {
    /// Pick the config file: explicit path, then `CONFIG_FILE`, then `./zipper.toml`.
    pub fn path(custom_path: Option<PathBuf>) -> PathBuf {
        if let Some(path) = custom_path {
            return path;
        }
        match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(CONFIG_FILE_NAME),
        }
    }

    /// Load the config file. A missing file is an error, not a silent default.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let config_toml = fs::read_to_string(path)?;
        Self::parse(&config_toml)
    }

    pub fn parse(config_toml: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(config_toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Write `self` to `path`, refusing to overwrite an existing file.
    pub fn init(&self, path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let config_toml = toml::to_string_pretty(self)?;
        fs::write(path, config_toml)?;
        Ok(())
    }

    pub fn tracing_level(&self) -> Result<tracing::Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.tracing_level()?;
        if self.redis.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "redis.max_connections must be at least 1".to_string(),
            ));
        }
        if self.archive.copy_buffer_size == 0 || self.archive.pipe_capacity == 0 {
            return Err(ConfigError::Invalid(
                "archive buffer sizes must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0} (run `{APP_NAME} init` to create one)")]
    NotFound(PathBuf),
    #[error("config file already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use common::archive::FetchFailurePolicy;

    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.listen_port, 8000);
        assert_eq!(config.redis.max_connections, 10);
        assert_eq!(config.redis.test_on_borrow_after_secs, 60);
        assert_eq!(config.archive.on_fetch_error, FetchFailurePolicy::Skip);
    }

    #[test]
    fn test_full_file() {
        let config = AppConfig::parse(
            r#"
            listen_port = 9001
            log_level = "debug"
            log_dir = "/var/log/zipper"

            [object_store]
            type = "s3"
            bucket = "project-files"
            region = "eu-west-1"

            [redis]
            url = "redis://cache:6379/2"
            max_connections = 4

            [archive]
            copy_buffer_size = 65536
            on_fetch_error = "abort_on_transient"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_port, 9001);
        assert_eq!(config.tracing_level().unwrap(), tracing::Level::DEBUG);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/zipper")));
        assert!(matches!(
            config.object_store,
            ObjectStoreConfig::S3 { ref bucket, .. } if bucket == "project-files"
        ));
        assert_eq!(config.redis.url, "redis://cache:6379/2");
        assert_eq!(config.redis.max_connections, 4);
        assert_eq!(config.redis.idle_timeout_secs, 240);
        assert_eq!(config.archive.copy_buffer_size, 65536);
        assert_eq!(
            config.archive.on_fetch_error,
            FetchFailurePolicy::AbortOnTransient
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            AppConfig::parse(r#"log_level = "chatty""#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::parse("[redis]\nmax_connections = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::parse("listen_port = \"eighty\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_init_then_load() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("conf").join(CONFIG_FILE_NAME);

        let config = AppConfig {
            listen_port: 8123,
            ..Default::default()
        };
        config.init(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);

        assert!(matches!(
            config.init(&path),
            Err(ConfigError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("absent.toml");
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_explicit_path_wins() {
        let explicit = PathBuf::from("/etc/zipper/custom.toml");
        assert_eq!(AppConfig::path(Some(explicit.clone())), explicit);
    }
}
