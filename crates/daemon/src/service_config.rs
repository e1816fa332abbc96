use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use common::archive::ArchiveConfig;
use object_store::ObjectStoreConfig;

use crate::config::{AppConfig, ConfigError, RedisConfig};

/// Everything the running service needs, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    pub listen_addr: SocketAddr,

    // backends
    /// Where archived objects are read from
    pub object_store: ObjectStoreConfig,
    /// Where manifests are looked up
    pub redis: RedisConfig,
    pub archive: ArchiveConfig,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Build from the file config, with optional command line overrides.
    pub fn from_app_config(
        app: &AppConfig,
        listen_port: Option<u16>,
        log_level: Option<tracing::Level>,
    ) -> Result<Self, ConfigError> {
        let log_level = match log_level {
            Some(level) => level,
            None => app.tracing_level()?,
        };
        let port = listen_port.unwrap_or(app.listen_port);

        Ok(Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            object_store: app.object_store.clone(),
            redis: app.redis.clone(),
            archive: app.archive.clone(),
            log_level,
            log_dir: app.log_dir.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let app = AppConfig::default();

        let config = Config::from_app_config(&app, None, None).unwrap();
        assert_eq!(config.listen_addr.port(), 8000);
        assert_eq!(config.log_level, tracing::Level::INFO);

        let config =
            Config::from_app_config(&app, Some(9100), Some(tracing::Level::TRACE)).unwrap();
        assert_eq!(config.listen_addr.port(), 9100);
        assert_eq!(config.log_level, tracing::Level::TRACE);
    }
}
