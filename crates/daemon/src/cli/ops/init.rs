use clap::Args;

use object_store::ObjectStoreConfig;
use zipper_daemon::config::{ConfigError, RedisConfig};
use zipper_daemon::AppConfig;

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Listen port
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// S3 bucket holding the archived objects (in-memory store if not set)
    #[arg(long)]
    pub bucket: Option<String>,

    /// S3 region (AWS environment if not set)
    #[arg(long, requires = "bucket")]
    pub region: Option<String>,

    /// Redis URL for manifest lookups
    #[arg(long, default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    Config(#[from] ConfigError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let object_store = match &self.bucket {
            Some(bucket) => ObjectStoreConfig::S3 {
                bucket: bucket.clone(),
                region: self.region.clone(),
                endpoint: None,
                access_key: None,
                secret_key: None,
            },
            None => ObjectStoreConfig::Memory,
        };

        let config = AppConfig {
            listen_port: self.port,
            object_store,
            redis: RedisConfig {
                url: self.redis_url.clone(),
                ..Default::default()
            },
            ..Default::default()
        };
        config.init(&ctx.config_path)?;

        Ok(format!(
            "Initialized config at: {}\n\
             - Listen port: {}\n\
             - Redis: {}\n\
             - Object store: {}",
            ctx.config_path.display(),
            config.listen_port,
            config.redis.url,
            self.bucket.as_deref().unwrap_or("memory"),
        ))
    }
}
