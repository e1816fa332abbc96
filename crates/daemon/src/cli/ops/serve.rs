use clap::Args;

use zipper_daemon::process::ServiceError;
use zipper_daemon::{spawn_service, AppConfig, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Serve {
    /// Override the listen port (default from config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Override the log level (default from config)
    #[arg(long)]
    pub log_level: Option<tracing::Level>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("config error: {0}")]
    Config(#[from] zipper_daemon::config::ConfigError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Serve {
    type Error = ServeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let app_config = AppConfig::load(&ctx.config_path)?;
        let config = ServiceConfig::from_app_config(&app_config, self.port, self.log_level)?;

        spawn_service(&config).await?;
        Ok("server stopped".to_string())
    }
}
