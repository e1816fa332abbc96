use std::time::Duration;

use clap::Args;
use url::Url;

use zipper_daemon::AppConfig;

use crate::cli::op::resolve_remote;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Args, Debug, Clone)]
pub struct Health {
    /// Server to probe (defaults to localhost on the configured port)
    #[arg(long)]
    pub remote: Option<Url>,
}

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Health check failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = HealthError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        // 1. Check config file
        lines.push("Config:".to_string());
        lines.push(format!("  path:        {}", ctx.config_path.display()));
        match AppConfig::load(&ctx.config_path) {
            Ok(config) => {
                lines.push("  zipper.toml: OK".to_string());
                lines.push(format!("  listen_port: {}", config.listen_port));
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        // 2. Probe the server
        let base = resolve_remote(self.remote.clone(), &ctx.config_path);
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| HealthError::Failed(e.to_string()))?;

        lines.push(String::new());
        lines.push(format!("Server ({}):", base));

        let root = base.as_str().trim_end_matches('/');
        let probes = [
            ("health", format!("{}/?health", root)),
            ("livez ", format!("{}/_status/livez", root)),
            ("readyz", format!("{}/_status/readyz", root)),
        ];
        for (name, url) in probes {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    lines.push(format!("  {}: OK", name));
                }
                Ok(resp) => {
                    lines.push(format!("  {}: UNHEALTHY ({})", name, resp.status()));
                }
                Err(_) => {
                    lines.push(format!("  {}: NOT REACHABLE", name));
                }
            }
        }

        Ok(lines.join("\n"))
    }
}
