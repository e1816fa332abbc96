use std::error::Error;
use std::path::{Path, PathBuf};

use url::Url;

use zipper_daemon::AppConfig;

/// Resolve the base URL of a running server.
///
/// Priority: explicit `--remote` flag > config file `listen_port` > default port.
pub fn resolve_remote(explicit: Option<Url>, config_path: &Path) -> Url {
    if let Some(url) = explicit {
        return url;
    }
    let port = AppConfig::load(config_path)
        .map(|config| config.listen_port)
        .unwrap_or_else(|_| AppConfig::default().listen_port);
    Url::parse(&format!("http://localhost:{}", port)).expect("hardcoded URL must parse")
}

#[derive(Clone, Debug)]
pub struct OpContext {
    /// Config file path, as given or defaulted
    pub config_path: PathBuf,
}

impl OpContext {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path: AppConfig::path(config_path),
        }
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_remote_explicit_wins() {
        let explicit = Url::parse("http://example.com:9999").unwrap();
        let result = resolve_remote(Some(explicit.clone()), Path::new("/nonexistent"));
        assert_eq!(result, explicit);
    }

    #[test]
    fn test_resolve_remote_falls_back_to_default() {
        let result = resolve_remote(None, Path::new("/nonexistent/zipper.toml"));
        assert_eq!(result.as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_resolve_remote_reads_config_port() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("zipper.toml");
        std::fs::write(&path, "listen_port = 9123\n").unwrap();

        let result = resolve_remote(None, &path);
        assert_eq!(result.port(), Some(9123));
    }
}
