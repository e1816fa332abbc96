pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "zipper")]
#[command(about = "Streams zip archives of stored objects listed in short-lived manifests")]
pub struct Args {
    /// Path to the config file (defaults to ./zipper.toml)
    #[arg(long = "config", global = true, env = "CONFIG_FILE")]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
