use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use starnav_engine::config::{ConfigLoader, NavigationConfig};

#[derive(Debug, Parser)]
#[command(name = "starnav", version, about = "Flight-config navigation enforcement")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay an operation script and print each decision.
    Replay(ReplayArgs),
    /// Print the effective configuration as TOML.
    Config(ConfigArgs),
}

#[derive(Debug, Parser)]
pub struct ReplayArgs {
    /// Script file, or `-` for stdin.
    pub script: PathBuf,

    /// Config file (defaults to the standard search path).
    #[arg(long = "config", short = 'c')]
    pub config: Option<PathBuf>,

    /// Output as JSON lines followed by a final snapshot.
    #[arg(long = "json", short = 'j')]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    /// Config file (defaults to the standard search path).
    #[arg(long = "config", short = 'c')]
    pub config: Option<PathBuf>,
}

impl Command {
    pub fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Replay(args) => args.config.as_ref(),
            Self::Config(args) => args.config.as_ref(),
        }
    }
}

/// Load an explicit file, or fall back to the default search path.
pub fn load_config(path: Option<&PathBuf>) -> anyhow::Result<NavigationConfig> {
    match path {
        Some(path) => ConfigLoader::new()
            .with_file(path)
            .load()
            .with_context(|| format!("loading config from {}", path.display())),
        None => ConfigLoader::load_default().context("loading default config"),
    }
}
