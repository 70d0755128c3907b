//! `starnav` entry point.
//!
//! Decisions go to stdout; logs go to stderr so the output stays
//! machine-readable with `--json`.

use std::io::{Read, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use starnav_engine::{ConversationId, ConversationRegistry, ToolResolver};
use starnav_navctl::cli::load_config;
use starnav_navctl::{Cli, Command, ReplayArgs, parse_script, replay};
use tracing_subscriber::EnvFilter;

/// Exit status when a replay hit at least one stack mismatch.
const EXIT_STACK_MISMATCH: u8 = 2;

fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_script(args: &ReplayArgs) -> anyhow::Result<String> {
    if args.script.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("reading script from stdin")?;
        Ok(source)
    } else {
        std::fs::read_to_string(&args.script)
            .with_context(|| format!("reading script {}", args.script.display()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.command.config_path())?;
    init_tracing(&config.logging.filter);

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Config(_) => {
            let rendered = toml::to_string_pretty(&config).context("rendering config")?;
            stdout.write_all(rendered.as_bytes())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Replay(args) => {
            let resolver = ToolResolver::new(&config.tools);
            let script = parse_script(&read_script(&args)?, &resolver)?;
            tracing::info!(steps = script.len(), "Replaying script");

            let registry = ConversationRegistry::new(config.engine.clone());
            let conversation = registry.get_or_create(&ConversationId::from("replay")).await;
            let report = replay(&script, &conversation).await;

            if args.json {
                report.write_json(&mut stdout)?;
            } else {
                report.write_text(&mut stdout)?;
            }
            stdout.flush()?;

            if report.stack_mismatches > 0 {
                Ok(ExitCode::from(EXIT_STACK_MISMATCH))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
