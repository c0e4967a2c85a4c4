//! Mock Mapping Sync - CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use mock_mapping_sync::{EngineConfig, EventHandler, MappingSyncEvent};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "mock-mapping-sync",
    about = "Push JSON fixtures to mock server admin APIs on command",
    version
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "mock-mapping-sync.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Override the fixtures directory from the configuration file
    #[arg(long, value_name = "DIR")]
    fixtures_dir: Option<PathBuf>,

    /// Override the comma-separated mock server URLs
    #[arg(long, value_name = "URLS")]
    urls: Option<String>,

    /// File with one `command|settings` line per command to dispatch
    #[arg(long, value_name = "FILE", conflicts_with = "command")]
    script: Option<PathBuf>,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Command to dispatch (change-mappings, change-import, change-settings)
    command: Option<String>,

    /// Settings for the command, e.g. "file=delay.json;delay=400"
    #[arg(default_value = "")]
    settings: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        let default_config = include_str!("../config/default-config.yaml");
        println!("{}", default_config);
        return Ok(());
    }

    let mut config = if args.config.exists() {
        info!(path = ?args.config, "Loading configuration");
        EngineConfig::from_file(&args.config)
            .with_context(|| format!("Failed to load configuration {}", args.config.display()))?
    } else {
        info!(path = ?args.config, "Configuration file not found, using command line only");
        EngineConfig::default()
    };
    if let Some(dir) = args.fixtures_dir {
        config.fixtures_dir = Some(dir);
    }
    if let Some(urls) = args.urls {
        config.urls = Some(urls);
    }

    let event = MappingSyncEvent::on_setup(config)?;

    if args.validate {
        println!(
            "Configuration is valid ({} targets)",
            event.engine().target_urls().len()
        );
        return Ok(());
    }

    let commands = match (&args.script, args.command) {
        (Some(script), _) => read_script(script)?,
        (None, Some(command)) => vec![(command, args.settings)],
        (None, None) => {
            info!(commands = ?event.allowed_commands(), "No command given");
            Vec::new()
        }
    };

    for (name, settings) in &commands {
        event.on_command(name, settings).await?;
    }

    event.on_teardown();
    Ok(())
}

/// Read `command|settings` lines, skipping blanks and `#` comments.
fn read_script(path: &Path) -> Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    Ok(parse_script(&content))
}

fn parse_script(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once('|') {
            Some((name, settings)) => (name.trim().to_string(), settings.trim().to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect()
}
