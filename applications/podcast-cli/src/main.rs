//! Podcast Player - headless terminal host

mod config;
mod device;
mod repl;

use crate::config::AppConfig;
use anyhow::Context;
use clap::{Parser, Subcommand};
use podcast_core::{Catalog, EpisodeListing, StaticCatalog, LATEST_EPISODE_COUNT};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "podcast-player")]
#[command(about = "Play a podcast catalog from the terminal", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PODCAST_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Catalog JSON file (overrides catalog.path)
    #[arg(long)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the latest episodes and the rest of the catalog
    List,
    /// Start the interactive player
    Play {
        /// Start playing the listing from this position
        #[arg(short, long)]
        start: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podcast_player=info,podcast_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = cli.catalog {
        config.catalog.path = path;
    }
    config.validate()?;

    let listing = load_listing(&config).await?;

    match cli.command.unwrap_or(Commands::Play { start: None }) {
        Commands::List => repl::print_listing(&listing),
        Commands::Play { start } => repl::run(&config, listing, start).await?,
    }

    Ok(())
}

async fn load_listing(config: &AppConfig) -> anyhow::Result<EpisodeListing> {
    let path = &config.catalog.path;
    let catalog = StaticCatalog::from_path(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;

    let episodes = catalog.episodes(&config.catalog.query()).await?;
    info!(
        "Loaded {} of {} catalog episodes from {}",
        episodes.len(),
        catalog.len(),
        path.display()
    );

    Ok(EpisodeListing::split(episodes, LATEST_EPISODE_COUNT))
}
