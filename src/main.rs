//! chess3d: play against the engine from a terminal.
//!
//! ## Usage
//!
//! - `chess3d` - new game with default settings
//! - `chess3d --config settings.json` - settings from a JSON file
//! - `chess3d --pgn game.pgn` - continue a saved game
//! - `chess3d --print-schema` - print the settings file schema

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chess3d::app::Driver;
use chess3d::config::SessionConfig;
use chess3d::models::GameSession;

#[derive(Parser)]
#[command(name = "chess3d")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transcript to load at start
    #[arg(long, conflicts_with = "fen")]
    pgn: Option<PathBuf>,

    /// Position to start from
    #[arg(long)]
    fen: Option<String>,

    /// Print the JSON schema of the settings file and exit
    #[arg(long)]
    print_schema: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.print_schema {
        println!("{}", SessionConfig::schema_json()?);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => SessionConfig::default(),
    };
    info!(engine = ?config.engine, budget = ?config.budget(), "starting");

    let mut game = GameSession::from_config(&config);
    if let Some(path) = &cli.pgn {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        game.load_movetext(&text)
            .with_context(|| format!("failed to replay {}", path.display()))?;
    } else if let Some(fen) = &cli.fen {
        game.load_fen(fen).context("invalid starting position")?;
    } else {
        game.new_game(config.human_color, config.level)?;
    }

    let mut driver = Driver::new(game, io::stdout());
    driver.run(io::stdin().lock())
}
