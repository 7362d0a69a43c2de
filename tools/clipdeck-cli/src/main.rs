//! Clipdeck CLI — inspect and preview timeline documents from the terminal.
//!
//! Usage:
//!   clipdeck validate <DOC>              Check a document for timeline issues
//!   clipdeck info <DOC>                  Show assets, tracks and durations
//!   clipdeck frame <DOC> --time <T>      Render one frame and print its scene
//!   clipdeck play <DOC> [--from] [--to]  Play a range through the preview loop

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clipdeck_common::config::AppConfig;
use clipdeck_common::events::PerformanceMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "clipdeck",
    about = "Frame-accurate timeline preview from the command line",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/clipdeck/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a document's timeline and asset references
    Validate {
        /// Path to the document JSON
        path: PathBuf,
    },

    /// Show document information
    Info {
        /// Path to the document JSON
        path: PathBuf,
    },

    /// Render a single frame, waiting for its textures
    Frame {
        /// Path to the document JSON
        path: PathBuf,

        /// Query time in seconds
        #[arg(short, long)]
        time: f64,

        /// Selected clip id (repeatable)
        #[arg(long = "select")]
        select: Vec<String>,

        /// Rendering mode: normal|optimized|minimal
        #[arg(long, default_value = "normal")]
        mode: PerformanceMode,

        /// Print the scene as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play a time range in real time
    Play {
        /// Path to the document JSON
        path: PathBuf,

        /// Start time in seconds
        #[arg(long, default_value = "0.0")]
        from: f64,

        /// End time in seconds (defaults to the timeline end)
        #[arg(long)]
        to: Option<f64>,

        /// Playback frame rate (defaults to the configured rate)
        #[arg(long)]
        fps: Option<u32>,

        /// Selected clip id (repeatable)
        #[arg(long = "select")]
        select: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    clipdeck_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Info { path } => commands::info::run(path),
        Commands::Frame {
            path,
            time,
            select,
            mode,
            json,
        } => commands::frame::run(config, path, time, select, mode, json).await,
        Commands::Play {
            path,
            from,
            to,
            fps,
            select,
        } => commands::play::run(config, path, from, to, fps, select).await,
    }
}
