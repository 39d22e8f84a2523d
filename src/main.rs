//! # vibescope CLI
//!
//! The `vibescope` binary is the operational interface for the trend cache
//! service. It provides commands for database initialization, serving the
//! HTTP API, running the retention janitor, and inspecting cache state.
//!
//! ## Usage
//!
//! ```bash
//! vibescope --config ./config/vibescope.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vibescope init` | Create the SQLite database and run schema migrations |
//! | `vibescope serve` | Start the trend API HTTP server |
//! | `vibescope refresh` | Run the retention janitor once |
//! | `vibescope stats` | Print cache and retention statistics |
//!
//! ## Environment
//!
//! | Variable | Purpose |
//! |----------|---------|
//! | `YOUTUBE_API_KEY` | YouTube Data API key (required for refreshes) |
//! | `GEMINI_API_KEY` | Annotation model key (optional; fallback otherwise) |
//! | `CRON_SECRET` | Shared secret for the `POST /cron/refresh` trigger |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use vibescope::{config, db, janitor, migrate, server, stats, store};

/// vibescope CLI — a YouTube trend cache and aggregation service.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/vibescope.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "vibescope",
    about = "vibescope — a YouTube trend cache and aggregation service",
    version,
    long_about = "vibescope maintains per-region cached snapshots of YouTube trending videos, \
    aggregates ad-hoc keyword searches into summary statistics with an LLM-assisted narrative \
    annotation, and serves both through a small JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/vibescope.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (trending_videos, cache_metadata, keyword_analyses, trend_snapshots).
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Start the trend API HTTP server.
    ///
    /// Serves `/trends`, `/analyze-keyword`, `/cron/refresh`, and `/health`
    /// on the configured bind address. Migrations run automatically.
    Serve,

    /// Run the retention janitor once.
    ///
    /// Rolls the latest batch of every region into a daily snapshot, deletes
    /// expired keyword analyses, and purges records past the retention
    /// window. Same code path as the authenticated HTTP trigger.
    Refresh,

    /// Print cache and retention statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&config).await?;
            println!("Database initialized at {}", config.db.path.display());
        }
        Commands::Serve => {
            server::run_server(&config).await?;
        }
        Commands::Refresh => {
            migrate::run_migrations(&config).await?;
            let pool = db::connect(&config).await?;
            let store = Arc::new(store::sqlite::SqliteStore::new(pool));
            let janitor = janitor::RetentionJanitor::new(store, &config.retention);

            for line in janitor.run().await {
                println!("{line}");
            }
        }
        Commands::Stats => {
            stats::run_stats(&config).await?;
        }
    }

    Ok(())
}
