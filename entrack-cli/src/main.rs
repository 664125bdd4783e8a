use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod sample;

use commands::{demo, diff, log, status};

#[derive(Parser)]
#[command(name = "entrack")]
#[command(version, about = "Dirty-checking for in-place mutated entity properties", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the sample playlists, append tracks in place and flush
    Demo {
        /// Tracks to append (defaults to one generated track per playlist)
        #[arg(short, long = "track")]
        tracks: Vec<String>,

        /// Flush without the change tracker subscribed
        #[arg(long)]
        no_tracker: bool,

        /// Revert the in-place changes from their snapshots instead of flushing them
        #[arg(long, conflicts_with = "no_tracker")]
        discard: bool,

        /// Database path
        #[arg(short, long)]
        db: Option<PathBuf>,
    },

    /// Show stored entities and the last flush
    Status {
        /// Database path
        #[arg(short, long)]
        db: Option<PathBuf>,
    },

    /// Show flush history
    Log {
        /// Number of flushes to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Database path
        #[arg(short, long)]
        db: Option<PathBuf>,
    },

    /// Show value diffs for the updates of a flush
    Diff {
        /// Flush ID or unique prefix
        flush_id: String,

        /// Database path
        #[arg(short, long)]
        db: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            tracks,
            no_tracker,
            discard,
            db,
        } => {
            demo::run(tracks, no_tracker, discard, db)?;
        }
        Commands::Status { db } => {
            status::run(db)?;
        }
        Commands::Log { limit, db } => {
            log::run(limit, db)?;
        }
        Commands::Diff { flush_id, db } => {
            diff::run(flush_id, db)?;
        }
    }

    Ok(())
}
