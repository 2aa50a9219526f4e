use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use badgerec::backup::BackupMethod;
use badgerec::config::BadgeRecConfig;
use badgerec::engine::RecommendEngine;
use badgerec::record::Namespace;

#[derive(Parser)]
#[command(name = "badgerec", version, about = "Open badge recommendation engine")]
struct Cli {
    /// Path to the config file (default: ~/.badgerec/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest badge/user JSON files from a directory into the vector index
    Ingest {
        /// Directory containing .json record files
        dir: PathBuf,
        /// Force the record kind instead of detecting it (badge or user)
        #[arg(long)]
        kind: Option<Namespace>,
    },
    /// Generate badge recommendations for a user
    Recommend {
        user_id: String,
        /// Number of recommendations to request
        #[arg(long)]
        count: Option<usize>,
    },
    /// Show a user's stored profile
    Profile { user_id: String },
    /// List badges similar to a user's profile, acquired badges excluded
    Similar {
        user_id: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Delete a vector, snapshotting it for later restore
    Delete {
        id: String,
        /// Backup store for the pre-delete snapshot (memory or file)
        #[arg(long, default_value = "file")]
        method: BackupMethod,
    },
    /// Restore a previously deleted vector within the retention window
    Restore { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BadgeRecConfig::load_from(path)?,
        None => BadgeRecConfig::load()?,
    };

    // Log to stderr so stdout stays clean for JSON output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let engine = RecommendEngine::new(&config)?;

    match cli.command {
        Command::Ingest { dir, kind } => {
            let report = engine.ingest(&dir, kind).await?;
            print_json(&report)?;
        }
        Command::Recommend { user_id, count } => {
            let response = engine.recommend(&user_id, count).await;
            print_json(&response)?;
        }
        Command::Profile { user_id } => match engine.user_profile(&user_id).await? {
            Some(profile) => print_json(&profile)?,
            None => println!("no profile found for {user_id}"),
        },
        Command::Similar { user_id, top_k } => {
            let matches = engine.similar_badges(&user_id, top_k).await?;
            print_json(&matches)?;
        }
        Command::Delete { id, method } => {
            let outcome = engine.delete_with_backup(&id, method).await?;
            print_json(&outcome)?;
        }
        Command::Restore { id } => {
            let outcome = engine.restore(&id).await?;
            print_json(&outcome)?;
        }
    }

    engine.shutdown();
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
