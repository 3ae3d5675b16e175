//! Import binary for merging tasks from a JSON export.
//!
//! Usage: cargo run --bin import -- todos-export-2026-10-17.json
//!
//! Every record becomes a new task with a fresh id. Nothing is written unless
//! every record is valid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use todos::config::{self, Config, LogSettings};
use todos::store::TaskStore;
use todos::{telemetry, transfer};

#[derive(Parser, Debug)]
#[command(name = "import")]
#[command(about = "Import todos from a JSON file")]
struct Args {
    /// JSON file holding an array of tasks
    file: PathBuf,

    /// Database URL (overrides DATABASE_URL from .env)
    #[arg(long)]
    db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    config::load_dotenv()?;
    telemetry::init_tracing(&LogSettings::from_env())?;
    let mut cfg = Config::from_env();
    if let Some(db) = args.db {
        cfg.database_url = db;
    }

    let raw = std::fs::read_to_string(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let records = transfer::parse_import(&raw)?;
    info!(file = %args.file.display(), records = records.len(), "read import file");

    let store = TaskStore::open(&cfg).await?;
    let created = transfer::import(&store, records).await?;
    println!("Imported {} task(s) from {}", created.len(), args.file.display());
    Ok(())
}
