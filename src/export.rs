//! Export binary for writing every task to a JSON file.
//!
//! Usage: cargo run --bin export
//!        cargo run --bin export -- --output my_tasks.json
//!        cargo run --bin export -- --output -
//!
//! Writes the same JSON array as `GET /api/todos/export`. `-` means stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use todos::config::{self, Config, LogSettings};
use todos::store::TaskStore;
use todos::{telemetry, transfer};

#[derive(Parser, Debug)]
#[command(name = "export")]
#[command(about = "Export all todos to a JSON file")]
struct Args {
    /// Database URL (overrides DATABASE_URL from .env)
    #[arg(long)]
    db: Option<String>,

    /// Output path (default: todos-export-{year}-{month}-{day}.json)
    #[arg(long)]
    output: Option<PathBuf>,
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

    let store = TaskStore::open(&cfg).await?;
    let tasks = store.list().await?;
    info!(count = tasks.len(), backend = ?cfg.backend, "exporting tasks");
    let json = transfer::export_json(&tasks)?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("todos-export-{}.json", store.now().format("%Y-%m-%d"))));
    if output.as_os_str() == "-" {
        println!("{json}");
        return Ok(());
    }

    std::fs::write(&output, json).with_context(|| format!("writing {}", output.display()))?;
    println!("Exported {} task(s) to {}", tasks.len(), output.display());
    Ok(())
}
