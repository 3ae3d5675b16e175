//! Clear binary for removing tasks from the configured store.
//!
//! Usage: cargo run --bin clear
//!        cargo run --bin clear -- --all
//!
//! Deletes completed tasks, or every task with `--all`.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use todos::config::{self, Config, LogSettings};
use todos::store::TaskStore;
use todos::telemetry;

#[derive(Parser, Debug)]
#[command(name = "clear")]
#[command(about = "Delete completed tasks (or all tasks) from the todos store")]
struct Args {
    /// Delete every task, not only completed ones
    #[arg(long)]
    all: bool,

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

    let store = TaskStore::open(&cfg).await?;
    info!(all = args.all, backend = ?cfg.backend, "clearing tasks");
    let removed = if args.all {
        store.clear_all().await?
    } else {
        store.clear_completed().await?
    };

    let scope = if args.all { "" } else { " completed" };
    println!("Deleted {removed}{scope} task(s)");
    Ok(())
}
