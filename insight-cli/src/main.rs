//! `insight`: inspect and edit an SDG-Insight vault from the command line.
//!
//! Every command opens the vault, initializes the store, and exits. Writes
//! are sealed before the command returns.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use insight_store::{KvStore, LoadOrigin, StoreStatus};
use insight_vault::VaultConfig;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(name = "insight")]
#[command(about = "Inspect and edit an SDG-Insight vault", long_about = None)]
struct Cli {
    /// JSON vault config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// DuckDB file holding the vault (overrides the config's storage_path)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether the vault was fresh, restored, or unreadable
    Status,

    /// List keys in the state document
    Keys,

    /// Print the value stored under a key
    Get { key: String },

    /// Store a JSON value under a key
    Set {
        key: String,

        /// Value as JSON; bare words are stored as strings
        value: String,
    },

    /// Remove a key
    Remove { key: String },

    /// Remove every key
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.db)?;
    for line in execute(&config, cli.command).await? {
        println!("{line}");
    }
    Ok(())
}

/// Runs one command against a freshly opened vault and returns its output.
async fn execute(config: &VaultConfig, command: Commands) -> Result<Vec<String>> {
    debug!(path = ?config.storage_path, "opening vault");
    let store = KvStore::from_config(config).context("failed to open vault storage")?;
    store.init().await.context("failed to initialize vault")?;

    let mut out = Vec::new();
    match command {
        Commands::Status => {
            let sealed = store
                .vault()
                .sealed_record()
                .context("failed to read sealed record")?;
            out.push(format!("status: {}", describe(store.status().await)));
            out.push(format!("keys:   {}", store.keys().await.len()));
            out.push(match sealed {
                Some(record) => format!("sealed: {} bytes (base64)", record.len()),
                None => "sealed: none".to_string(),
            });
        }
        Commands::Keys => out.extend(store.keys().await),
        Commands::Get { key } => match store.get_value(&key).await {
            Some(value) => out.push(serde_json::to_string_pretty(&value)?),
            None => anyhow::bail!("no value stored under '{key}'"),
        },
        Commands::Set { key, value } => {
            store
                .set(&key, &parse_value(&value))
                .await
                .with_context(|| format!("failed to store '{key}'"))?;
        }
        Commands::Remove { key } => {
            store
                .remove(&key)
                .await
                .with_context(|| format!("failed to remove '{key}'"))?;
        }
        Commands::Clear => {
            store.clear().await.context("failed to clear vault")?;
        }
    }

    Ok(out)
}

/// Builds the vault config from `--config` and `--db`. A vault file is
/// required; an in-memory vault would drop every write on exit.
fn load_config(path: Option<&Path>, db: Option<PathBuf>) -> Result<VaultConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => VaultConfig::default(),
    };
    if db.is_some() {
        config.storage_path = db;
    }
    if config.storage_path.is_none() {
        anyhow::bail!("no vault file given: pass --db PATH or set storage_path in --config");
    }
    Ok(config)
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn describe(status: StoreStatus) -> String {
    match status {
        StoreStatus::Uninitialized => "uninitialized".to_string(),
        StoreStatus::Ready(LoadOrigin::Fresh) => "fresh (no sealed record)".to_string(),
        StoreStatus::Ready(LoadOrigin::Restored) => "restored".to_string(),
        StoreStatus::Ready(LoadOrigin::Unreadable(reason)) => {
            format!("unreadable ({reason}); next write replaces it")
        }
    }
}
