//! shapley: command line client for the attribution ledger.
//!
//! Reads and writes attribution records through a file-backed ledger.
//! Output is JSON on stdout; logs go to stderr.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shapley_ledger::FileLedger;
use shapley_store::RecordStore;
use tracing::{debug, info};

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "shapley")]
#[command(about = "Submit and list ad attribution records on a key-value ledger")]
struct Cli {
    /// Data directory holding config.toml and the ledger image
    #[arg(short, long, env = "SHAPLEY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Advertiser address (overrides config file)
    #[arg(long, env = "SHAPLEY_ADVERTISER")]
    advertiser: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show ledger availability and key index health
    Status,
    /// List records, newest first
    List {
        /// Show only the N records with the highest contribution score
        #[arg(long)]
        top: Option<usize>,
    },
    /// Submit a new attribution record
    Submit {
        #[arg(long)]
        campaign: String,
        #[arg(long, default_value = "")]
        impressions: String,
        #[arg(long, default_value = "")]
        clicks: String,
        #[arg(long, default_value = "")]
        conversions: String,
    },
    /// Show totals and the average contribution score
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Load config
    let data_dir = cli.data_dir.unwrap_or_else(config::default_data_dir);
    let config = CliConfig::load(&data_dir)?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.advanced.log_level)),
        )
        .init();

    // 3. Open ledger and store
    let ledger_path = config.ledger_path(&data_dir);
    debug!(?ledger_path, "opening ledger");
    let advertiser = cli
        .advertiser
        .unwrap_or_else(|| config.account.advertiser.clone());
    let store = RecordStore::new(FileLedger::new(ledger_path), advertiser)
        .with_config(config.store.clone());

    // 4. Dispatch
    let output = match cli.command {
        Command::Status => commands::status(&store).await?,
        Command::List { top } => commands::list(&store, top).await?,
        Command::Submit {
            campaign,
            impressions,
            clicks,
            conversions,
        } => {
            info!(%campaign, "submitting attribution record");
            commands::submit(&store, &campaign, &impressions, &clicks, &conversions).await?
        }
        Command::Stats => commands::stats(&store).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
