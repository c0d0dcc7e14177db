//! Outreach CLI, the main entry point.
//!
//! Commands:
//! - `onboard`   Initialize config directory and default config
//! - `ingest`    Build the knowledge index from a product catalog
//! - `generate`  Generate one referral message for a contact
//! - `run`       Discover contacts and run an outreach campaign
//! - `doctor`    Diagnose configuration, credentials and index health

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "outreach",
    about = "Outreach: referral message generation with tiered fallback",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration directory and default config
    Onboard,

    /// Build the knowledge index from a JSON product catalog
    Ingest {
        /// Catalog file (defaults to knowledge.source_path)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Index directory (defaults to knowledge.index_dir)
        #[arg(short, long)]
        index_dir: Option<PathBuf>,
    },

    /// Generate one referral message
    Generate {
        /// Description of the contact
        #[arg(short, long)]
        contact: String,

        /// Recent chat history with the contact
        #[arg(long, default_value = "")]
        history: String,

        /// Also print the retrieved knowledge entries
        #[arg(long)]
        show_context: bool,
    },

    /// Discover contacts and run an outreach campaign
    Run {
        /// Deliver messages (also requires campaign.send_enabled = true)
        #[arg(long)]
        send: bool,

        /// Stop after this many contacts
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Diagnose configuration, credentials and index health
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Ingest { source, index_dir } => commands::ingest::run(source, index_dir).await?,
        Commands::Generate {
            contact,
            history,
            show_context,
        } => commands::generate::run(contact, history, show_context).await?,
        Commands::Run { send, limit } => commands::run::run(send, limit).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
