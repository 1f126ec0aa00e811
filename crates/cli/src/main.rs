//! Lunera CLI - Database migrations and catalog repair tools.
//!
//! # Usage
//!
//! ```bash
//! # Run reconciler database migrations
//! lunera-cli migrate
//!
//! # Rebuild the variant lookup index from a full catalog scan
//! lunera-cli repair index
//!
//! # Recompute aggregates for every storefront product
//! lunera-cli repair aggregates
//!
//! # Register a storefront
//! lunera-cli storefront add -n LUNERA -d "Lunera" --default
//!
//! # List registered storefronts
//! lunera-cli storefront list
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `repair` - Rebuild derived state (lookup index, product aggregates)
//! - `storefront` - Manage the storefront registry

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lunera-cli")]
#[command(author, version, about = "Lunera CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Rebuild derived catalog state
    Repair {
        #[command(subcommand)]
        target: RepairTarget,
    },
    /// Manage the storefront registry
    Storefront {
        #[command(subcommand)]
        action: StorefrontAction,
    },
}

#[derive(Subcommand)]
enum RepairTarget {
    /// Rebuild the variant lookup index from a full catalog scan
    Index,
    /// Recompute aggregates for every storefront product
    Aggregates,
}

#[derive(Subcommand)]
enum StorefrontAction {
    /// Register a storefront (or update its registry entry)
    Add {
        /// Partition name (e.g. LUNERA)
        #[arg(short, long)]
        name: String,
        /// Human-readable name
        #[arg(short, long)]
        display_name: String,
        /// Mark as the default storefront
        #[arg(long)]
        default: bool,
    },
    /// List registered storefronts
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Repair { target } => match target {
            RepairTarget::Index => commands::repair::index().await,
            RepairTarget::Aggregates => commands::repair::aggregates().await,
        },
        Commands::Storefront { action } => match action {
            StorefrontAction::Add {
                name,
                display_name,
                default,
            } => commands::storefront::add(&name, &display_name, default).await,
            StorefrontAction::List => commands::storefront::list().await,
        },
    };

    if let Err(error) = result {
        tracing::error!(error = %error, "Command failed");
        std::process::exit(1);
    }
}
