//! Velora operations CLI.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog
//! velora products list
//!
//! # Inspect one product
//! velora products show 68a1f00d2c3b
//!
//! # Delete a product (admin token required)
//! velora products delete 68a1f00d2c3b
//!
//! # List every order (admin token required)
//! velora orders list
//!
//! # Move an order through the lifecycle (admin token required)
//! velora orders set-status 66f2a19b shipped
//!
//! # Check that the remote API answers
//! velora ping
//! ```
//!
//! # Environment Variables
//!
//! - `VELORA_API_BASE_URL` - Base URL of the remote API
//! - `VELORA_ADMIN_TOKEN` - Bearer token for admin commands

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use velora_core::{OrderId, OrderStatus, ProductId};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "velora")]
#[command(author, version, about = "Velora operations CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and manage the catalog
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Inspect and manage orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Check that the remote API answers
    Ping,
}

#[derive(Subcommand)]
enum ProductAction {
    /// List the whole catalog
    List,
    /// Show one product in full
    Show {
        /// Product id
        id: ProductId,
    },
    /// Delete a product (admin token required)
    Delete {
        /// Product id
        id: ProductId,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List every order (admin token required)
    List,
    /// Move an order to a new lifecycle status (admin token required)
    SetStatus {
        /// Order id
        id: OrderId,
        /// Target status: pending, processing, shipped, delivered, cancelled
        status: OrderStatus,
    },
}

#[tokio::main]
async fn main() {
    // Diagnostics go to stderr so command output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("velora_cli=warn,velora_api=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        tracing::error!("Command failed: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Products { action } => match action {
            ProductAction::List => commands::products::list().await?,
            ProductAction::Show { id } => commands::products::show(&id).await?,
            ProductAction::Delete { id } => commands::products::delete(&id).await?,
        },
        Commands::Orders { action } => match action {
            OrderAction::List => commands::orders::list().await?,
            OrderAction::SetStatus { id, status } => {
                commands::orders::set_status(&id, status).await?;
            }
        },
        Commands::Ping => commands::site::ping().await?,
    }
    Ok(())
}
