//! Vitrine CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront and session store migrations
//! vitrine migrate
//!
//! # Grant or revoke the administrator role
//! vitrine admin grant -e staff@example.com
//! vitrine admin revoke -e staff@example.com
//!
//! # Create or replace catalog products from a YAML file
//! vitrine seed -f crates/cli/seed/products.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use vitrine_core::Role;

mod commands;

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(author, version, about = "Vitrine CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the administrator role
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Create or replace catalog products from a YAML file
    Seed {
        /// Path to the YAML product file
        #[arg(short, long)]
        file: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the administrator role to an existing user
    Grant {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
    /// Revoke the administrator role
    Revoke {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => commands::admin::set_role(&email, Role::Admin).await?,
            AdminAction::Revoke { email } => commands::admin::set_role(&email, Role::User).await?,
        },
        Commands::Seed { file } => commands::seed::products(&file).await?,
    }
    Ok(())
}
