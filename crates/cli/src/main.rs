//! EKart CLI - database migrations, seeding, and account management.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! ekart-cli migrate
//!
//! # Load the demo catalog (idempotent; --clear replaces seeded products)
//! ekart-cli seed --file crates/cli/seed.yaml
//!
//! # Create an account of any type, including admin
//! ekart-cli user create -e ops@ekart.dev -p 'long-enough-password' -t admin
//! ```
//!
//! Every command reads `EKART_DATABASE_URL` (or `DATABASE_URL`), loading
//! `.env` if present.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "ekart-cli")]
#[command(author, version, about = "EKart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed sellers and products from a YAML file
    Seed {
        /// Path to the seed file
        #[arg(short, long, default_value = "crates/cli/seed.yaml")]
        file: String,

        /// Delete the seeded sellers' existing products first
        #[arg(long)]
        clear: bool,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Account type (`buyer`, `seller`, `admin`)
        #[arg(short = 't', long = "type", default_value = "buyer")]
        user_type: String,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, clear } => commands::seed::run(&file, clear).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                password,
                user_type,
                first_name,
                last_name,
            } => {
                commands::user::create(&commands::user::CreateUser {
                    email: &email,
                    password: &password,
                    user_type: &user_type,
                    first_name: &first_name,
                    last_name: &last_name,
                })
                .await?;
            }
        },
    }
    Ok(())
}
