//! Shanghuyun CLI - database migrations, seeding and maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! shy-cli migrate
//!
//! # Load categories, vendors, products, news and pages from YAML
//! shy-cli seed data/seed.yaml
//!
//! # Delete empty carts untouched for 30 days
//! shy-cli clean-empty-carts --days 30
//!
//! # Regenerate news slugs, printing changes only
//! shy-cli fix-slugs --dry-run
//!
//! # Create a superuser
//! shy-cli create-user -e admin@example.com -p 'long-password' --staff --superuser
//! ```
//!
//! All commands read `MARKETPLACE_DATABASE_URL` (or `DATABASE_URL`),
//! optionally from `.env`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shy-cli")]
#[command(author, version, about = "Shanghuyun marketplace CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database from a YAML file
    Seed {
        /// Path to the YAML seed file
        file: String,
    },
    /// Delete carts with no items that have not been touched recently
    CleanEmptyCarts {
        /// Minimum age in days
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Regenerate slugs for news categories, tags and posts
    FixSlugs {
        /// Print the changes without saving them
        #[arg(long)]
        dry_run: bool,
    },
    /// Create a user account
    CreateUser {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Grant staff access
        #[arg(long)]
        staff: bool,

        /// Grant superuser access
        #[arg(long)]
        superuser: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::CleanEmptyCarts { days } => commands::maintenance::clean_empty_carts(days).await?,
        Commands::FixSlugs { dry_run } => commands::maintenance::fix_slugs(dry_run).await?,
        Commands::CreateUser {
            email,
            password,
            staff,
            superuser,
        } => commands::users::create(&email, &password, staff, superuser).await?,
    }
    Ok(())
}
