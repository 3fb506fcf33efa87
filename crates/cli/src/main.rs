//! Preconfig CLI - Database migrations and user bootstrap.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! preconfig migrate
//!
//! # Create a user (role is optional; without one it is derived from the email)
//! preconfig user create -e ops@rakwireless.com -n "Ops" -r rakwireless
//!
//! # Make sure the default admin exists, is active and holds the admin role
//! preconfig user ensure-admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Add a user to the directory
//! - `user ensure-admin` - Upsert an admin user

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "preconfig")]
#[command(author, version, about = "Preconfig operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage directory users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Add a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Stored role (`user`, `rakwireless`, `admin`)
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Create or promote the admin user
    EnsureAdmin {
        /// Admin email address
        #[arg(short, long, default_value = "admin@rakwireless.com")]
        email: String,

        /// Display name, used only when the user is created
        #[arg(short, long, default_value = "Admin")]
        name: String,
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
        Commands::User { action } => match action {
            UserAction::Create { email, name, role } => {
                commands::users::create_user(&email, name.as_deref(), role.as_deref()).await?;
            }
            UserAction::EnsureAdmin { email, name } => {
                commands::users::ensure_admin(&email, &name).await?;
            }
        },
    }
    Ok(())
}
