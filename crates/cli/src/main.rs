//! Packhouse CLI - database migrations, admin users and manual order syncs.
//!
//! # Usage
//!
//! ```bash
//! # Apply the shop and admin schema migrations
//! pkh migrate
//!
//! # Create admin user
//! pkh admin create -e admin@example.com -n "Admin Name" -r super_admin
//!
//! # Mirror Shopify orders into the shop database
//! pkh sync orders --admin-email admin@example.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create admin users
//! - `sync orders` - Run an order sync as an existing admin

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pkh")]
#[command(author, version, about = "Packhouse CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Pull data from Shopify
    Sync {
        #[command(subcommand)]
        target: SyncTarget,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin role (`super_admin`, `admin`, `viewer`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[derive(Subcommand)]
enum SyncTarget {
    /// Mirror every Shopify order into the shop database
    Orders {
        /// Email of the admin user the run is performed as
        #[arg(long)]
        admin_email: String,
    },
}

#[tokio::main]
async fn main() {
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
            AdminAction::Create { email, name, role } => {
                commands::admin::create_user(&email, &name, &role).await?;
            }
        },
        Commands::Sync { target } => match target {
            SyncTarget::Orders { admin_email } => {
                commands::sync::orders(&admin_email).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_orders_requires_admin_email() {
        assert!(Cli::try_parse_from(["pkh", "sync", "orders"]).is_err());

        let cli = Cli::try_parse_from(["pkh", "sync", "orders", "--admin-email", "ops@packhouse.shop"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Sync {
                target: SyncTarget::Orders { admin_email }
            }) if admin_email == "ops@packhouse.shop"
        ));
    }

    #[test]
    fn test_admin_create_defaults_to_admin_role() {
        let cli = Cli::try_parse_from(["pkh", "admin", "create", "-e", "a@b.co", "-n", "A"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Admin {
                action: AdminAction::Create { role, .. }
            }) if role == "admin"
        ));
    }
}
