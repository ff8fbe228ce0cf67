//! TV Guide CLI - favorites maintenance and local development tools.
//!
//! # Usage
//!
//! ```bash
//! # Show a user's favorites
//! tvg favorites list --user 123456789
//!
//! # Add or remove a favorite
//! tvg favorites add --user 123456789 --show 169
//! tvg favorites remove --user 123456789 --show 169
//!
//! # Summarize the favorites file
//! tvg favorites stats --file /data/favorites.json
//!
//! # Produce a signed initData string for calling the API locally
//! tvg sign-init-data --user-id 123456789 --first-name Ada
//! ```
//!
//! # Environment Variables
//!
//! - `FAVORITES_PATH` - Favorites file (default: favorites.json)
//! - `TELEGRAM_BOT_TOKEN` - Required by `sign-init-data`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tvg")]
#[command(author, version, about = "TV Guide CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit the favorites file
    Favorites {
        /// Favorites JSON file
        #[arg(long, global = true, env = "FAVORITES_PATH", default_value = "favorites.json")]
        file: PathBuf,

        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Print a signed mini-app initData string
    SignInitData {
        /// Telegram user ID to embed
        #[arg(long)]
        user_id: i64,

        /// First name to embed
        #[arg(long)]
        first_name: Option<String>,

        /// Username to embed
        #[arg(long)]
        username: Option<String>,
    },
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List a user's favorite show IDs
    List {
        #[arg(short, long)]
        user: i64,
    },
    /// Add a show to a user's favorites
    Add {
        #[arg(short, long)]
        user: i64,
        #[arg(short, long)]
        show: i64,
    },
    /// Remove a show from a user's favorites
    Remove {
        #[arg(short, long)]
        user: i64,
        #[arg(short, long)]
        show: i64,
    },
    /// Count users and favorites
    Stats,
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

#[allow(clippy::print_stdout)] // command output
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Favorites { file, action } => {
            let store = commands::favorites::open(file);
            match action {
                FavoritesAction::List { user } => {
                    for show in commands::favorites::list(&store, user.into()).await {
                        println!("{show}");
                    }
                }
                FavoritesAction::Add { user, show } => {
                    let added = commands::favorites::add(&store, user.into(), show.into()).await?;
                    println!("{}", if added { "Added" } else { "Already a favorite" });
                }
                FavoritesAction::Remove { user, show } => {
                    let removed =
                        commands::favorites::remove(&store, user.into(), show.into()).await?;
                    println!("{}", if removed { "Removed" } else { "Not a favorite" });
                }
                FavoritesAction::Stats => {
                    let stats = commands::favorites::stats(&store).await;
                    println!("users: {}", stats.users);
                    println!("favorites: {}", stats.favorites);
                }
            }
        }
        Commands::SignInitData {
            user_id,
            first_name,
            username,
        } => {
            let init_data = commands::sign::from_env(
                user_id.into(),
                first_name.as_deref(),
                username.as_deref(),
            )?;
            println!("{init_data}");
        }
    }
    Ok(())
}
