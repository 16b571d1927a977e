use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{ConfigCommand, FieldCommand, NodeCommand, SyncCommand};
use treedeck::config::Config;
use treedeck::db::{init_db, LocalStore};

#[derive(Parser)]
#[command(name = "treedeck")]
#[command(version)]
#[command(about = "An offline-first hierarchical card deck", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage nodes in the tree
    Node(NodeCommand),

    /// Manage a node's fields
    Field(FieldCommand),

    /// Manage configuration
    Config(ConfigCommand),

    /// Sync with remote server
    Sync(SyncCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "treedeck=warn".into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Node(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            let store = LocalStore::new(pool);
            cmd.run(&store, &config).await?;
        }
        Some(Commands::Field(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            let store = LocalStore::new(pool);
            cmd.run(&store, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        Some(Commands::Sync(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            let store = LocalStore::new(pool);
            cmd.run(&store, &config).await?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
