//! Maintenance tool for the file sharing database

mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::ListKind;
use config::ConnectionArgs;
use storage::Database;
use tracing::info;

#[derive(Parser)]
#[command(name = "storagectl")]
#[command(about = "Inspect and maintain the file sharing database")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove expired sessions and stale upload progress
    Gc {
        /// Keep running, sweeping every SECONDS until interrupted
        #[arg(long, value_name = "SECONDS")]
        every: Option<u64>,
    },
    /// Print the schema version marker
    Version,
    /// Overwrite the schema version marker
    SetVersion { version: i32 },
    /// Print every record of a kind as JSON
    List {
        #[arg(value_enum)]
        kind: ListKind,
    },
    /// Log out every user by deleting all sessions
    ClearSessions,
    /// Print the upload defaults
    Defaults,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = open(&cli.connection).await?;

    let result = run(&db, cli.command).await;
    db.close().await;
    result
}

async fn open(connection: &ConnectionArgs) -> anyhow::Result<Database> {
    let config = connection
        .load()
        .context("failed to load database settings")?;
    info!(backend = ?config.backend, "Opening database");
    Database::init(&config)
        .await
        .context("failed to open database")
}

async fn run(db: &Database, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Gc { every } => commands::gc(db, every).await,
        Commands::Version => commands::version(db).await,
        Commands::SetVersion { version } => commands::set_version(db, version).await,
        Commands::List { kind } => commands::list(db, kind).await,
        Commands::ClearSessions => commands::clear_sessions(db).await,
        Commands::Defaults => commands::defaults(db).await,
    }
}
