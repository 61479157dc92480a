mod auth;
mod db;
mod runs;
mod sync;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use auth::AuthCommands;
use db::DbCommands;
use runs::RunsCommands;
use sync::SyncCommands;

#[derive(Debug, Parser)]
#[command(name = "mktsync-cli")]
#[command(about = "Marketplace and ERP sync command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Pull vendor data into the local store
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Inspect recorded sync runs
    Runs {
        #[command(subcommand)]
        command: RunsCommands,
    },
    /// Seller authorisation and token upkeep
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("mktsync-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = mktsync_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool = mktsync_db::connect_pool(
        &config.database_url,
        mktsync_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    match command {
        Commands::Db { command } => db::run(&pool, &config, command).await,
        Commands::Sync { command } => sync::run(&pool, &config, command).await,
        Commands::Runs { command } => runs::run(&pool, command).await,
        Commands::Auth { command } => auth::run(&pool, &config, command).await,
    }
}

#[cfg(test)]
mod tests;
