//! Database maintenance commands.

use clap::Subcommand;
use mktsync_core::AppConfig;
use sqlx::PgPool;

/// Sub-commands available under `db`.
#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert tenants from the tenants file
    Seed {
        /// Tenants file; defaults to `MKTSYNC_TENANTS_PATH`
        #[arg(long)]
        path: Option<std::path::PathBuf>,
    },
}

pub(crate) async fn run(
    pool: &PgPool,
    config: &AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            mktsync_db::ping(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = mktsync_db::run_migrations(pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Seed { path } => {
            let path = path.unwrap_or_else(|| config.tenants_path.clone());
            let file = mktsync_core::load_tenants(&path)?;
            let count =
                mktsync_db::seed_tenants(pool, &file.tenants, |var| std::env::var(var)).await?;
            tracing::info!(path = %path.display(), count, "tenants seeded");
            println!("seeded {count} tenant(s) from {}", path.display());
        }
    }
    Ok(())
}
