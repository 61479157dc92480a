//! Read-only views over `sync_runs`.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use sqlx::PgPool;

/// Sub-commands available under `runs`.
#[derive(Debug, Subcommand)]
pub enum RunsCommands {
    /// List the most recent runs
    List {
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Show per-tenant outcomes of one run
    Show {
        /// Run id as printed by `runs list`
        #[arg(long)]
        id: i64,
    },
}

pub(crate) async fn run(pool: &PgPool, command: RunsCommands) -> anyhow::Result<()> {
    match command {
        RunsCommands::List { limit } => list(pool, limit).await,
        RunsCommands::Show { id } => show(pool, id).await,
    }
}

async fn list(pool: &PgPool, limit: u32) -> anyhow::Result<()> {
    let runs = mktsync_db::list_sync_runs(pool, i64::from(limit.clamp(1, 1000))).await?;
    if runs.is_empty() {
        println!("no sync runs recorded; run `sync run --vendor <vendor>` first");
        return Ok(());
    }

    println!(
        "{:<8}{:<18}{:<28}{:<11}{:<11}{:<10}STARTED",
        "ID", "VENDOR", "ENTITY", "TRIGGER", "STATUS", "RECORDS"
    );
    for run in &runs {
        println!(
            "{:<8}{:<18}{:<28}{:<11}{:<11}{:<10}{}",
            run.id,
            run.vendor,
            run.entity.as_deref().unwrap_or("(all)"),
            run.trigger_source,
            run.status,
            run.records_processed,
            fmt_time(run.started_at),
        );
    }
    Ok(())
}

async fn show(pool: &PgPool, id: i64) -> anyhow::Result<()> {
    let run = match mktsync_db::get_sync_run(pool, id).await {
        Ok(run) => run,
        Err(mktsync_db::DbError::NotFound) => anyhow::bail!("sync run {id} not found"),
        Err(e) => return Err(e.into()),
    };
    let tenants = mktsync_db::list_sync_run_tenants(pool, id).await?;

    println!("Run {} ({}) {}", run.id, run.public_id, run.status);
    println!("Vendor: {}  Entity: {}", run.vendor, run.entity.as_deref().unwrap_or("(all)"));
    println!("Started: {}  Completed: {}", fmt_time(run.started_at), fmt_time(run.completed_at));
    if let Some(error) = &run.error_message {
        println!("Error: {error}");
    }
    println!();
    println!("{:<10}{:<11}{:<10}ERROR", "TENANT", "STATUS", "RECORDS");
    for tenant in &tenants {
        println!(
            "{:<10}{:<11}{:<10}{}",
            tenant.tenant_id,
            tenant.status,
            tenant.records_processed,
            tenant.error_message.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "\u{2014}".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}
