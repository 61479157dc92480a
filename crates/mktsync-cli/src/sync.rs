//! `sync` command: one run for a vendor, optionally narrowed to an entity or
//! tenant.

use clap::Subcommand;
use mktsync_core::{AppConfig, EntityKind, Vendor};
use mktsync_sync::{SyncRequest, TriggerSource};
use sqlx::PgPool;

/// Sub-commands available under `sync`.
#[derive(Debug, Subcommand)]
pub enum SyncCommands {
    /// Sync every active tenant of a vendor
    Run {
        /// Vendor to sync (jst, lazada, tiktok-shop, tiktok-business, yonsuite)
        #[arg(long)]
        vendor: Vendor,
        /// Sync a single entity, e.g. `order` or `jst.order`
        #[arg(long)]
        entity: Option<String>,
        /// Sync a single tenant by slug
        #[arg(long)]
        tenant: Option<String>,
        /// Page budget per entity
        #[arg(long)]
        max_pages: Option<u32>,
        /// Fetch and normalise without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

pub(crate) async fn run(
    pool: &PgPool,
    config: &AppConfig,
    command: SyncCommands,
) -> anyhow::Result<()> {
    match command {
        SyncCommands::Run {
            vendor,
            entity,
            tenant,
            max_pages,
            dry_run,
        } => {
            let request = build_request(vendor, entity.as_deref(), tenant, max_pages, dry_run)?;
            let summary = mktsync_sync::run_sync(pool, config, &request).await?;

            let prefix = if dry_run { "dry-run: " } else { "" };
            println!(
                "{prefix}{vendor}: {} tenant(s), {} succeeded, {} failed, {} skipped; \
                 {} record(s), {} record error(s)",
                summary.tenants,
                summary.succeeded,
                summary.failed,
                summary.skipped,
                summary.records,
                summary.record_errors,
            );
            if let Some(run_id) = summary.run_id {
                println!("run id: {run_id}");
            }
            if summary.has_more {
                println!("page budget reached; the next run resumes where this one stopped");
            }
        }
    }
    Ok(())
}

fn build_request(
    vendor: Vendor,
    entity: Option<&str>,
    tenant_slug: Option<String>,
    max_pages: Option<u32>,
    dry_run: bool,
) -> anyhow::Result<SyncRequest> {
    let entity = entity.map(|name| EntityKind::find(vendor, name)).transpose()?;
    if max_pages == Some(0) {
        anyhow::bail!("--max-pages must be at least 1");
    }
    Ok(SyncRequest {
        entity,
        tenant_slug,
        max_pages,
        dry_run,
        ..SyncRequest::vendor(vendor, TriggerSource::Cli)
    })
}
