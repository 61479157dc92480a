//! Seller authorisation links and manual token refresh.

use chrono::Duration;
use clap::Subcommand;
use mktsync_core::AppConfig;
use mktsync_sync::CRON_REFRESH_SKEW_SECS;
use sqlx::PgPool;

/// Sub-commands available under `auth`.
#[derive(Debug, Subcommand)]
pub enum AuthCommands {
    /// Print the consent URL a seller opens to authorise a tenant
    Url {
        /// Tenant slug
        #[arg(long)]
        tenant: String,
    },
    /// Refresh tokens that expire within the next day
    Refresh {
        /// Refresh a single tenant by slug
        #[arg(long)]
        tenant: Option<String>,
        /// Refresh regardless of expiry
        #[arg(long)]
        force: bool,
    },
}

pub(crate) async fn run(
    pool: &PgPool,
    config: &AppConfig,
    command: AuthCommands,
) -> anyhow::Result<()> {
    match command {
        AuthCommands::Url { tenant } => {
            let row = mktsync_db::get_tenant_by_slug(pool, &tenant)
                .await?
                .ok_or_else(|| {
                    anyhow::anyhow!("tenant '{tenant}' not found; run `db seed` first")
                })?;
            let url = mktsync_sync::authorization_url(config, &row)?;
            println!("{url}");
            println!("callback: {}", mktsync_sync::redirect_uri(config, row.vendor()?));
        }
        AuthCommands::Refresh { tenant, force } => {
            // Every stored token expires within a century.
            let skew = if force {
                Duration::days(36_500)
            } else {
                Duration::seconds(CRON_REFRESH_SKEW_SECS)
            };
            let summary =
                mktsync_sync::refresh_expiring_tokens(pool, config, tenant.as_deref(), skew)
                    .await?;
            println!(
                "checked {} tenant(s), refreshed {}, failed {}",
                summary.checked, summary.refreshed, summary.failed
            );
            if summary.failed > 0 {
                anyhow::bail!("{} token refresh(es) failed", summary.failed);
            }
        }
    }
    Ok(())
}
