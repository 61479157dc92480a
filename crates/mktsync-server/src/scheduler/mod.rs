//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the daily
//! token refresh plus one recurring sync job per vendor.

use std::sync::Arc;

use chrono::Duration;
use mktsync_core::{AppConfig, Vendor};
use mktsync_sync::{SyncError, SyncRequest, TriggerSource, CRON_REFRESH_SKEW_SECS};
use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Daily at 01:00 UTC.
const TOKEN_REFRESH_CRON: &str = "0 0 1 * * *";

/// Sync cadence per vendor (`sec min hour day month weekday`). Order and
/// stock movements are time-windowed, so JST runs most often.
fn sync_cron(vendor: Vendor) -> &'static str {
    match vendor {
        Vendor::Jst => "0 */5 * * * *",
        Vendor::Lazada => "0 10,40 * * * *",
        Vendor::TiktokShop => "0 20,50 * * * *",
        Vendor::TiktokBusiness => "0 15 * * * *",
        Vendor::Yonsuite => "0 45 * * * *",
    }
}

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_token_refresh_job(&scheduler, pool.clone(), Arc::clone(&config)).await?;
    for vendor in Vendor::ALL {
        register_sync_job(&scheduler, pool.clone(), Arc::clone(&config), vendor).await?;
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Refreshes every token expiring within the next day.
async fn register_token_refresh_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(TOKEN_REFRESH_CRON, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting token refresh");
            let skew = Duration::seconds(CRON_REFRESH_SKEW_SECS);
            if let Err(e) =
                mktsync_sync::refresh_expiring_tokens(&pool, &config, None, skew).await
            {
                tracing::error!(error = %e, "scheduler: token refresh failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Registers the recurring full sync for `vendor`.
///
/// A tick that fires while the previous run of the same vendor is still
/// going is skipped.
async fn register_sync_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
    vendor: Vendor,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);
    let running = Arc::new(Mutex::new(()));

    let job = Job::new_async(sync_cron(vendor), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let running = Arc::clone(&running);

        Box::pin(async move {
            let Ok(_guard) = running.try_lock() else {
                tracing::warn!(%vendor, "scheduler: previous sync still running; skipping tick");
                return;
            };
            run_sync_job(&pool, &config, vendor).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn run_sync_job(pool: &PgPool, config: &AppConfig, vendor: Vendor) {
    let request = SyncRequest::vendor(vendor, TriggerSource::Scheduler);
    match mktsync_sync::run_sync(pool, config, &request).await {
        Ok(summary) => tracing::info!(
            %vendor,
            run_id = ?summary.run_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            records = summary.records,
            "scheduler: sync complete"
        ),
        Err(SyncError::NoTenants(_)) => {
            tracing::debug!(%vendor, "scheduler: no active tenants; skipping");
        }
        Err(e) => tracing::error!(%vendor, error = %e, "scheduler: sync failed"),
    }
}
