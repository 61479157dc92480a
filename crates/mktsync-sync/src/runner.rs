//! Orchestration of one sync run: tenants → fan-out → per-entity pipeline,
//! tracked in `sync_runs` / `sync_run_tenants`.

use chrono::{Duration, Utc};
use mktsync_connectors::HttpSettings;
use mktsync_core::{AppConfig, AuthStatus, EntityKind, Vendor};
use mktsync_db::TenantRow;
use sqlx::PgPool;

use crate::clients::VendorClient;
use crate::credentials::{ensure_fresh_token, SYNC_REFRESH_SKEW_SECS};
use crate::fanout::run_fanout;
use crate::jobs::SyncJob;
use crate::pipeline::{run_entity_sync, EntitySyncReport, SyncOptions, TenantScope};
use crate::sink::{MemorySink, PgSink, RecordSink};
use crate::sources::build_source;
use crate::SyncError;

/// Who asked for the run; stored on the `sync_runs` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Cli,
    Scheduler,
    Api,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Cli => "cli",
            TriggerSource::Scheduler => "scheduler",
            TriggerSource::Api => "api",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub vendor: Vendor,
    /// Sync only this entity instead of the vendor's full plan.
    pub entity: Option<EntityKind>,
    /// Sync only this tenant.
    pub tenant_slug: Option<String>,
    /// Page budget per entity; defaults to `AppConfig::default_max_pages`.
    pub max_pages: Option<u32>,
    /// Fetch and normalise without writing records, watermarks or run rows.
    pub dry_run: bool,
    pub trigger: TriggerSource,
}

impl SyncRequest {
    #[must_use]
    pub fn vendor(vendor: Vendor, trigger: TriggerSource) -> Self {
        Self {
            vendor,
            entity: None,
            tenant_slug: None,
            max_pages: None,
            dry_run: false,
            trigger,
        }
    }

    fn job(&self) -> SyncJob {
        self.entity
            .map_or_else(|| SyncJob::all(self.vendor), SyncJob::single)
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRunSummary {
    /// `None` for dry runs, which leave no run row.
    pub run_id: Option<i64>,
    pub tenants: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Records created or updated across all tenants.
    pub records: usize,
    /// Records that failed to store and were flagged `error`.
    pub record_errors: usize,
    /// Some entity stopped on its page budget and will resume next run.
    pub has_more: bool,
}

/// What one tenant's sync produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantSyncReport {
    pub entities: Vec<EntitySyncReport>,
}

impl TenantSyncReport {
    #[must_use]
    pub fn records(&self) -> usize {
        self.entities.iter().map(EntitySyncReport::processed).sum()
    }

    #[must_use]
    pub fn record_errors(&self) -> usize {
        self.entities.iter().map(|r| r.failed).sum()
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.entities.iter().any(|r| r.has_more)
    }
}

/// Runs `request` across every matching active tenant.
///
/// Tenants are synced concurrently up to `config.max_concurrent_tenants`. A
/// tenant's failure is recorded on its `sync_run_tenants` row and never stops
/// the others; the run itself fails only when every tenant failed.
///
/// # Errors
///
/// - [`SyncError::NoTenants`] when nothing matches the request.
/// - [`SyncError::AllTenantsFailed`] when no tenant succeeded.
/// - [`SyncError::Db`] when run bookkeeping fails.
pub async fn run_sync(
    pool: &PgPool,
    config: &AppConfig,
    request: &SyncRequest,
) -> Result<SyncRunSummary, SyncError> {
    let (tenants, revoked) = load_tenants(pool, request).await?;
    let job = request.job();
    let http = HttpSettings::from_app_config(config);
    let max_pages = request.max_pages.unwrap_or(config.default_max_pages);

    let run_id = if request.dry_run {
        None
    } else {
        let entity = request.entity.map(EntityKind::as_str);
        let run = mktsync_db::create_sync_run(
            pool,
            request.vendor.as_str(),
            entity,
            request.trigger.as_str(),
        )
        .await?;
        if let Err(e) = mktsync_db::start_sync_run(pool, run.id).await {
            fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
            return Err(e.into());
        }
        for tenant in &revoked {
            mktsync_db::upsert_sync_run_tenant(
                pool,
                run.id,
                tenant.id,
                "skipped",
                None,
                Some("authorization revoked"),
            )
            .await?;
        }
        Some(run.id)
    };

    tracing::info!(
        run_id = ?run_id,
        vendor = %request.vendor,
        tenants = tenants.len(),
        skipped = revoked.len(),
        steps = job.steps.len(),
        dry_run = request.dry_run,
        "sync run started"
    );

    let (pool_ref, http_ref, job_ref) = (pool, &http, &job);
    let fanout = run_fanout(
        &tenants,
        config.max_concurrent_tenants,
        |tenant| async move {
            let result = sync_tenant(
                pool_ref,
                config,
                http_ref,
                job_ref,
                tenant,
                max_pages,
                request.dry_run,
            )
            .await;
            if let Some(run_id) = run_id {
                record_tenant_outcome(pool_ref, run_id, tenant, &result).await;
            }
            result
        },
    )
    .await;

    let mut summary = SyncRunSummary {
        run_id,
        tenants: tenants.len() + revoked.len(),
        succeeded: fanout.succeeded(),
        failed: fanout.failed(),
        skipped: revoked.len(),
        ..SyncRunSummary::default()
    };
    for report in fanout
        .outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok())
    {
        summary.records += report.records();
        summary.record_errors += report.record_errors();
        summary.has_more |= report.has_more();
    }

    if summary.failed > 0 {
        tracing::warn!(
            failed = summary.failed,
            total = tenants.len(),
            "some tenants failed during sync"
        );
    }

    if fanout.all_failed() {
        if let Some(run_id) = run_id {
            let message = format!("all {} tenants failed", summary.failed);
            fail_run_best_effort(pool, run_id, message).await;
        }
        return Err(SyncError::AllTenantsFailed(summary.failed));
    }

    if let Some(run_id) = run_id {
        let records = i32::try_from(summary.records).unwrap_or(i32::MAX);
        if let Err(e) = mktsync_db::complete_sync_run(pool, run_id, records).await {
            fail_run_best_effort(pool, run_id, format!("{e:#}")).await;
            return Err(e.into());
        }
    }

    tracing::info!(
        run_id = ?run_id,
        vendor = %request.vendor,
        succeeded = summary.succeeded,
        failed = summary.failed,
        records = summary.records,
        has_more = summary.has_more,
        "sync run finished"
    );
    Ok(summary)
}

/// Active tenants for the request, split into those to sync and those whose
/// authorisation was revoked.
async fn load_tenants(
    pool: &PgPool,
    request: &SyncRequest,
) -> Result<(Vec<TenantRow>, Vec<TenantRow>), SyncError> {
    let mut tenants = mktsync_db::list_active_tenants(pool, Some(request.vendor)).await?;
    if let Some(slug) = request.tenant_slug.as_deref() {
        tenants.retain(|t| t.slug == slug);
    }
    if tenants.is_empty() {
        let scope = match request.tenant_slug.as_deref() {
            Some(slug) => format!("vendor {} and tenant '{slug}'", request.vendor),
            None => format!("vendor {}", request.vendor),
        };
        return Err(SyncError::NoTenants(scope));
    }

    Ok(tenants
        .into_iter()
        .partition(|t| !matches!(t.auth_status(), Ok(AuthStatus::Revoked))))
}

/// Syncs every step of `job` for one tenant, stopping early when a step runs
/// out of page budget.
async fn sync_tenant(
    pool: &PgPool,
    config: &AppConfig,
    http: &HttpSettings,
    job: &SyncJob,
    tenant: &TenantRow,
    max_pages: u32,
    dry_run: bool,
) -> Result<TenantSyncReport, SyncError> {
    let client = VendorClient::for_tenant(config, http, tenant)?;
    let access_token = ensure_fresh_token(
        pool,
        &client,
        tenant,
        Utc::now(),
        Duration::seconds(SYNC_REFRESH_SKEW_SECS),
    )
    .await?;

    let mut sink: Box<dyn RecordSink> = if dry_run {
        Box::new(MemorySink::new())
    } else {
        Box::new(PgSink::new(pool.acquire().await?, tenant.id))
    };
    let scope = TenantScope::from(tenant);

    let mut report = TenantSyncReport::default();
    for &entity in &job.steps {
        let source = build_source(
            &client,
            tenant,
            access_token.clone(),
            entity,
            config.jst_window_minutes,
        )?;
        let options = SyncOptions::new(max_pages);
        let step = run_entity_sync(source.as_ref(), sink.as_mut(), &scope, &options).await?;
        let proceed = job.continues_after(&step);
        report.entities.push(step);
        if !proceed {
            tracing::info!(
                tenant = %tenant.slug,
                %entity,
                "page budget reached; remaining steps wait for the next run"
            );
            break;
        }
    }

    // The sink's connection has to be back in the pool before the tenant row
    // is touched.
    drop(sink);
    if !dry_run {
        mktsync_db::touch_tenant_sync(pool, tenant.id, None).await?;
    }
    Ok(report)
}

async fn record_tenant_outcome(
    pool: &PgPool,
    run_id: i64,
    tenant: &TenantRow,
    result: &Result<TenantSyncReport, SyncError>,
) {
    let written = match result {
        Ok(report) => {
            let records = i32::try_from(report.records()).unwrap_or(i32::MAX);
            mktsync_db::upsert_sync_run_tenant(
                pool,
                run_id,
                tenant.id,
                "succeeded",
                Some(records),
                None,
            )
            .await
        }
        Err(e) => {
            let message = e.to_string();
            if let Err(touch_err) =
                mktsync_db::touch_tenant_sync(pool, tenant.id, Some(&message)).await
            {
                tracing::warn!(
                    tenant = %tenant.slug,
                    error = %touch_err,
                    "could not record tenant error"
                );
            }
            mktsync_db::upsert_sync_run_tenant(
                pool,
                run_id,
                tenant.id,
                "failed",
                None,
                Some(&message),
            )
            .await
        }
    };
    if let Err(e) = written {
        tracing::error!(
            run_id,
            tenant = %tenant.slug,
            error = %e,
            "failed to record tenant outcome"
        );
    }
}

async fn fail_run_best_effort(pool: &PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = mktsync_db::fail_sync_run(pool, run_id, &message).await {
        tracing::error!(run_id, error = %mark_err, "failed to mark sync run as failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_entity_runs_full_plan() {
        let request = SyncRequest::vendor(Vendor::Yonsuite, TriggerSource::Cli);
        assert_eq!(request.job(), SyncJob::all(Vendor::Yonsuite));
    }

    #[test]
    fn request_with_entity_runs_one_step() {
        let request = SyncRequest {
            entity: Some(EntityKind::JstOrder),
            ..SyncRequest::vendor(Vendor::Jst, TriggerSource::Scheduler)
        };
        assert_eq!(request.job().steps, vec![EntityKind::JstOrder]);
    }

    #[test]
    fn trigger_names_match_run_rows() {
        assert_eq!(TriggerSource::Cli.as_str(), "cli");
        assert_eq!(TriggerSource::Scheduler.as_str(), "scheduler");
        assert_eq!(TriggerSource::Api.as_str(), "api");
    }

    #[test]
    fn tenant_report_totals() {
        let step = |created, updated, failed, has_more| EntitySyncReport {
            entity: EntityKind::LazadaOrder,
            pages: 1,
            created,
            updated,
            failed,
            has_more,
            watermark: None,
            skipped: false,
        };
        let report = TenantSyncReport {
            entities: vec![step(2, 3, 1, false), step(0, 4, 0, true)],
        };
        assert_eq!(report.records(), 9);
        assert_eq!(report.record_errors(), 1);
        assert!(report.has_more());
    }
}
