//! The generic page loop: load watermark → fetch → upsert → advance.

use chrono::{DateTime, Duration, Utc};
use mktsync_connectors::Cursor;
use mktsync_core::{EntityKind, ResumePoint, Watermark};
use mktsync_db::TenantRow;

use crate::sink::RecordSink;
use crate::source::{RecordSource, SyncWindow, WatermarkMode};
use crate::SyncError;

/// The tenant fields the page loop needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    pub id: i64,
    pub slug: String,
    pub sync_since: Option<DateTime<Utc>>,
}

impl From<&TenantRow> for TenantScope {
    fn from(row: &TenantRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug.clone(),
            sync_since: row.sync_since,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Pages fetched before the run stops and reports `has_more`.
    pub max_pages: u32,
    pub now: DateTime<Utc>,
}

impl SyncOptions {
    #[must_use]
    pub fn new(max_pages: u32) -> Self {
        Self {
            max_pages: max_pages.max(1),
            now: Utc::now(),
        }
    }
}

/// Outcome of one entity sync for one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySyncReport {
    pub entity: EntityKind,
    pub pages: u32,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    /// The page budget ran out while the vendor still had pages.
    pub has_more: bool,
    /// Watermark left in place after the run; `None` when none is kept.
    pub watermark: Option<Watermark>,
    /// Set when there was nothing to fetch (window not yet open, no start).
    pub skipped: bool,
}

impl EntitySyncReport {
    fn empty(entity: EntityKind, watermark: Option<Watermark>) -> Self {
        Self {
            entity,
            pages: 0,
            created: 0,
            updated: 0,
            failed: 0,
            has_more: false,
            watermark,
            skipped: true,
        }
    }

    #[must_use]
    pub fn processed(&self) -> usize {
        self.created + self.updated
    }
}

/// Where a run begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartPosition {
    pub cursor: Cursor,
    pub window: SyncWindow,
    /// Newest source timestamp already stored by the pass being continued.
    pub high_water: Option<DateTime<Utc>>,
}

impl StartPosition {
    fn fresh(cursor: Cursor, since: Option<DateTime<Utc>>, until: DateTime<Utc>) -> Self {
        Self {
            cursor,
            window: SyncWindow { since, until },
            high_water: None,
        }
    }
}

/// Computes the start cursor and time window for a run, or `None` when the
/// source has nothing to fetch yet.
///
/// A stored resume point wins over everything else: the interrupted pass is
/// continued with its own time range from the page after the last one stored.
pub(crate) fn start_position(
    mode: WatermarkMode,
    first_cursor: Cursor,
    stored: Option<&Watermark>,
    latest_stored: Option<DateTime<Utc>>,
    default_since: Option<DateTime<Utc>>,
    sync_since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<StartPosition> {
    if let Some(point) = stored.and_then(Watermark::as_resume) {
        return Some(StartPosition {
            cursor: Cursor::from_watermark(&point.next).unwrap_or(first_cursor),
            window: SyncWindow {
                since: point.since,
                until: point.until,
            },
            high_water: point.high_water,
        });
    }

    match mode {
        WatermarkMode::Timestamp => {
            let since = stored
                .and_then(Watermark::as_timestamp)
                .or(latest_stored)
                .or(default_since);
            let since = match (since, sync_since) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
            Some(StartPosition::fresh(first_cursor, since, now))
        }
        WatermarkMode::Window { minutes } => {
            let start = stored
                .and_then(Watermark::as_timestamp)
                .or(sync_since)
                .or(default_since)?;
            if start > now {
                return None;
            }
            let end = (start + Duration::minutes(i64::from(minutes))).min(now);
            Some(StartPosition::fresh(first_cursor, Some(start), end))
        }
        WatermarkMode::Cursor => Some(StartPosition::fresh(
            stored
                .and_then(Cursor::from_watermark)
                .unwrap_or(first_cursor),
            sync_since,
            now,
        )),
        WatermarkMode::None => Some(StartPosition::fresh(first_cursor, sync_since, now)),
    }
}

/// Watermark to keep while a pass still has `next` to fetch.
fn in_pass_watermark(
    mode: WatermarkMode,
    window: &SyncWindow,
    next: &Cursor,
    high_water: Option<DateTime<Utc>>,
) -> Watermark {
    match mode {
        WatermarkMode::Cursor => next.to_watermark(),
        WatermarkMode::Timestamp | WatermarkMode::Window { .. } | WatermarkMode::None => {
            Watermark::Resume(Box::new(ResumePoint {
                since: window.since,
                until: window.until,
                next: next.to_watermark(),
                high_water,
            }))
        }
    }
}

/// Watermark to keep once a pass has fetched its last page; `None` clears it.
fn completed_watermark(
    mode: WatermarkMode,
    window: &SyncWindow,
    high_water: Option<DateTime<Utc>>,
) -> Option<Watermark> {
    match mode {
        WatermarkMode::Timestamp => high_water.max(window.since).map(Watermark::Timestamp),
        WatermarkMode::Window { .. } => {
            Some(Watermark::Timestamp(window.until + Duration::seconds(1)))
        }
        WatermarkMode::Cursor | WatermarkMode::None => None,
    }
}

/// Syncs one entity for one tenant.
///
/// Pages are fetched until the source reports no next cursor, a page comes
/// back empty, or `options.max_pages` pages have been processed. Each record
/// is upserted on its own; a failed upsert is logged, flagged on the record
/// and counted, and the loop moves on.
///
/// The watermark is persisted after every page. While a pass is in flight it
/// names the next page to fetch, so a run that stops on its page budget or a
/// failed page is continued by the next run. A timestamp or window watermark
/// only moves forward once its pass has completed, which keeps rows on
/// unfetched pages inside the next query whatever order the vendor lists in.
///
/// # Errors
///
/// Returns the first page fetch error, or a sink error while reading or
/// writing the watermark.
pub async fn run_entity_sync(
    source: &dyn RecordSource,
    sink: &mut dyn RecordSink,
    tenant: &TenantScope,
    options: &SyncOptions,
) -> Result<EntitySyncReport, SyncError> {
    let entity = source.entity();
    let mode = source.mode();
    let stored = sink.load_watermark(entity).await?;

    let latest_stored = match (mode, stored.is_some()) {
        (WatermarkMode::Timestamp, false) => sink.latest_source_update(entity).await?,
        _ => None,
    };

    let Some(start) = start_position(
        mode,
        source.first_cursor(),
        stored.as_ref(),
        latest_stored,
        source.default_since(),
        tenant.sync_since,
        options.now,
    ) else {
        tracing::info!(tenant = %tenant.slug, %entity, "nothing to sync yet");
        return Ok(EntitySyncReport::empty(entity, stored));
    };

    tracing::info!(
        tenant = %tenant.slug,
        %entity,
        cursor = ?start.cursor,
        since = ?start.window.since,
        until = %start.window.until,
        resumed = stored.as_ref().is_some_and(|w| w.as_resume().is_some()),
        "entity sync started"
    );

    let mut report = EntitySyncReport {
        entity,
        pages: 0,
        created: 0,
        updated: 0,
        failed: 0,
        has_more: false,
        watermark: stored,
        skipped: false,
    };
    let window = start.window;
    let mut high_water = start.high_water;
    let mut cursor = start.cursor;

    loop {
        let page = source.fetch_page(&cursor, &window).await?;
        report.pages += 1;
        report.failed += page.rejected;

        for record in &page.records {
            match sink.upsert(entity, record).await {
                Ok(outcome) if outcome.created => report.created += 1,
                Ok(_) => report.updated += 1,
                Err(e) => {
                    tracing::warn!(
                        tenant = %tenant.slug,
                        %entity,
                        external_id = %record.external_id,
                        error = %e,
                        "record upsert failed"
                    );
                    report.failed += 1;
                    if let Err(mark_err) = sink
                        .mark_error(entity, &record.external_id, &e.to_string())
                        .await
                    {
                        tracing::warn!(error = %mark_err, "could not flag record error");
                    }
                    continue;
                }
            }
            high_water = high_water.max(record.source_updated_at);
        }
        high_water = high_water.max(page.high_water);

        let next = if page.is_empty() { None } else { page.next };
        let Some(next) = next else {
            break;
        };

        let watermark = in_pass_watermark(mode, &window, &next, high_water);
        sink.save_watermark(entity, &watermark).await?;
        report.watermark = Some(watermark);

        cursor = next;
        if report.pages >= options.max_pages {
            report.has_more = true;
            break;
        }
    }

    if !report.has_more {
        match completed_watermark(mode, &window, high_water) {
            Some(watermark) => {
                if report.watermark.as_ref() != Some(&watermark) {
                    sink.save_watermark(entity, &watermark).await?;
                }
                report.watermark = Some(watermark);
            }
            None => {
                if report.watermark.is_some() {
                    sink.clear_watermark(entity).await?;
                }
                report.watermark = None;
            }
        }
    }

    sink.finish(entity).await?;

    tracing::info!(
        tenant = %tenant.slug,
        %entity,
        pages = report.pages,
        created = report.created,
        updated = report.updated,
        failed = report.failed,
        has_more = report.has_more,
        "entity sync finished"
    );
    Ok(report)
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
