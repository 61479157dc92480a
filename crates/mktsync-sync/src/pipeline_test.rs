use std::sync::Mutex;

use async_trait::async_trait;
use chrono::TimeZone;
use mktsync_core::NormalizedRecord;
use serde_json::{json, Map};

use super::*;
use crate::sink::MemorySink;
use crate::source::SourcePage;

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap()
}

fn record(id: &str, updated: Option<DateTime<Utc>>) -> NormalizedRecord {
    NormalizedRecord::new(id, Map::new(), json!({ "id": id })).with_updated_at(updated)
}

/// Serves page `n` for `Cursor::Index(n)`; `fail_on` makes that page error.
struct ScriptedSource {
    mode: WatermarkMode,
    pages: Vec<(Vec<NormalizedRecord>, Option<Cursor>)>,
    fail_on: Option<u32>,
    seen: Mutex<Vec<(Cursor, SyncWindow)>>,
}

impl ScriptedSource {
    fn new(mode: WatermarkMode, pages: Vec<(Vec<NormalizedRecord>, Option<Cursor>)>) -> Self {
        Self {
            mode,
            pages,
            fail_on: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<(Cursor, SyncWindow)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    fn entity(&self) -> EntityKind {
        EntityKind::YonsuitePartner
    }

    fn mode(&self) -> WatermarkMode {
        self.mode
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        self.seen.lock().unwrap().push((cursor.clone(), *window));
        let index = cursor.index().unwrap_or(1);
        if self.fail_on == Some(index) {
            return Err(SyncError::Connector(
                mktsync_connectors::ConnectorError::UnexpectedStatus {
                    status: 502,
                    context: "scripted".to_owned(),
                },
            ));
        }
        let Some((records, next)) = self.pages.get(index as usize - 1) else {
            return Ok(SourcePage::default());
        };
        Ok(SourcePage {
            records: records.clone(),
            next: next.clone(),
            high_water: None,
            rejected: 0,
        })
    }
}

fn tenant(sync_since: Option<DateTime<Utc>>) -> TenantScope {
    TenantScope {
        id: 1,
        slug: "ys-main".to_owned(),
        sync_since,
    }
}

fn options(max_pages: u32) -> SyncOptions {
    SyncOptions {
        max_pages,
        now: at(12, 0),
    }
}

fn three_pages() -> Vec<(Vec<NormalizedRecord>, Option<Cursor>)> {
    vec![
        (
            vec![record("a", None), record("b", None)],
            Some(Cursor::Index(2)),
        ),
        (vec![record("c", None)], Some(Cursor::Index(3))),
        (vec![record("d", None)], None),
    ]
}

#[tokio::test]
async fn rerun_overwrites_instead_of_duplicating() {
    let source = ScriptedSource::new(WatermarkMode::None, three_pages());
    let mut sink = MemorySink::new();

    let first = run_entity_sync(&source, &mut sink, &tenant(None), &options(10))
        .await
        .unwrap();
    let second = run_entity_sync(&source, &mut sink, &tenant(None), &options(10))
        .await
        .unwrap();

    assert_eq!((first.created, first.updated), (4, 0));
    assert_eq!((second.created, second.updated), (0, 4));
    assert_eq!(sink.count(EntityKind::YonsuitePartner), 4);
}

#[tokio::test]
async fn stops_when_no_next_cursor() {
    let source = ScriptedSource::new(WatermarkMode::None, three_pages());
    let mut sink = MemorySink::new();

    let report = run_entity_sync(&source, &mut sink, &tenant(None), &options(10))
        .await
        .unwrap();

    assert_eq!(report.pages, 3);
    assert!(!report.has_more);
    assert_eq!(source.seen().len(), 3);
}

#[tokio::test]
async fn stops_on_empty_page_even_with_next_cursor() {
    let pages = vec![
        (vec![record("a", None)], Some(Cursor::Index(2))),
        (vec![], Some(Cursor::Index(3))),
        (vec![record("never", None)], None),
    ];
    let source = ScriptedSource::new(WatermarkMode::None, pages);
    let mut sink = MemorySink::new();

    let report = run_entity_sync(&source, &mut sink, &tenant(None), &options(10))
        .await
        .unwrap();

    assert_eq!(report.pages, 2);
    assert!(sink.get(EntityKind::YonsuitePartner, "never").is_none());
}

#[tokio::test]
async fn page_budget_keeps_cursor_then_resume_clears_it() {
    let source = ScriptedSource::new(WatermarkMode::Cursor, three_pages());
    let mut sink = MemorySink::new();

    let first = run_entity_sync(&source, &mut sink, &tenant(None), &options(2))
        .await
        .unwrap();
    assert!(first.has_more);
    assert_eq!(first.pages, 2);
    assert_eq!(first.watermark, Some(Watermark::Page(3)));
    assert_eq!(
        sink.watermarks.get(&EntityKind::YonsuitePartner),
        Some(&Watermark::Page(3))
    );

    let second = run_entity_sync(&source, &mut sink, &tenant(None), &options(2))
        .await
        .unwrap();
    assert!(!second.has_more);
    assert_eq!(second.pages, 1);
    assert_eq!(second.watermark, None);
    assert!(sink.watermarks.is_empty());
    assert_eq!(source.seen()[2].0, Cursor::Index(3));
}

#[tokio::test]
async fn timestamp_watermark_never_moves_backwards() {
    let pages = vec![(
        vec![record("a", Some(at(8, 0))), record("b", Some(at(9, 30)))],
        None,
    )];
    let source = ScriptedSource::new(WatermarkMode::Timestamp, pages);
    let mut sink = MemorySink::new();

    let report = run_entity_sync(&source, &mut sink, &tenant(None), &options(10))
        .await
        .unwrap();
    assert_eq!(report.watermark, Some(Watermark::Timestamp(at(9, 30))));

    sink.watermarks
        .insert(EntityKind::YonsuitePartner, Watermark::Timestamp(at(11, 0)));
    let report = run_entity_sync(&source, &mut sink, &tenant(None), &options(10))
        .await
        .unwrap();
    assert_eq!(report.watermark, Some(Watermark::Timestamp(at(11, 0))));
    assert_eq!(source.seen()[1].1.since, Some(at(11, 0)));
}

#[tokio::test]
async fn window_without_start_is_skipped() {
    let source = ScriptedSource::new(WatermarkMode::Window { minutes: 6 }, three_pages());
    let mut sink = MemorySink::new();

    let report = run_entity_sync(&source, &mut sink, &tenant(None), &options(10))
        .await
        .unwrap();

    assert!(report.skipped);
    assert!(source.seen().is_empty());
}

#[tokio::test]
async fn window_advances_to_end_plus_one_second() {
    let source = ScriptedSource::new(WatermarkMode::Window { minutes: 6 }, three_pages());
    let mut sink = MemorySink::new();

    let report = run_entity_sync(&source, &mut sink, &tenant(Some(at(10, 0))), &options(10))
        .await
        .unwrap();

    let window = source.seen()[0].1;
    assert_eq!(window.since, Some(at(10, 0)));
    assert_eq!(window.until, at(10, 6));
    assert_eq!(
        report.watermark,
        Some(Watermark::Timestamp(at(10, 6) + Duration::seconds(1)))
    );
}

#[tokio::test]
async fn window_over_page_budget_resumes_then_advances() {
    let source = ScriptedSource::new(WatermarkMode::Window { minutes: 6 }, three_pages());
    let mut sink = MemorySink::new();
    let tenant = tenant(Some(at(10, 0)));

    let first = run_entity_sync(&source, &mut sink, &tenant, &options(1))
        .await
        .unwrap();
    assert!(first.has_more);
    assert_eq!(
        first.watermark,
        Some(Watermark::Resume(Box::new(ResumePoint {
            since: Some(at(10, 0)),
            until: at(10, 6),
            next: Watermark::Page(2),
            high_water: None,
        })))
    );

    let second = run_entity_sync(&source, &mut sink, &tenant, &options(1))
        .await
        .unwrap();
    assert!(second.has_more);
    let third = run_entity_sync(&source, &mut sink, &tenant, &options(1))
        .await
        .unwrap();
    assert!(!third.has_more);
    assert_eq!(
        third.watermark,
        Some(Watermark::Timestamp(at(10, 6) + Duration::seconds(1)))
    );

    let seen = source.seen();
    let cursors: Vec<Cursor> = seen.iter().map(|(cursor, _)| cursor.clone()).collect();
    assert_eq!(
        cursors,
        [Cursor::Index(1), Cursor::Index(2), Cursor::Index(3)]
    );
    assert!(seen.iter().all(|(_, window)| *window == seen[0].1));
    assert_eq!(sink.count(EntityKind::YonsuitePartner), 4);
}

#[tokio::test]
async fn timestamp_holds_since_until_newest_first_listing_is_done() {
    let pages = vec![
        (vec![record("new", Some(at(11, 0)))], Some(Cursor::Index(2))),
        (vec![record("old", Some(at(8, 0)))], None),
    ];
    let source = ScriptedSource::new(WatermarkMode::Timestamp, pages);
    let mut sink = MemorySink::new();
    let tenant = tenant(Some(at(7, 0)));

    let first = run_entity_sync(&source, &mut sink, &tenant, &options(1))
        .await
        .unwrap();
    assert!(first.has_more);
    let point = first
        .watermark
        .as_ref()
        .and_then(Watermark::as_resume)
        .unwrap();
    assert_eq!(point.since, Some(at(7, 0)));
    assert_eq!(point.high_water, Some(at(11, 0)));

    let second = run_entity_sync(&source, &mut sink, &tenant, &options(1))
        .await
        .unwrap();
    assert!(!second.has_more);
    assert_eq!(second.watermark, Some(Watermark::Timestamp(at(11, 0))));
    assert_eq!(source.seen()[1], (Cursor::Index(2), source.seen()[0].1));
    assert!(sink.get(EntityKind::YonsuitePartner, "old").is_some());
}

#[tokio::test]
async fn record_failures_are_counted_and_flagged() {
    let source = ScriptedSource::new(WatermarkMode::None, three_pages());
    let mut sink = MemorySink::new().failing_on(["b"]);

    let report = run_entity_sync(&source, &mut sink, &tenant(None), &options(10))
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.created, 3);
    assert_eq!(sink.errors.len(), 1);
    assert_eq!(sink.errors[0].1, "b");
}

#[tokio::test]
async fn page_error_keeps_last_committed_cursor() {
    let mut source = ScriptedSource::new(WatermarkMode::Cursor, three_pages());
    source.fail_on = Some(3);
    let mut sink = MemorySink::new();

    let err = run_entity_sync(&source, &mut sink, &tenant(None), &options(10))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Connector(_)));
    assert_eq!(
        sink.watermarks.get(&EntityKind::YonsuitePartner),
        Some(&Watermark::Page(3))
    );
    assert_eq!(sink.count(EntityKind::YonsuitePartner), 3);
}

#[test]
fn timestamp_start_is_later_of_watermark_and_sync_since() {
    let stored = Watermark::Timestamp(at(8, 0));
    let start = start_position(
        WatermarkMode::Timestamp,
        Cursor::Offset(0),
        Some(&stored),
        None,
        None,
        Some(at(9, 0)),
        at(12, 0),
    )
    .unwrap();
    assert_eq!(start.window.since, Some(at(9, 0)));
    assert_eq!(start.cursor, Cursor::Offset(0));
}

#[test]
fn timestamp_start_falls_back_to_stored_records_then_default() {
    let from_records = start_position(
        WatermarkMode::Timestamp,
        Cursor::Offset(0),
        None,
        Some(at(7, 0)),
        Some(at(1, 0)),
        None,
        at(12, 0),
    )
    .unwrap();
    assert_eq!(from_records.window.since, Some(at(7, 0)));

    let from_default = start_position(
        WatermarkMode::Timestamp,
        Cursor::Offset(0),
        None,
        None,
        Some(at(1, 0)),
        None,
        at(12, 0),
    )
    .unwrap();
    assert_eq!(from_default.window.since, Some(at(1, 0)));
}

#[test]
fn window_is_clamped_to_now_and_closed_in_future() {
    let near_now = Watermark::Timestamp(at(11, 58));
    let start = start_position(
        WatermarkMode::Window { minutes: 6 },
        Cursor::Index(1),
        Some(&near_now),
        None,
        None,
        None,
        at(12, 0),
    )
    .unwrap();
    assert_eq!(start.window.until, at(12, 0));

    let future = Watermark::Timestamp(at(12, 1));
    assert!(start_position(
        WatermarkMode::Window { minutes: 6 },
        Cursor::Index(1),
        Some(&future),
        None,
        None,
        None,
        at(12, 0),
    )
    .is_none());
}

#[test]
fn window_without_watermark_starts_at_source_default() {
    let start = start_position(
        WatermarkMode::Window { minutes: 6 },
        Cursor::Token(String::new()),
        None,
        None,
        Some(at(9, 0)),
        None,
        at(12, 0),
    )
    .unwrap();
    assert_eq!(start.window.since, Some(at(9, 0)));
    assert_eq!(start.window.until, at(9, 6));

    let configured = start_position(
        WatermarkMode::Window { minutes: 6 },
        Cursor::Token(String::new()),
        None,
        None,
        Some(at(9, 0)),
        Some(at(8, 0)),
        at(12, 0),
    )
    .unwrap();
    assert_eq!(configured.window.since, Some(at(8, 0)));
}
