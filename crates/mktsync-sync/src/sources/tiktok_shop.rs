use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use mktsync_connectors::tiktok_shop::{
    fields, AfterSale, ShopAccess, ShopReport, TiktokShopClient, DETAIL_BATCH,
};
use mktsync_connectors::Cursor;
use mktsync_core::mapping::value_as_string;
use mktsync_core::EntityKind;
use serde_json::Value;

use crate::source::{RecordSource, SourcePage, SyncWindow, WatermarkMode};
use crate::SyncError;

/// Search pages are addressed by `next_page_token`; the empty token is the
/// first page.
fn page_token(cursor: &Cursor) -> Option<&str> {
    cursor.token().filter(|t| !t.is_empty())
}

/// Analytics reports are pulled a week of whole days at a time.
pub const REPORT_WINDOW_DAYS: u64 = 7;

/// Days `[start, end)` covered by `window`, or `None` when it holds no whole
/// day yet.
fn report_dates(window: &SyncWindow) -> Option<(NaiveDate, NaiveDate)> {
    let start = window.since.unwrap_or(window.until).date_naive();
    let end = window.until.date_naive();
    (start < end).then_some((start, end))
}

/// Midnight UTC a report window before `now`.
fn report_history_start(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    now.date_naive()
        .checked_sub_days(Days::new(REPORT_WINDOW_DAYS))
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
}

fn report_mode() -> WatermarkMode {
    #[allow(clippy::cast_possible_truncation)]
    let minutes = (REPORT_WINDOW_DAYS * 24 * 60) as u32;
    WatermarkMode::Window { minutes }
}

fn row_ids(rows: &[Value]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get("id").and_then(value_as_string))
        .collect()
}

/// Orders updated since the watermark, oldest first, as full documents.
pub struct TiktokShopOrderSource<'a> {
    pub(crate) client: &'a TiktokShopClient,
    pub(crate) access: ShopAccess,
}

#[async_trait]
impl RecordSource for TiktokShopOrderSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::TiktokShopOrder
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::Timestamp
    }

    fn first_cursor(&self) -> Cursor {
        Cursor::Token(String::new())
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let list = self
            .client
            .search_orders(&self.access, window.since, page_token(cursor))
            .await?;

        let ids = row_ids(&list.items);
        let mut rows = Vec::with_capacity(ids.len());
        for batch in ids.chunks(DETAIL_BATCH) {
            rows.extend(self.client.get_order_details(&self.access, batch).await?);
        }

        let mut page =
            SourcePage::from_rows(self.entity(), &rows, list.next, fields::normalize_order);
        let missing = ids.len().saturating_sub(rows.len());
        if missing > 0 {
            tracing::warn!(
                missing,
                "TikTok Shop order detail returned fewer rows than requested"
            );
            page.rejected += missing;
        }
        Ok(page)
    }
}

/// Products updated since the watermark. Each summary is replaced by the full
/// product document when it can be fetched.
pub struct TiktokShopProductSource<'a> {
    pub(crate) client: &'a TiktokShopClient,
    pub(crate) access: ShopAccess,
}

#[async_trait]
impl RecordSource for TiktokShopProductSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::TiktokShopProduct
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::Timestamp
    }

    fn first_cursor(&self) -> Cursor {
        Cursor::Token(String::new())
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let list = self
            .client
            .search_products(&self.access, window.since, page_token(cursor))
            .await?;

        let mut details: HashMap<String, Value> = HashMap::new();
        for id in row_ids(&list.items) {
            match self.client.get_product(&self.access, &id).await {
                Ok(detail) if detail.is_object() => {
                    details.insert(id, detail);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    product_id = %id,
                    error = %e,
                    "TikTok Shop product detail failed; using summary"
                ),
            }
        }

        Ok(SourcePage::from_rows(
            self.entity(),
            &list.items,
            list.next,
            |row| {
                let detail = row
                    .get("id")
                    .and_then(value_as_string)
                    .and_then(|id| details.get(&id));
                fields::normalize_product(detail.unwrap_or(row))
            },
        ))
    }
}

pub struct TiktokShopWarehouseSource<'a> {
    pub(crate) client: &'a TiktokShopClient,
    pub(crate) access: ShopAccess,
}

#[async_trait]
impl RecordSource for TiktokShopWarehouseSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::TiktokShopWarehouse
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::None
    }

    async fn fetch_page(
        &self,
        _cursor: &Cursor,
        _window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let rows = self.client.get_warehouses(&self.access).await?;
        Ok(SourcePage::from_rows(
            self.entity(),
            &rows,
            None,
            fields::normalize_warehouse,
        ))
    }
}

/// Returns or cancellations updated since the watermark, oldest update first.
pub struct TiktokShopAfterSaleSource<'a> {
    pub(crate) client: &'a TiktokShopClient,
    pub(crate) access: ShopAccess,
    pub(crate) kind: AfterSale,
}

#[async_trait]
impl RecordSource for TiktokShopAfterSaleSource<'_> {
    fn entity(&self) -> EntityKind {
        match self.kind {
            AfterSale::Return => EntityKind::TiktokShopReturn,
            AfterSale::Cancellation => EntityKind::TiktokShopCancellation,
        }
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::Timestamp
    }

    fn first_cursor(&self) -> Cursor {
        Cursor::Token(String::new())
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let list = self
            .client
            .search_after_sales(&self.access, self.kind, window.since, page_token(cursor))
            .await?;
        let normalize = match self.kind {
            AfterSale::Return => fields::normalize_return,
            AfterSale::Cancellation => fields::normalize_cancellation,
        };
        Ok(SourcePage::from_rows(
            self.entity(),
            &list.items,
            list.next,
            normalize,
        ))
    }
}

/// Daily product, SKU or video performance. Each listed subject is followed
/// by a detail call; every day in the detail becomes one record.
pub struct TiktokShopReportSource<'a> {
    pub(crate) client: &'a TiktokShopClient,
    pub(crate) access: ShopAccess,
    pub(crate) report: ShopReport,
}

#[async_trait]
impl RecordSource for TiktokShopReportSource<'_> {
    fn entity(&self) -> EntityKind {
        match self.report {
            ShopReport::Product => EntityKind::TiktokShopProductPerformance,
            ShopReport::Sku => EntityKind::TiktokShopSkuPerformance,
            ShopReport::Video => EntityKind::TiktokShopVideoPerformance,
        }
    }

    fn mode(&self) -> WatermarkMode {
        report_mode()
    }

    fn first_cursor(&self) -> Cursor {
        Cursor::Token(String::new())
    }

    fn default_since(&self) -> Option<DateTime<Utc>> {
        report_history_start(Utc::now())
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let Some((start, end)) = report_dates(window) else {
            return Ok(SourcePage::default());
        };
        let list = self
            .client
            .list_report(&self.access, self.report, start, end, page_token(cursor))
            .await?;

        let mut records = Vec::new();
        let mut rejected = 0;
        for id in row_ids(&list.items) {
            let detail = match self
                .client
                .get_report(&self.access, self.report, &id, start, end)
                .await
            {
                Ok(detail) => detail,
                Err(e) => {
                    tracing::warn!(
                        entity = %self.entity(),
                        subject_id = %id,
                        error = %e,
                        "TikTok Shop performance detail failed"
                    );
                    rejected += 1;
                    continue;
                }
            };
            records.extend(
                fields::report_intervals(&detail)
                    .iter()
                    .filter_map(|interval| {
                        fields::normalize_report_interval(self.report, &id, &detail, interval)
                    }),
            );
        }

        Ok(SourcePage {
            records,
            next: list.next,
            high_water: None,
            rejected,
        })
    }
}

/// LIVE sessions that ran inside the window, with their totals.
pub struct TiktokShopLiveSource<'a> {
    pub(crate) client: &'a TiktokShopClient,
    pub(crate) access: ShopAccess,
}

#[async_trait]
impl RecordSource for TiktokShopLiveSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::TiktokShopLivePerformance
    }

    fn mode(&self) -> WatermarkMode {
        report_mode()
    }

    fn first_cursor(&self) -> Cursor {
        Cursor::Token(String::new())
    }

    fn default_since(&self) -> Option<DateTime<Utc>> {
        report_history_start(Utc::now())
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let Some((start, end)) = report_dates(window) else {
            return Ok(SourcePage::default());
        };
        let list = self
            .client
            .list_live_sessions(&self.access, start, end, page_token(cursor))
            .await?;
        Ok(SourcePage::from_rows(
            self.entity(),
            &list.items,
            list.next,
            fields::normalize_live_session,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_requests_first_page() {
        assert_eq!(page_token(&Cursor::Token(String::new())), None);
        assert_eq!(page_token(&Cursor::Token("abc".to_owned())), Some("abc"));
        assert_eq!(page_token(&Cursor::Index(1)), None);
    }

    fn window(since: Option<&str>, until: &str) -> SyncWindow {
        let parse = |s: &str| s.parse::<DateTime<Utc>>().unwrap();
        SyncWindow {
            since: since.map(parse),
            until: parse(until),
        }
    }

    #[test]
    fn report_dates_cover_whole_days_only() {
        let week = window(Some("2025-06-01T00:00:00Z"), "2025-06-08T00:00:00Z");
        assert_eq!(
            report_dates(&week),
            Some((
                NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 6, 8).unwrap()
            ))
        );

        let same_day = window(Some("2025-06-08T00:00:01Z"), "2025-06-08T17:30:00Z");
        assert_eq!(report_dates(&same_day), None);
        assert_eq!(report_dates(&window(None, "2025-06-08T17:30:00Z")), None);
    }

    #[test]
    fn report_history_starts_a_week_back_at_midnight() {
        let now = "2025-06-08T17:30:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(
            report_history_start(now),
            Some("2025-06-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap())
        );
        assert_eq!(report_mode(), WatermarkMode::Window { minutes: 10_080 });
    }
}
