use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mktsync_connectors::Cursor;
use mktsync_core::{EntityKind, NormalizedRecord};
use serde_json::Value;

use crate::SyncError;

/// How a source resumes between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkMode {
    /// Resume from the newest `source_updated_at` seen so far.
    Timestamp,
    /// Walk fixed-width time windows; the watermark is the next window start.
    Window { minutes: u32 },
    /// Resume from the saved page cursor; cleared after a full pass.
    Cursor,
    /// Full refresh on every run.
    None,
}

/// Time range a page request is bounded by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub since: Option<DateTime<Utc>>,
    pub until: DateTime<Utc>,
}

/// One page of normalized records.
#[derive(Debug, Default)]
pub struct SourcePage {
    pub records: Vec<NormalizedRecord>,
    pub next: Option<Cursor>,
    /// Newest vendor timestamp on the page when it differs from the records'
    /// own `source_updated_at`.
    pub high_water: Option<DateTime<Utc>>,
    /// Rows dropped because they could not be normalized.
    pub rejected: usize,
}

impl SourcePage {
    /// Normalizes `rows`, counting the ones `normalize` rejects.
    pub fn from_rows<F>(
        entity: EntityKind,
        rows: &[Value],
        next: Option<Cursor>,
        mut normalize: F,
    ) -> Self
    where
        F: FnMut(&Value) -> Option<NormalizedRecord>,
    {
        let mut records = Vec::with_capacity(rows.len());
        let mut rejected = 0;
        for row in rows {
            match normalize(row) {
                Some(record) => records.push(record),
                None => {
                    tracing::warn!(%entity, "row without an external id skipped");
                    rejected += 1;
                }
            }
        }
        Self {
            records,
            next,
            high_water: None,
            rejected,
        }
    }

    /// A page that carried no rows at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.rejected == 0
    }
}

/// A paged vendor entity feed for one tenant.
#[async_trait]
pub trait RecordSource: Send + Sync {
    fn entity(&self) -> EntityKind;

    fn mode(&self) -> WatermarkMode;

    /// Cursor of the first page of a fresh pass.
    fn first_cursor(&self) -> Cursor {
        Cursor::Index(1)
    }

    /// Start of history for timestamp and window sources with nothing stored
    /// yet.
    fn default_since(&self) -> Option<DateTime<Utc>> {
        None
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        window: &SyncWindow,
    ) -> Result<SourcePage, SyncError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn from_rows_counts_rejected_rows() {
        let rows = vec![json!({ "id": "1" }), json!({}), json!({ "id": "3" })];
        let page = SourcePage::from_rows(EntityKind::TiktokShopWarehouse, &rows, None, |row| {
            row.get("id")
                .and_then(Value::as_str)
                .map(|id| NormalizedRecord::new(id, serde_json::Map::new(), row.clone()))
        });
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.rejected, 1);
        assert!(!page.is_empty());
    }

    #[test]
    fn default_page_is_empty() {
        assert!(SourcePage::default().is_empty());
    }
}
