use std::collections::HashMap;

use async_trait::async_trait;
use mktsync_connectors::jst::{
    fields, InoutTimeField, JstAccess, JstClient, OrderTimeField, DETAIL_BATCH,
};
use mktsync_connectors::{Cursor, Page};
use mktsync_core::mapping::{value_as_i64, value_as_string};
use mktsync_core::{EntityKind, NormalizedRecord};
use serde_json::Value;

use crate::source::{RecordSource, SourcePage, SyncWindow, WatermarkMode};
use crate::SyncError;

fn ids(rows: &[Value], key: &str) -> Vec<i64> {
    rows.iter()
        .filter_map(|row| row.get(key).and_then(value_as_i64))
        .collect()
}

/// Detail rows for `ids`, fetched in batches the detail endpoints accept.
async fn details<F, Fut>(ids: &[i64], mut fetch: F) -> Result<Vec<Value>, SyncError>
where
    F: FnMut(Vec<i64>) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<Value>, mktsync_connectors::ConnectorError>>,
{
    let mut rows = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(DETAIL_BATCH) {
        rows.extend(fetch(chunk.to_vec()).await?);
    }
    Ok(rows)
}

/// Detail rows as a page carrying the list page's cursor. Ids the detail call
/// did not return count as rejected so a short response never ends the loop.
fn page_of<F>(
    entity: EntityKind,
    list: &Page<Value>,
    requested: usize,
    rows: &[Value],
    normalize: F,
) -> SourcePage
where
    F: FnMut(&Value) -> Option<NormalizedRecord>,
{
    let mut page = SourcePage::from_rows(entity, rows, list.next.clone(), normalize);
    let missing = requested.saturating_sub(rows.len());
    if missing > 0 {
        tracing::warn!(%entity, missing, "detail call returned fewer rows than requested");
        page.rejected += missing;
    }
    page
}

/// Orders modified inside the current time window.
pub struct JstOrderSource<'a> {
    pub(crate) client: &'a JstClient,
    pub(crate) access: JstAccess,
    pub(crate) window_minutes: u32,
}

#[async_trait]
impl RecordSource for JstOrderSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::JstOrder
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::Window {
            minutes: self.window_minutes,
        }
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let list = self
            .client
            .get_orders(
                &self.access,
                OrderTimeField::Modified,
                window.since.unwrap_or_default(),
                window.until,
                cursor.index().unwrap_or(1),
            )
            .await?;
        let order_ids = ids(&list.items, "orderId");
        let rows = details(&order_ids, |batch| async move {
            self.client.get_order_details(&self.access, &batch).await
        })
        .await?;
        Ok(page_of(
            self.entity(),
            &list,
            order_ids.len(),
            &rows,
            fields::normalize_order,
        ))
    }
}

/// Sale inouts created inside the current time window, with their items.
pub struct JstInoutSource<'a> {
    pub(crate) client: &'a JstClient,
    pub(crate) access: JstAccess,
    pub(crate) window_minutes: u32,
}

#[async_trait]
impl RecordSource for JstInoutSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::JstStockInout
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::Window {
            minutes: self.window_minutes,
        }
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let list = self
            .client
            .get_inouts(
                &self.access,
                InoutTimeField::Created,
                window.since.unwrap_or_default(),
                window.until,
                cursor.index().unwrap_or(1),
            )
            .await?;
        let inout_ids = ids(&list.items, "inoutId");
        let rows = details(&inout_ids, |batch| async move {
            self.client.get_inout_items(&self.access, &batch).await
        })
        .await?;

        let list_rows: HashMap<String, &Value> = list
            .items
            .iter()
            .filter_map(|row| Some((row.get("inoutId").and_then(value_as_string)?, row)))
            .collect();
        Ok(page_of(
            self.entity(),
            &list,
            inout_ids.len(),
            &rows,
            |detail| {
                let list_row = detail
                    .get("inoutId")
                    .and_then(value_as_string)
                    .and_then(|id| list_rows.get(&id).copied());
                fields::normalize_inout(detail, list_row)
            },
        ))
    }
}

/// Shops, refreshed in full.
pub struct JstShopSource<'a> {
    pub(crate) client: &'a JstClient,
    pub(crate) access: JstAccess,
}

#[async_trait]
impl RecordSource for JstShopSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::JstShop
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::None
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let list = self
            .client
            .get_shops(
                &self.access,
                window.since.unwrap_or_default(),
                window.until,
                cursor.index().unwrap_or(1),
            )
            .await?;
        Ok(SourcePage::from_rows(
            self.entity(),
            &list.items,
            list.next,
            fields::normalize_shop,
        ))
    }
}

/// Warehouses, returned by JST in a single response.
pub struct JstWarehouseSource<'a> {
    pub(crate) client: &'a JstClient,
    pub(crate) access: JstAccess,
}

#[async_trait]
impl RecordSource for JstWarehouseSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::JstWarehouse
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
