use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mktsync_connectors::lazada::{fields, LazadaClient, ITEMS_BATCH};
use mktsync_connectors::Cursor;
use mktsync_core::mapping::value_as_string;
use mktsync_core::EntityKind;
use serde_json::Value;

use crate::source::{RecordSource, SourcePage, SyncWindow, WatermarkMode};
use crate::SyncError;

/// Orders updated since the watermark, each with its items.
pub struct LazadaOrderSource<'a> {
    pub(crate) client: &'a LazadaClient,
    pub(crate) access_token: String,
}

#[async_trait]
impl RecordSource for LazadaOrderSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::LazadaOrder
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::Timestamp
    }

    fn first_cursor(&self) -> Cursor {
        Cursor::Offset(0)
    }

    fn default_since(&self) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single()
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let update_after = window
            .since
            .or_else(|| self.default_since())
            .unwrap_or_default();
        let list = self
            .client
            .get_orders(
                &self.access_token,
                update_after,
                cursor.offset().unwrap_or(0),
            )
            .await?;

        let ids = fields::order_ids(&list.items);
        let mut items: HashMap<String, Vec<Value>> = HashMap::new();
        for batch in ids.chunks(ITEMS_BATCH) {
            for entry in self
                .client
                .get_order_items(&self.access_token, batch)
                .await?
            {
                let Some(order_id) = entry.get("order_id").and_then(value_as_string) else {
                    continue;
                };
                let order_items = match entry.get("order_items") {
                    Some(Value::Array(rows)) => rows.clone(),
                    _ => Vec::new(),
                };
                items.entry(order_id).or_default().extend(order_items);
            }
        }

        Ok(SourcePage::from_rows(
            self.entity(),
            &list.items,
            list.next,
            |order| {
                let lines = order
                    .get("order_id")
                    .and_then(value_as_string)
                    .and_then(|id| items.get(&id))
                    .map_or(&[][..], Vec::as_slice);
                fields::normalize_order(order, lines)
            },
        ))
    }
}

/// Products with their SKUs, refreshed in full.
pub struct LazadaProductSource<'a> {
    pub(crate) client: &'a LazadaClient,
    pub(crate) access_token: String,
    /// Fetch `/product/item/get` for every listed product.
    pub(crate) with_details: bool,
}

#[async_trait]
impl RecordSource for LazadaProductSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::LazadaProduct
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::None
    }

    fn first_cursor(&self) -> Cursor {
        Cursor::Offset(0)
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        _window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let list = self
            .client
            .get_products(&self.access_token, cursor.offset().unwrap_or(0))
            .await?;

        let mut details: HashMap<String, Value> = HashMap::new();
        if self.with_details {
            for row in &list.items {
                let Some(item_id) = row.get("item_id").and_then(value_as_string) else {
                    continue;
                };
                match self.client.get_product(&self.access_token, &item_id).await {
                    Ok(detail) if !detail.is_null() => {
                        details.insert(item_id, detail);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(
                        item_id = %item_id,
                        error = %e,
                        "Lazada product detail failed; using list row"
                    ),
                }
            }
        }

        Ok(SourcePage::from_rows(
            self.entity(),
            &list.items,
            list.next,
            |row| {
                let detail = row
                    .get("item_id")
                    .and_then(value_as_string)
                    .and_then(|id| details.get(&id));
                fields::normalize_product(row, detail)
            },
        ))
    }
}

/// FBL warehouses of the seller's venture.
pub struct LazadaWarehouseSource<'a> {
    pub(crate) client: &'a LazadaClient,
    pub(crate) access_token: String,
    pub(crate) country_code: String,
}

const WAREHOUSES_PER_PAGE: u32 = 50;

#[async_trait]
impl RecordSource for LazadaWarehouseSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::LazadaWarehouse
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::None
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        _window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let list = self
            .client
            .get_warehouses(
                &self.access_token,
                &self.country_code,
                cursor.index().unwrap_or(1),
                WAREHOUSES_PER_PAGE,
            )
            .await?;
        Ok(SourcePage::from_rows(
            self.entity(),
            &list.items,
            list.next,
            fields::normalize_warehouse,
        ))
    }
}

/// Sponsored-solutions campaigns, with detail layered on when available.
pub struct LazadaCampaignSource<'a> {
    pub(crate) client: &'a LazadaClient,
    pub(crate) access_token: String,
    pub(crate) biz_code: String,
}

const CAMPAIGNS_PER_PAGE: u32 = 100;

#[async_trait]
impl RecordSource for LazadaCampaignSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::LazadaCampaign
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::None
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        _window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let list = self
            .client
            .search_campaigns(
                &self.access_token,
                &self.biz_code,
                cursor.index().unwrap_or(1),
                CAMPAIGNS_PER_PAGE,
                None,
            )
            .await?;

        let mut details: HashMap<String, Value> = HashMap::new();
        for row in &list.items {
            let Some(campaign_id) = row.get("campaignId").and_then(value_as_string) else {
                continue;
            };
            match self
                .client
                .get_campaign(&self.access_token, &self.biz_code, &campaign_id)
                .await
            {
                Ok(Some(detail)) => {
                    details.insert(campaign_id, detail);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    campaign_id = %campaign_id,
                    error = %e,
                    "Lazada campaign detail failed"
                ),
            }
        }

        Ok(SourcePage::from_rows(
            self.entity(),
            &list.items,
            list.next,
            |row| {
                let detail = row
                    .get("campaignId")
                    .and_then(value_as_string)
                    .and_then(|id| details.get(&id));
                fields::normalize_campaign(row, detail)
            },
        ))
    }
}
