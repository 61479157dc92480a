use std::collections::HashMap;

use async_trait::async_trait;
use mktsync_connectors::yonsuite::{fields, YonsuiteClient};
use mktsync_connectors::{ConnectorError, Cursor, Page};
use mktsync_core::mapping::value_as_string;
use mktsync_core::{EntityKind, NormalizedRecord};
use serde_json::Value;

use crate::source::{RecordSource, SourcePage, SyncWindow, WatermarkMode};
use crate::SyncError;

/// The paged YonSuite master-data lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YonsuiteList {
    Partner,
    Product,
    Warehouse,
}

/// Partners, products or warehouses, resumed from the last stored page.
pub struct YonsuiteListSource<'a> {
    pub(crate) client: &'a YonsuiteClient,
    pub(crate) access_token: String,
    pub(crate) page_size: u32,
    pub(crate) list: YonsuiteList,
}

impl YonsuiteListSource<'_> {
    async fn fetch(&self, page_index: u32) -> Result<Page<Value>, ConnectorError> {
        let (token, size) = (self.access_token.as_str(), self.page_size);
        match self.list {
            YonsuiteList::Partner => self.client.get_partners(token, page_index, size).await,
            YonsuiteList::Product => self.client.get_products(token, page_index, size).await,
            YonsuiteList::Warehouse => self.client.get_warehouses(token, page_index, size).await,
        }
    }

    fn normalizer(&self) -> fn(&Value) -> Option<NormalizedRecord> {
        match self.list {
            YonsuiteList::Partner => fields::normalize_partner,
            YonsuiteList::Product => fields::normalize_product,
            YonsuiteList::Warehouse => fields::normalize_warehouse,
        }
    }
}

#[async_trait]
impl RecordSource for YonsuiteListSource<'_> {
    fn entity(&self) -> EntityKind {
        match self.list {
            YonsuiteList::Partner => EntityKind::YonsuitePartner,
            YonsuiteList::Product => EntityKind::YonsuiteProduct,
            YonsuiteList::Warehouse => EntityKind::YonsuiteWarehouse,
        }
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::Cursor
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        _window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let list = self.fetch(cursor.index().unwrap_or(1)).await?;
        Ok(SourcePage::from_rows(
            self.entity(),
            &list.items,
            list.next,
            self.normalizer(),
        ))
    }
}

/// Sales quotations with their lines from the detail endpoint.
pub struct YonsuiteOrderSource<'a> {
    pub(crate) client: &'a YonsuiteClient,
    pub(crate) access_token: String,
    pub(crate) page_size: u32,
}

#[async_trait]
impl RecordSource for YonsuiteOrderSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::YonsuiteOrder
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::Cursor
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        _window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let list = self
            .client
            .get_orders(
                &self.access_token,
                cursor.index().unwrap_or(1),
                self.page_size,
            )
            .await?;

        let mut details: HashMap<String, Value> = HashMap::new();
        for row in &list.items {
            let Some(id) = row.get("id").and_then(value_as_string) else {
                continue;
            };
            match self.client.get_order_detail(&self.access_token, &id).await {
                Ok(detail) if detail.is_object() => {
                    details.insert(id, detail);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    order_id = %id,
                    error = %e,
                    "YonSuite order detail failed; keeping list row"
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
                fields::normalize_order(row, detail)
            },
        ))
    }
}

/// The organisation tree, fetched whole. Parent links are resolved once the
/// units are stored.
pub struct YonsuiteOrgUnitSource<'a> {
    pub(crate) client: &'a YonsuiteClient,
    pub(crate) access_token: String,
    pub(crate) root_code: String,
}

#[async_trait]
impl RecordSource for YonsuiteOrgUnitSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::YonsuiteOrgUnit
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::None
    }

    async fn fetch_page(
        &self,
        _cursor: &Cursor,
        _window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let units = self
            .client
            .get_org_units(&self.access_token, &self.root_code)
            .await?;
        Ok(SourcePage::from_rows(
            self.entity(),
            &units,
            None,
            fields::normalize_org_unit,
        ))
    }
}
