//! Vendors and the entity kinds synced from each of them.

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    Jst,
    Lazada,
    TiktokBusiness,
    TiktokShop,
    Yonsuite,
}

impl Vendor {
    pub const ALL: [Vendor; 5] = [
        Vendor::Jst,
        Vendor::Lazada,
        Vendor::TiktokBusiness,
        Vendor::TiktokShop,
        Vendor::Yonsuite,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Vendor::Jst => "jst",
            Vendor::Lazada => "lazada",
            Vendor::TiktokBusiness => "tiktok_business",
            Vendor::TiktokShop => "tiktok_shop",
            Vendor::Yonsuite => "yonsuite",
        }
    }

    /// Entity kinds synced for this vendor, in the order a full run visits them.
    #[must_use]
    pub fn entities(self) -> Vec<EntityKind> {
        EntityKind::ALL
            .iter()
            .copied()
            .filter(|e| e.vendor() == self)
            .collect()
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Vendor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "jst" => Ok(Vendor::Jst),
            "lazada" => Ok(Vendor::Lazada),
            "tiktok_business" => Ok(Vendor::TiktokBusiness),
            "tiktok_shop" => Ok(Vendor::TiktokShop),
            "yonsuite" => Ok(Vendor::Yonsuite),
            other => Err(CoreError::UnknownVendor(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    JstShop,
    JstWarehouse,
    JstOrder,
    JstStockInout,
    LazadaWarehouse,
    LazadaProduct,
    LazadaOrder,
    LazadaCampaign,
    TiktokShopWarehouse,
    TiktokShopProduct,
    TiktokShopOrder,
    TiktokShopReturn,
    TiktokShopCancellation,
    TiktokShopProductPerformance,
    TiktokShopSkuPerformance,
    TiktokShopVideoPerformance,
    TiktokShopLivePerformance,
    TiktokBusinessAdvertiser,
    TiktokBusinessCampaign,
    TiktokBusinessAdGroup,
    TiktokBusinessAd,
    YonsuiteOrgUnit,
    YonsuiteWarehouse,
    YonsuitePartner,
    YonsuiteProduct,
    YonsuiteOrder,
}

impl EntityKind {
    pub const ALL: [EntityKind; 26] = [
        EntityKind::JstShop,
        EntityKind::JstWarehouse,
        EntityKind::JstOrder,
        EntityKind::JstStockInout,
        EntityKind::LazadaWarehouse,
        EntityKind::LazadaProduct,
        EntityKind::LazadaOrder,
        EntityKind::LazadaCampaign,
        EntityKind::TiktokShopWarehouse,
        EntityKind::TiktokShopProduct,
        EntityKind::TiktokShopOrder,
        EntityKind::TiktokShopReturn,
        EntityKind::TiktokShopCancellation,
        EntityKind::TiktokShopProductPerformance,
        EntityKind::TiktokShopSkuPerformance,
        EntityKind::TiktokShopVideoPerformance,
        EntityKind::TiktokShopLivePerformance,
        EntityKind::TiktokBusinessAdvertiser,
        EntityKind::TiktokBusinessCampaign,
        EntityKind::TiktokBusinessAdGroup,
        EntityKind::TiktokBusinessAd,
        EntityKind::YonsuiteOrgUnit,
        EntityKind::YonsuiteWarehouse,
        EntityKind::YonsuitePartner,
        EntityKind::YonsuiteProduct,
        EntityKind::YonsuiteOrder,
    ];

    #[must_use]
    pub fn vendor(self) -> Vendor {
        match self {
            EntityKind::JstShop
            | EntityKind::JstWarehouse
            | EntityKind::JstOrder
            | EntityKind::JstStockInout => Vendor::Jst,
            EntityKind::LazadaWarehouse
            | EntityKind::LazadaProduct
            | EntityKind::LazadaOrder
            | EntityKind::LazadaCampaign => Vendor::Lazada,
            EntityKind::TiktokShopWarehouse
            | EntityKind::TiktokShopProduct
            | EntityKind::TiktokShopOrder
            | EntityKind::TiktokShopReturn
            | EntityKind::TiktokShopCancellation
            | EntityKind::TiktokShopProductPerformance
            | EntityKind::TiktokShopSkuPerformance
            | EntityKind::TiktokShopVideoPerformance
            | EntityKind::TiktokShopLivePerformance => Vendor::TiktokShop,
            EntityKind::TiktokBusinessAdvertiser
            | EntityKind::TiktokBusinessCampaign
            | EntityKind::TiktokBusinessAdGroup
            | EntityKind::TiktokBusinessAd => Vendor::TiktokBusiness,
            EntityKind::YonsuiteOrgUnit
            | EntityKind::YonsuiteWarehouse
            | EntityKind::YonsuitePartner
            | EntityKind::YonsuiteProduct
            | EntityKind::YonsuiteOrder => Vendor::Yonsuite,
        }
    }

    /// Name of the entity within its vendor, e.g. `"order"`.
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            EntityKind::JstShop => "shop",
            EntityKind::JstWarehouse
            | EntityKind::LazadaWarehouse
            | EntityKind::TiktokShopWarehouse
            | EntityKind::YonsuiteWarehouse => "warehouse",
            EntityKind::JstOrder
            | EntityKind::LazadaOrder
            | EntityKind::TiktokShopOrder
            | EntityKind::YonsuiteOrder => "order",
            EntityKind::JstStockInout => "stock_inout",
            EntityKind::LazadaProduct
            | EntityKind::TiktokShopProduct
            | EntityKind::YonsuiteProduct => "product",
            EntityKind::LazadaCampaign | EntityKind::TiktokBusinessCampaign => "campaign",
            EntityKind::TiktokBusinessAdvertiser => "advertiser",
            EntityKind::TiktokBusinessAdGroup => "ad_group",
            EntityKind::TiktokBusinessAd => "ad",
            EntityKind::YonsuiteOrgUnit => "org_unit",
            EntityKind::YonsuitePartner => "partner",
            EntityKind::TiktokShopReturn => "return",
            EntityKind::TiktokShopCancellation => "cancellation",
            EntityKind::TiktokShopProductPerformance => "product_performance",
            EntityKind::TiktokShopSkuPerformance => "sku_performance",
            EntityKind::TiktokShopVideoPerformance => "video_performance",
            EntityKind::TiktokShopLivePerformance => "live_performance",
        }
    }

    /// Storage key, `"<vendor>.<entity>"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::JstShop => "jst.shop",
            EntityKind::JstWarehouse => "jst.warehouse",
            EntityKind::JstOrder => "jst.order",
            EntityKind::JstStockInout => "jst.stock_inout",
            EntityKind::LazadaWarehouse => "lazada.warehouse",
            EntityKind::LazadaProduct => "lazada.product",
            EntityKind::LazadaOrder => "lazada.order",
            EntityKind::LazadaCampaign => "lazada.campaign",
            EntityKind::TiktokShopWarehouse => "tiktok_shop.warehouse",
            EntityKind::TiktokShopProduct => "tiktok_shop.product",
            EntityKind::TiktokShopOrder => "tiktok_shop.order",
            EntityKind::TiktokShopReturn => "tiktok_shop.return",
            EntityKind::TiktokShopCancellation => "tiktok_shop.cancellation",
            EntityKind::TiktokShopProductPerformance => "tiktok_shop.product_performance",
            EntityKind::TiktokShopSkuPerformance => "tiktok_shop.sku_performance",
            EntityKind::TiktokShopVideoPerformance => "tiktok_shop.video_performance",
            EntityKind::TiktokShopLivePerformance => "tiktok_shop.live_performance",
            EntityKind::TiktokBusinessAdvertiser => "tiktok_business.advertiser",
            EntityKind::TiktokBusinessCampaign => "tiktok_business.campaign",
            EntityKind::TiktokBusinessAdGroup => "tiktok_business.ad_group",
            EntityKind::TiktokBusinessAd => "tiktok_business.ad",
            EntityKind::YonsuiteOrgUnit => "yonsuite.org_unit",
            EntityKind::YonsuiteWarehouse => "yonsuite.warehouse",
            EntityKind::YonsuitePartner => "yonsuite.partner",
            EntityKind::YonsuiteProduct => "yonsuite.product",
            EntityKind::YonsuiteOrder => "yonsuite.order",
        }
    }

    /// Whether records of this kind own a child line collection.
    #[must_use]
    pub fn has_lines(self) -> bool {
        matches!(
            self,
            EntityKind::JstOrder
                | EntityKind::JstStockInout
                | EntityKind::LazadaOrder
                | EntityKind::LazadaProduct
                | EntityKind::TiktokShopOrder
                | EntityKind::TiktokShopProduct
                | EntityKind::TiktokShopReturn
                | EntityKind::TiktokShopCancellation
                | EntityKind::YonsuiteOrder
        )
    }

    /// Mapped fields whose value history is recorded on every change.
    #[must_use]
    pub fn tracked_fields(self) -> &'static [&'static str] {
        match self {
            EntityKind::JstOrder => &["status"],
            _ => &[],
        }
    }

    /// Whether records of this kind form a parent/child tree.
    #[must_use]
    pub fn is_tree(self) -> bool {
        matches!(self, EntityKind::YonsuiteOrgUnit)
    }

    /// Resolve an entity by vendor and short name (`"order"`) or storage key
    /// (`"jst.order"`).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownEntity`] when no entity of `vendor` matches.
    pub fn find(vendor: Vendor, name: &str) -> Result<Self, CoreError> {
        let name = name.trim().to_ascii_lowercase().replace('-', "_");
        EntityKind::ALL
            .iter()
            .copied()
            .filter(|e| e.vendor() == vendor)
            .find(|e| e.short_name() == name || e.as_str() == name)
            .ok_or_else(|| CoreError::UnknownEntity {
                vendor: vendor.to_string(),
                entity: name,
            })
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (vendor, entity) = s.split_once('.').ok_or_else(|| CoreError::UnknownEntity {
            vendor: String::new(),
            entity: s.to_string(),
        })?;
        EntityKind::find(vendor.parse()?, entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_round_trips_through_str() {
        for vendor in Vendor::ALL {
            assert_eq!(vendor.as_str().parse::<Vendor>().unwrap(), vendor);
        }
    }

    #[test]
    fn vendor_accepts_kebab_case() {
        assert_eq!("tiktok-shop".parse::<Vendor>().unwrap(), Vendor::TiktokShop);
    }

    #[test]
    fn vendor_rejects_unknown() {
        assert!(matches!(
            "shopee".parse::<Vendor>(),
            Err(CoreError::UnknownVendor(ref v)) if v == "shopee"
        ));
    }

    #[test]
    fn entity_storage_keys_are_unique_and_prefixed_by_vendor() {
        let mut seen = std::collections::HashSet::new();
        for entity in EntityKind::ALL {
            assert!(seen.insert(entity.as_str()), "duplicate key {entity}");
            assert!(entity.as_str().starts_with(entity.vendor().as_str()));
        }
    }

    #[test]
    fn entity_find_by_short_name_is_vendor_scoped() {
        assert_eq!(
            EntityKind::find(Vendor::Lazada, "order").unwrap(),
            EntityKind::LazadaOrder
        );
        assert_eq!(
            EntityKind::find(Vendor::TiktokShop, "order").unwrap(),
            EntityKind::TiktokShopOrder
        );
        assert!(EntityKind::find(Vendor::Jst, "campaign").is_err());
    }

    #[test]
    fn entity_parses_storage_key() {
        assert_eq!(
            "tiktok_business.ad_group".parse::<EntityKind>().unwrap(),
            EntityKind::TiktokBusinessAdGroup
        );
    }

    #[test]
    fn vendor_entities_follow_run_order() {
        assert_eq!(
            Vendor::TiktokShop.entities(),
            vec![
                EntityKind::TiktokShopWarehouse,
                EntityKind::TiktokShopProduct,
                EntityKind::TiktokShopOrder,
                EntityKind::TiktokShopReturn,
                EntityKind::TiktokShopCancellation,
                EntityKind::TiktokShopProductPerformance,
                EntityKind::TiktokShopSkuPerformance,
                EntityKind::TiktokShopVideoPerformance,
                EntityKind::TiktokShopLivePerformance,
            ]
        );
        assert_eq!(
            EntityKind::find(Vendor::TiktokShop, "live_performance").unwrap(),
            EntityKind::TiktokShopLivePerformance
        );
    }

    #[test]
    fn only_jst_orders_track_status() {
        assert_eq!(EntityKind::JstOrder.tracked_fields(), &["status"]);
        assert!(EntityKind::LazadaOrder.tracked_fields().is_empty());
    }
}
