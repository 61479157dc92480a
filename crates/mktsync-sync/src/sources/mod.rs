//! One [`RecordSource`] per vendor entity.

pub mod jst;
pub mod lazada;
pub mod tiktok_business;
pub mod tiktok_shop;
pub mod yonsuite;

use mktsync_connectors::jst::JstAccess;
use mktsync_connectors::tiktok_shop::{AfterSale, ShopAccess, ShopReport};
use mktsync_connectors::yonsuite::{DEFAULT_PAGE_SIZE, DEFAULT_ROOT_ORG_CODE};
use mktsync_core::EntityKind;
use mktsync_db::TenantRow;
use serde_json::Value;

use crate::clients::VendorClient;
use crate::source::RecordSource;
use crate::SyncError;

use self::jst::{JstInoutSource, JstOrderSource, JstShopSource, JstWarehouseSource};
use self::lazada::{
    LazadaCampaignSource, LazadaOrderSource, LazadaProductSource, LazadaWarehouseSource,
};
use self::tiktok_business::{
    split_advertiser_ids, AdObject, TiktokAdObjectSource, TiktokAdvertiserSource,
};
use self::tiktok_shop::{
    TiktokShopAfterSaleSource, TiktokShopLiveSource, TiktokShopOrderSource,
    TiktokShopProductSource, TiktokShopReportSource, TiktokShopWarehouseSource,
};
use self::yonsuite::{
    YonsuiteList, YonsuiteListSource, YonsuiteOrderSource, YonsuiteOrgUnitSource,
};

const DEFAULT_LAZADA_BIZ_CODE: &str = "sponsoredSearch";
const DEFAULT_LAZADA_COUNTRY: &str = "VN";

/// Builds the source for `entity`, reading per-tenant tuning from the
/// tenant's settings:
///
/// | setting          | used by                          |
/// |------------------|----------------------------------|
/// | `window_minutes` | JST orders and inouts            |
/// | `country`        | Lazada warehouses                |
/// | `biz_code`       | Lazada campaigns                 |
/// | `product_details`| Lazada products (default `true`) |
/// | `page_size`      | YonSuite lists                   |
/// | `root_org_code`  | YonSuite org units               |
///
/// # Errors
///
/// Returns [`SyncError::UnsupportedEntity`] when `entity` belongs to another
/// vendor than `client`, and [`SyncError::MissingCredential`] when a JST or
/// TikTok tenant has no `external_ref` to scope calls with.
pub fn build_source<'a>(
    client: &'a VendorClient,
    tenant: &TenantRow,
    access_token: String,
    entity: EntityKind,
    default_window_minutes: u32,
) -> Result<Box<dyn RecordSource + 'a>, SyncError> {
    let external_ref = |what: &'static str| {
        tenant
            .external_ref
            .clone()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| SyncError::MissingCredential {
                tenant: tenant.slug.clone(),
                what,
            })
    };

    let unsupported = || SyncError::UnsupportedEntity {
        vendor: client.vendor(),
        entity,
    };
    if entity.vendor() != client.vendor() {
        return Err(unsupported());
    }

    let source: Box<dyn RecordSource + 'a> = match client {
        VendorClient::Jst(client) => {
            let access = JstAccess {
                access_token,
                company_id: external_ref("JST company id")?,
            };
            let window_minutes = tenant.setting_u32("window_minutes", default_window_minutes);
            match entity {
                EntityKind::JstOrder => Box::new(JstOrderSource {
                    client,
                    access,
                    window_minutes,
                }),
                EntityKind::JstStockInout => Box::new(JstInoutSource {
                    client,
                    access,
                    window_minutes,
                }),
                EntityKind::JstShop => Box::new(JstShopSource { client, access }),
                EntityKind::JstWarehouse => Box::new(JstWarehouseSource { client, access }),
                _ => return Err(unsupported()),
            }
        }
        VendorClient::Lazada(client) => match entity {
            EntityKind::LazadaOrder => Box::new(LazadaOrderSource {
                client,
                access_token,
            }),
            EntityKind::LazadaProduct => Box::new(LazadaProductSource {
                client,
                access_token,
                with_details: tenant
                    .settings
                    .get("product_details")
                    .and_then(Value::as_bool)
                    .unwrap_or(true),
            }),
            EntityKind::LazadaWarehouse => Box::new(LazadaWarehouseSource {
                client,
                access_token,
                country_code: tenant
                    .setting_str("country")
                    .unwrap_or_else(|| DEFAULT_LAZADA_COUNTRY.to_owned()),
            }),
            EntityKind::LazadaCampaign => Box::new(LazadaCampaignSource {
                client,
                access_token,
                biz_code: tenant
                    .setting_str("biz_code")
                    .unwrap_or_else(|| DEFAULT_LAZADA_BIZ_CODE.to_owned()),
            }),
            _ => return Err(unsupported()),
        },
        VendorClient::TiktokShop(client) => {
            let access = ShopAccess {
                access_token,
                shop_cipher: external_ref("TikTok Shop cipher")?,
            };
            let after_sale = |kind| TiktokShopAfterSaleSource {
                client,
                access: access.clone(),
                kind,
            };
            let report = |report| TiktokShopReportSource {
                client,
                access: access.clone(),
                report,
            };
            match entity {
                EntityKind::TiktokShopReturn => Box::new(after_sale(AfterSale::Return)),
                EntityKind::TiktokShopCancellation => Box::new(after_sale(AfterSale::Cancellation)),
                EntityKind::TiktokShopProductPerformance => Box::new(report(ShopReport::Product)),
                EntityKind::TiktokShopSkuPerformance => Box::new(report(ShopReport::Sku)),
                EntityKind::TiktokShopVideoPerformance => Box::new(report(ShopReport::Video)),
                EntityKind::TiktokShopLivePerformance => {
                    Box::new(TiktokShopLiveSource { client, access })
                }
                EntityKind::TiktokShopOrder => Box::new(TiktokShopOrderSource { client, access }),
                EntityKind::TiktokShopProduct => {
                    Box::new(TiktokShopProductSource { client, access })
                }
                EntityKind::TiktokShopWarehouse => {
                    Box::new(TiktokShopWarehouseSource { client, access })
                }
                _ => return Err(unsupported()),
            }
        }
        VendorClient::TiktokBusiness(client) => {
            let advertiser_ids =
                split_advertiser_ids(Some(&external_ref("TikTok advertiser ids")?));
            let object = match entity {
                EntityKind::TiktokBusinessAdvertiser => {
                    return Ok(Box::new(TiktokAdvertiserSource {
                        client,
                        access_token,
                        advertiser_ids,
                    }));
                }
                EntityKind::TiktokBusinessCampaign => AdObject::Campaign,
                EntityKind::TiktokBusinessAdGroup => AdObject::AdGroup,
                EntityKind::TiktokBusinessAd => AdObject::Ad,
                _ => return Err(unsupported()),
            };
            Box::new(TiktokAdObjectSource {
                client,
                access_token,
                advertiser_ids,
                object,
            })
        }
        VendorClient::Yonsuite(client) => {
            let page_size = tenant.setting_u32("page_size", DEFAULT_PAGE_SIZE);
            let list = |kind| -> Box<dyn RecordSource + 'a> {
                Box::new(YonsuiteListSource {
                    client,
                    access_token: access_token.clone(),
                    page_size,
                    list: kind,
                })
            };
            match entity {
                EntityKind::YonsuitePartner => list(YonsuiteList::Partner),
                EntityKind::YonsuiteProduct => list(YonsuiteList::Product),
                EntityKind::YonsuiteWarehouse => list(YonsuiteList::Warehouse),
                EntityKind::YonsuiteOrder => Box::new(YonsuiteOrderSource {
                    client,
                    access_token,
                    page_size,
                }),
                EntityKind::YonsuiteOrgUnit => Box::new(YonsuiteOrgUnitSource {
                    client,
                    access_token,
                    root_code: tenant
                        .setting_str("root_org_code")
                        .unwrap_or_else(|| DEFAULT_ROOT_ORG_CODE.to_owned()),
                }),
                _ => return Err(unsupported()),
            }
        }
    };
    Ok(source)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mktsync_connectors::{Cursor, HttpSettings, JstClient, TiktokShopClient, YonsuiteClient};
    use serde_json::json;

    use super::*;
    use crate::source::WatermarkMode;

    fn tenant(vendor: &str, external_ref: Option<&str>, settings: Value) -> TenantRow {
        TenantRow {
            id: 1,
            vendor: vendor.to_owned(),
            slug: format!("{vendor}-test"),
            name: "Test".to_owned(),
            external_ref: external_ref.map(str::to_owned),
            app_key: None,
            app_secret: None,
            access_token: Some("token".to_owned()),
            refresh_token: None,
            token_expires_at: None,
            refresh_expires_at: None,
            auth_status: "authorized".to_owned(),
            sync_since: None,
            is_active: true,
            settings,
            last_sync_at: None,
            last_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn jst() -> VendorClient {
        VendorClient::Jst(JstClient::new("key", "secret", HttpSettings::for_tests()).unwrap())
    }

    #[test]
    fn rejects_entity_of_another_vendor() {
        let client = jst();
        let row = tenant("jst", Some("10001"), json!({}));
        let err = build_source(
            &client,
            &row,
            "token".to_owned(),
            EntityKind::LazadaOrder,
            6,
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            SyncError::UnsupportedEntity {
                entity: EntityKind::LazadaOrder,
                ..
            }
        ));
    }

    #[test]
    fn jst_requires_company_id() {
        let client = jst();
        let row = tenant("jst", None, json!({}));
        let err = build_source(&client, &row, "token".to_owned(), EntityKind::JstOrder, 6)
            .err()
            .unwrap();
        assert!(matches!(err, SyncError::MissingCredential { .. }));
    }

    #[test]
    fn window_minutes_setting_overrides_default() {
        let client = jst();
        let row = tenant("jst", Some("10001"), json!({ "window_minutes": 30 }));
        let source =
            build_source(&client, &row, "token".to_owned(), EntityKind::JstOrder, 6).unwrap();
        assert_eq!(source.mode(), WatermarkMode::Window { minutes: 30 });
        assert_eq!(source.entity(), EntityKind::JstOrder);
    }

    #[test]
    fn yonsuite_lists_resume_from_cursor() {
        let client = VendorClient::Yonsuite(
            YonsuiteClient::new(
                "key",
                "secret",
                HttpSettings::for_tests(),
                "https://yonsuite.example.com",
            )
            .unwrap(),
        );
        let row = tenant("yonsuite", None, json!({ "page_size": 100 }));
        let source = build_source(
            &client,
            &row,
            "token".to_owned(),
            EntityKind::YonsuiteProduct,
            6,
        )
        .unwrap();
        assert_eq!(source.mode(), WatermarkMode::Cursor);

        let org = build_source(
            &client,
            &row,
            "token".to_owned(),
            EntityKind::YonsuiteOrgUnit,
            6,
        )
        .unwrap();
        assert_eq!(org.mode(), WatermarkMode::None);
    }

    #[test]
    fn tiktok_shop_reports_use_weekly_windows() {
        let client = VendorClient::TiktokShop(
            TiktokShopClient::new("key", "secret", HttpSettings::for_tests()).unwrap(),
        );
        let row = tenant("tiktok_shop", Some("ROW_cipher"), json!({}));
        for entity in [
            EntityKind::TiktokShopProductPerformance,
            EntityKind::TiktokShopSkuPerformance,
            EntityKind::TiktokShopVideoPerformance,
            EntityKind::TiktokShopLivePerformance,
        ] {
            let source = build_source(&client, &row, "token".to_owned(), entity, 6).unwrap();
            assert_eq!(source.entity(), entity);
            assert_eq!(source.mode(), WatermarkMode::Window { minutes: 10_080 });
            assert!(source
                .default_since()
                .is_some_and(|since| since < Utc::now()));
        }

        let returns = build_source(
            &client,
            &row,
            "token".to_owned(),
            EntityKind::TiktokShopReturn,
            6,
        )
        .unwrap();
        assert_eq!(returns.mode(), WatermarkMode::Timestamp);
        assert_eq!(returns.first_cursor(), Cursor::Token(String::new()));
    }
}
