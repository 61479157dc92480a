//! Lazada field tables and record normalisation.

use mktsync_core::mapping::{
    lookup, map_fields, parse_iso_datetime, unix_millis, Coercion, FieldMap, FieldSpec,
};
use mktsync_core::{NormalizedLine, NormalizedRecord};
use serde_json::{Map, Value};

use crate::{array_field, str_field};

use Coercion::{Bool, Float, Integer, IsoDateTime, Text};

pub const ORDER_FIELDS: &FieldMap = &[
    FieldSpec::same("order_id", Text),
    FieldSpec::same("order_number", Text),
    FieldSpec::new("statuses.0", "status", Text),
    FieldSpec::same("created_at", IsoDateTime),
    FieldSpec::same("updated_at", IsoDateTime),
    FieldSpec::same("payment_method", Text),
    FieldSpec::same("price", Float),
    FieldSpec::same("shipping_fee", Float),
    FieldSpec::same("shipping_fee_original", Float),
    FieldSpec::same("shipping_fee_discount_platform", Float),
    FieldSpec::same("shipping_fee_discount_seller", Float),
    FieldSpec::same("voucher", Float),
    FieldSpec::same("voucher_platform", Float),
    FieldSpec::same("voucher_seller", Float),
    FieldSpec::same("items_count", Integer),
    FieldSpec::same("warehouse_code", Text),
    FieldSpec::same("gift_option", Bool),
    FieldSpec::same("gift_message", Text),
    FieldSpec::same("is_cancel_pending", Bool),
    FieldSpec::same("need_cancel_confirm", Bool),
    FieldSpec::same("remarks", Text),
    FieldSpec::same("buyer_note", Text),
    FieldSpec::same("customer_first_name", Text),
    FieldSpec::same("customer_last_name", Text),
    FieldSpec::new("address_shipping.first_name", "shipping_first_name", Text),
    FieldSpec::new("address_shipping.last_name", "shipping_last_name", Text),
    FieldSpec::new("address_shipping.phone", "shipping_phone", Text),
    FieldSpec::new("address_shipping.address1", "shipping_address1", Text),
    FieldSpec::new("address_shipping.city", "shipping_city", Text),
    FieldSpec::new("address_shipping.addressDsitrict", "shipping_district", Text),
    FieldSpec::new("address_shipping.post_code", "shipping_post_code", Text),
    FieldSpec::new("address_shipping.country", "shipping_country", Text),
    FieldSpec::new("address_billing.first_name", "billing_first_name", Text),
    FieldSpec::new("address_billing.last_name", "billing_last_name", Text),
    FieldSpec::new("address_billing.phone", "billing_phone", Text),
    FieldSpec::new("address_billing.address1", "billing_address1", Text),
    FieldSpec::new("address_billing.city", "billing_city", Text),
    FieldSpec::new("address_billing.post_code", "billing_post_code", Text),
    FieldSpec::new("address_billing.country", "billing_country", Text),
];

pub const ORDER_ITEM_FIELDS: &FieldMap = &[
    FieldSpec::same("order_item_id", Text),
    FieldSpec::same("order_id", Text),
    FieldSpec::same("sku", Text),
    FieldSpec::same("sku_id", Text),
    FieldSpec::same("shop_sku", Text),
    FieldSpec::same("product_id", Text),
    FieldSpec::same("name", Text),
    FieldSpec::same("variation", Text),
    FieldSpec::same("status", Text),
    FieldSpec::same("item_price", Float),
    FieldSpec::same("paid_price", Float),
    FieldSpec::same("shipping_amount", Float),
    FieldSpec::same("tax_amount", Float),
    FieldSpec::same("voucher_amount", Float),
    FieldSpec::same("voucher_platform", Float),
    FieldSpec::same("voucher_seller", Float),
    FieldSpec::same("currency", Text),
    FieldSpec::same("tracking_code", Text),
    FieldSpec::same("shipment_provider", Text),
    FieldSpec::same("shipping_type", Text),
    FieldSpec::same("warehouse_code", Text),
    FieldSpec::same("is_digital", Bool),
    FieldSpec::same("cancel_return_initiator", Text),
    FieldSpec::same("reason", Text),
    FieldSpec::same("product_main_image", Text),
    FieldSpec::same("created_at", IsoDateTime),
    FieldSpec::same("updated_at", IsoDateTime),
    FieldSpec::same("sla_time_stamp", IsoDateTime),
    FieldSpec::same("payment_time", IsoDateTime),
];

pub const PRODUCT_FIELDS: &FieldMap = &[
    FieldSpec::same("item_id", Text),
    FieldSpec::same("primary_category", Text),
    FieldSpec::same("status", Text),
    FieldSpec::new("attributes.name", "name", Text),
    FieldSpec::new("attributes.brand", "brand", Text),
    FieldSpec::new("attributes.model", "model", Text),
    FieldSpec::new("attributes.description", "description", Text),
    FieldSpec::new("attributes.video", "video", Text),
    FieldSpec::same("images", Coercion::JsonText),
    FieldSpec::same("created_time", Coercion::UnixMillis),
    FieldSpec::same("updated_time", Coercion::UnixMillis),
];

pub const PRODUCT_SKU_FIELDS: &FieldMap = &[
    FieldSpec::new("SkuId", "sku_id", Text),
    FieldSpec::new("SellerSku", "seller_sku", Text),
    FieldSpec::new("ShopSku", "shop_sku", Text),
    FieldSpec::new("Status", "status", Text),
    FieldSpec::same("price", Float),
    FieldSpec::same("special_price", Float),
    FieldSpec::same("quantity", Integer),
    FieldSpec::new("Available", "available", Integer),
    FieldSpec::same("barcode", Text),
    FieldSpec::new("Url", "url", Text),
    FieldSpec::same("package_weight", Float),
    FieldSpec::same("package_length", Float),
    FieldSpec::same("package_width", Float),
    FieldSpec::same("package_height", Float),
];

pub const WAREHOUSE_FIELDS: &FieldMap = &[
    FieldSpec::same("warehouse_code", Text),
    FieldSpec::same("warehouse_name", Text),
    FieldSpec::same("country_code", Text),
    FieldSpec::same("division_id", Text),
    FieldSpec::same("city_code", Text),
    FieldSpec::same("area_code", Text),
    FieldSpec::same("town_code", Text),
    FieldSpec::same("zip_code", Text),
    FieldSpec::same("platform_name", Text),
    FieldSpec::same("multi_channel", Bool),
    FieldSpec::same("latitude", Float),
    FieldSpec::same("longitude", Float),
];

/// Campaign list row (`searchCampaignList`) fields.
pub const CAMPAIGN_FIELDS: &FieldMap = &[
    FieldSpec::new("campaignId", "campaign_id", Text),
    FieldSpec::new("campaignName", "name", Text),
    FieldSpec::same("status", Text),
    FieldSpec::new("campaignDailyBudgetStatus", "campaign_daily_budget_status", Text),
    FieldSpec::new("campaignSwitchStatus", "campaign_switch_status", Text),
    FieldSpec::new("campaignScheduleStatus", "campaign_schedule_status", Text),
    FieldSpec::new("adAccountBalanceStatus", "ad_account_balance_status", Text),
    FieldSpec::new("haveActiveAdStatus", "have_active_ad_status", Text),
    FieldSpec::new("startDate", "start_date", Text),
    FieldSpec::new("endDate", "end_date", Text),
    FieldSpec::new("dailyBudget", "daily_budget", Text),
    FieldSpec::same("ctr", Text),
    FieldSpec::same("cpc", Text),
    FieldSpec::same("spend", Text),
    FieldSpec::same("clicks", Text),
    FieldSpec::same("impressions", Text),
    FieldSpec::new("storeRevenue", "store_revenue", Text),
    FieldSpec::new("storeOrders", "store_orders", Text),
    FieldSpec::new("storeUnitsSold", "store_units_sold", Text),
    FieldSpec::new("storeRoi", "store_roi", Text),
];

/// Campaign detail (`getCampaign`) fields, layered over the list row.
pub const CAMPAIGN_DETAIL_FIELDS: &FieldMap = &[
    FieldSpec::new("campaignName", "name", Text),
    FieldSpec::new("campaignObjective", "objective", Text),
    FieldSpec::new("campaignType", "type", Text),
    FieldSpec::new("campaignModel", "model_code", Text),
    FieldSpec::new("onlineStatus", "online_status", Text),
    FieldSpec::new("switchStatus", "switch_status", Text),
    FieldSpec::new("autoItemSelect", "auto_item_select", Text),
    FieldSpec::new("autoCreative", "auto_creative", Text),
    FieldSpec::same("platform", Coercion::JsonText),
    FieldSpec::new("budgetUsedAmount", "budget_used_amount", Text),
    FieldSpec::new("maxBid", "max_bid", Text),
    FieldSpec::new("haveAdCount", "have_ad_count", Text),
    FieldSpec::new("sceneId", "scene_id", Text),
    FieldSpec::new("dayBudget", "day_budget", Text),
    FieldSpec::new("startDate", "start_date", Text),
    FieldSpec::new("endDate", "end_date", Text),
];

/// Order plus the `order_items` fetched for it.
#[must_use]
pub fn normalize_order(order: &Value, items: &[Value]) -> Option<NormalizedRecord> {
    let id = str_field(order, "order_id")?;
    let updated_at = lookup(order, "updated_at")
        .and_then(Value::as_str)
        .and_then(parse_iso_datetime);
    let lines = items
        .iter()
        .map(|item| NormalizedLine {
            external_id: str_field(item, "order_item_id"),
            fields: map_fields(item, ORDER_ITEM_FIELDS),
            raw_payload: item.clone(),
        })
        .collect();

    let mut raw = order.clone();
    if let Value::Object(map) = &mut raw {
        map.insert("order_items".to_owned(), Value::Array(items.to_vec()));
    }

    Some(
        NormalizedRecord::new(id, map_fields(order, ORDER_FIELDS), raw)
            .with_updated_at(updated_at)
            .with_lines(lines),
    )
}

/// Product list row merged with its `/product/item/get` detail; SKUs become lines.
#[must_use]
pub fn normalize_product(row: &Value, detail: Option<&Value>) -> Option<NormalizedRecord> {
    let mut merged: Map<String, Value> = row.as_object().cloned().unwrap_or_default();
    if let Some(Value::Object(extra)) = detail {
        for (key, value) in extra {
            if key == "attributes" && merged.get("attributes").is_some_and(|a| !a.is_null()) {
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }
    }
    let merged = Value::Object(merged);

    let id = str_field(&merged, "item_id").or_else(|| str_field(&merged, "itemId"))?;
    let lines = array_field(&merged, "skus")
        .into_iter()
        .map(|sku| NormalizedLine {
            external_id: str_field(&sku, "SkuId").or_else(|| str_field(&sku, "SellerSku")),
            fields: map_fields(&sku, PRODUCT_SKU_FIELDS),
            raw_payload: sku,
        })
        .collect();
    let updated_at = lookup(&merged, "updated_time").and_then(unix_millis);

    Some(
        NormalizedRecord::new(id, map_fields(&merged, PRODUCT_FIELDS), merged)
            .with_updated_at(updated_at)
            .with_lines(lines),
    )
}

#[must_use]
pub fn normalize_warehouse(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "warehouse_code")?;
    let mut fields = map_fields(raw, WAREHOUSE_FIELDS);
    if !fields.contains_key("warehouse_name") {
        fields.insert("warehouse_name".to_owned(), Value::String(format!("Warehouse {id}")));
    }
    Some(NormalizedRecord::new(id, fields, raw.clone()))
}

/// Campaign list row with optional detail layered on top.
#[must_use]
pub fn normalize_campaign(row: &Value, detail: Option<&Value>) -> Option<NormalizedRecord> {
    let id = str_field(row, "campaignId")?;
    let mut fields = map_fields(row, CAMPAIGN_FIELDS);
    let mut raw = row.clone();
    if let Some(detail) = detail {
        for (key, value) in map_fields(detail, CAMPAIGN_DETAIL_FIELDS) {
            if !value.is_null() {
                fields.insert(key, value);
            }
        }
        if let Value::Object(map) = &mut raw {
            map.insert("detail".to_owned(), detail.clone());
        }
    }
    Some(NormalizedRecord::new(id, fields, raw))
}

/// `order_id`s of a page of order rows, in page order.
#[must_use]
pub fn order_ids(orders: &[Value]) -> Vec<String> {
    orders.iter().filter_map(|o| str_field(o, "order_id")).collect()
}
