//! TikTok Shop field tables and record normalisation.
//!
//! Timestamps are Unix seconds; money amounts arrive as decimal strings and
//! go through [`Coercion::Float`], so unparsable amounts store `0.0`.

use mktsync_core::mapping::{
    coerce, lookup, map_fields, unix_seconds, Coercion, FieldMap, FieldSpec,
};
use mktsync_core::{NormalizedLine, NormalizedRecord};
use serde_json::{Map, Value};

use super::client::ShopReport;
use crate::{array_field, str_field};

use Coercion::{Bool, Float, Integer, JsonText, Text, UnixSeconds};

pub const ORDER_FIELDS: &FieldMap = &[
    FieldSpec::same("id", Text),
    FieldSpec::new("status", "state", Text),
    FieldSpec::same("create_time", UnixSeconds),
    FieldSpec::same("update_time", UnixSeconds),
    FieldSpec::same("paid_time", UnixSeconds),
    FieldSpec::same("user_id", Text),
    FieldSpec::same("buyer_message", Text),
    FieldSpec::same("buyer_email", Text),
    FieldSpec::new("recipient_address.name", "recipient_name", Text),
    FieldSpec::new("recipient_address.first_name", "recipient_first_name", Text),
    FieldSpec::new("recipient_address.last_name", "recipient_last_name", Text),
    FieldSpec::new("recipient_address.phone_number", "recipient_phone", Text),
    FieldSpec::new("recipient_address.region_code", "recipient_region_code", Text),
    FieldSpec::new("recipient_address.postal_code", "recipient_postal_code", Text),
    FieldSpec::new("recipient_address.full_address", "recipient_full_address", Text),
    FieldSpec::new("recipient_address.address_line1", "recipient_address_line1", Text),
    FieldSpec::new("recipient_address.address_line2", "recipient_address_line2", Text),
    FieldSpec::new("recipient_address.district_info", "recipient_district_info", JsonText),
    FieldSpec::same("payment_method_name", Text),
    FieldSpec::same("is_cod", Bool),
    FieldSpec::new("payment.currency", "payment_currency", Text),
    FieldSpec::new("payment.sub_total", "payment_sub_total", Float),
    FieldSpec::new("payment.shipping_fee", "payment_shipping_fee", Float),
    FieldSpec::new("payment.seller_discount", "payment_seller_discount", Float),
    FieldSpec::new("payment.platform_discount", "payment_platform_discount", Float),
    FieldSpec::new("payment.total_amount", "payment_total_amount", Float),
    FieldSpec::new(
        "payment.original_total_product_price",
        "payment_original_total_product_price",
        Float,
    ),
    FieldSpec::new("payment.original_shipping_fee", "payment_original_shipping_fee", Float),
    FieldSpec::new(
        "payment.shipping_fee_seller_discount",
        "payment_shipping_fee_seller_discount",
        Float,
    ),
    FieldSpec::new(
        "payment.shipping_fee_platform_discount",
        "payment_shipping_fee_platform_discount",
        Float,
    ),
    FieldSpec::new("payment.tax", "payment_tax", Float),
    FieldSpec::new("payment.small_order_fee", "payment_small_order_fee", Float),
    FieldSpec::new("payment.buyer_service_fee", "payment_buyer_service_fee", Float),
    FieldSpec::new("payment.handling_fee", "payment_handling_fee", Float),
    FieldSpec::same("shipping_provider", Text),
    FieldSpec::same("shipping_provider_id", Text),
    FieldSpec::same("shipping_type", Text),
    FieldSpec::same("tracking_number", Text),
    FieldSpec::same("delivery_type", Text),
    FieldSpec::same("delivery_option_id", Text),
    FieldSpec::same("delivery_option_name", Text),
    FieldSpec::same("delivery_due_time", UnixSeconds),
    FieldSpec::same("delivery_time", UnixSeconds),
    FieldSpec::same("shipping_due_time", UnixSeconds),
    FieldSpec::same("rts_time", UnixSeconds),
    FieldSpec::same("rts_sla_time", UnixSeconds),
    FieldSpec::same("tts_sla_time", UnixSeconds),
    FieldSpec::same("collection_time", UnixSeconds),
    FieldSpec::same("fulfillment_type", Text),
    FieldSpec::same("warehouse_id", Text),
    FieldSpec::same("packages", JsonText),
    FieldSpec::same("is_sample_order", Bool),
    FieldSpec::same("split_or_combine_tag", Text),
    FieldSpec::same("cancellation_initiator", Text),
    FieldSpec::same("cancel_reason", Text),
    FieldSpec::same("cancel_time", UnixSeconds),
    FieldSpec::same("request_cancel_time", UnixSeconds),
    FieldSpec::same("is_buyer_request_cancel", Bool),
    FieldSpec::same("is_on_hold_order", Bool),
    FieldSpec::same("is_replacement_order", Bool),
    FieldSpec::same("replaced_order_id", Text),
    FieldSpec::same("is_exchange_order", Bool),
    FieldSpec::same("seller_note", Text),
    FieldSpec::same("order_type", Text),
    FieldSpec::same("commerce_platform", Text),
];

pub const ORDER_LINE_FIELDS: &FieldMap = &[
    FieldSpec::same("id", Text),
    FieldSpec::same("product_id", Text),
    FieldSpec::same("sku_id", Text),
    FieldSpec::same("seller_sku", Text),
    FieldSpec::same("product_name", Text),
    FieldSpec::same("sku_name", Text),
    FieldSpec::same("sku_image", Text),
    FieldSpec::same("sku_type", Text),
    FieldSpec::same("currency", Text),
    FieldSpec::same("original_price", Float),
    FieldSpec::same("sale_price", Float),
    FieldSpec::same("platform_discount", Float),
    FieldSpec::same("seller_discount", Float),
    FieldSpec::same("small_order_fee", Float),
    FieldSpec::same("retail_delivery_fee", Float),
    FieldSpec::same("buyer_service_fee", Float),
    FieldSpec::same("display_status", Text),
    FieldSpec::same("package_status", Text),
    FieldSpec::same("package_id", Text),
    FieldSpec::same("tracking_number", Text),
    FieldSpec::same("shipping_provider_id", Text),
    FieldSpec::same("shipping_provider_name", Text),
    FieldSpec::same("cancel_user", Text),
    FieldSpec::same("cancel_reason", Text),
    FieldSpec::same("is_gift", Bool),
    FieldSpec::same("is_dangerous_good", Bool),
    FieldSpec::same("rts_time", UnixSeconds),
    FieldSpec::same("delivery_time", UnixSeconds),
    FieldSpec::same("cancel_time", UnixSeconds),
];

pub const PRODUCT_FIELDS: &FieldMap = &[
    FieldSpec::same("id", Text),
    FieldSpec::same("title", Text),
    FieldSpec::same("status", Text),
    FieldSpec::same("description", Text),
    FieldSpec::new("brand.id", "brand_id", Text),
    FieldSpec::new("brand.name", "brand_name", Text),
    FieldSpec::same("category_chains", JsonText),
    FieldSpec::same("main_images", JsonText),
    FieldSpec::same("product_attributes", JsonText),
    FieldSpec::new("package_weight.value", "package_weight", Float),
    FieldSpec::new("package_weight.unit", "package_weight_unit", Text),
    FieldSpec::same("is_cod_allowed", Bool),
    FieldSpec::same("is_not_for_sale", Bool),
    FieldSpec::same("is_pre_owned", Bool),
    FieldSpec::same("has_draft", Bool),
    FieldSpec::same("listing_quality_tier", Text),
    FieldSpec::same("external_product_id", Text),
    FieldSpec::same("minimum_order_quantity", Integer),
    FieldSpec::same("create_time", UnixSeconds),
    FieldSpec::same("update_time", UnixSeconds),
];

pub const SKU_FIELDS: &FieldMap = &[
    FieldSpec::same("id", Text),
    FieldSpec::same("seller_sku", Text),
    FieldSpec::new("price.currency", "currency", Text),
    FieldSpec::new("price.sale_price", "sale_price", Float),
    FieldSpec::new("price.tax_exclusive_price", "tax_exclusive_price", Float),
    FieldSpec::new("status_info.status", "status", Text),
    FieldSpec::new("global_listing_policy.inventory_type", "inventory_type", Text),
    FieldSpec::new("global_listing_policy.price_sync", "price_sync", Bool),
    FieldSpec::same("inventory", JsonText),
    FieldSpec::same("sales_attributes", JsonText),
];

pub const WAREHOUSE_FIELDS: &FieldMap = &[
    FieldSpec::same("id", Text),
    FieldSpec::same("entity_id", Text),
    FieldSpec::same("name", Text),
    FieldSpec::same("effect_status", Text),
    FieldSpec::same("type", Text),
    FieldSpec::same("sub_type", Text),
    FieldSpec::same("is_default", Bool),
    FieldSpec::new("address.region", "region", Text),
    FieldSpec::new("address.region_code", "region_code", Text),
    FieldSpec::new("address.state", "state", Text),
    FieldSpec::new("address.city", "city", Text),
    FieldSpec::new("address.district", "district", Text),
    FieldSpec::new("address.town", "town", Text),
    FieldSpec::new("address.contact_person", "contact_person", Text),
    FieldSpec::new("address.phone_number", "phone_number", Text),
    FieldSpec::new("address.postal_code", "postal_code", Text),
    FieldSpec::new("address.full_address", "full_address", Text),
    FieldSpec::new("geolocation.latitude", "latitude", Float),
    FieldSpec::new("geolocation.longitude", "longitude", Float),
];

pub const RETURN_FIELDS: &FieldMap = &[
    FieldSpec::same("return_id", Text),
    FieldSpec::new("order_id", "tiktok_order_id", Text),
    FieldSpec::same("return_type", Text),
    FieldSpec::same("return_status", Text),
    FieldSpec::same("arbitration_status", Text),
    FieldSpec::same("role", Text),
    FieldSpec::same("return_reason", Text),
    FieldSpec::same("return_reason_text", Text),
    FieldSpec::same("shipment_type", Text),
    FieldSpec::same("handover_method", Text),
    FieldSpec::same("return_tracking_number", Text),
    FieldSpec::same("return_provider_name", Text),
    FieldSpec::same("return_provider_id", Text),
    FieldSpec::same("return_shipping_document_type", Text),
    FieldSpec::same("return_method", Text),
    FieldSpec::same("create_time", UnixSeconds),
    FieldSpec::same("update_time", UnixSeconds),
    FieldSpec::new("seller_next_action_response.0.action", "seller_next_action", Text),
    FieldSpec::new(
        "seller_next_action_response.0.deadline",
        "seller_action_deadline",
        UnixSeconds,
    ),
    FieldSpec::same("can_buyer_keep_item", Bool),
    FieldSpec::same("is_combined_return", Bool),
    FieldSpec::same("combined_return_id", Text),
    FieldSpec::same("seller_proposed_return_type", Text),
    FieldSpec::new("partial_refund.currency", "partial_refund_currency", Text),
    FieldSpec::new("partial_refund.amount", "partial_refund_amount", Float),
    FieldSpec::same("buyer_rejected_partial_refund", Bool),
    FieldSpec::new(
        "return_warehouse_address.full_address",
        "return_warehouse_address",
        Text,
    ),
    FieldSpec::new("refund_amount.currency", "refund_currency", Text),
    FieldSpec::new("refund_amount.refund_total", "refund_total", Float),
    FieldSpec::new("refund_amount.refund_subtotal", "refund_subtotal", Float),
    FieldSpec::new("refund_amount.refund_shipping_fee", "refund_shipping_fee", Float),
    FieldSpec::new("refund_amount.refund_tax", "refund_tax", Float),
    FieldSpec::new("refund_amount.retail_delivery_fee", "retail_delivery_fee", Float),
    FieldSpec::new("refund_amount.buyer_service_fee", "buyer_service_fee", Float),
];

pub const RETURN_LINE_FIELDS: &FieldMap = &[
    FieldSpec::same("return_line_item_id", Text),
    FieldSpec::same("order_line_item_id", Text),
    FieldSpec::same("sku_id", Text),
    FieldSpec::same("seller_sku", Text),
    FieldSpec::same("product_name", Text),
    FieldSpec::same("sku_name", Text),
    FieldSpec::new("product_image.uri", "product_image_uri", Text),
    FieldSpec::new("product_image.width", "product_image_width", Integer),
    FieldSpec::new("product_image.height", "product_image_height", Integer),
    FieldSpec::new("refund_amount.currency", "refund_currency", Text),
    FieldSpec::new("refund_amount.refund_total", "refund_total", Float),
    FieldSpec::new("refund_amount.refund_subtotal", "refund_subtotal", Float),
    FieldSpec::new("refund_amount.refund_shipping_fee", "refund_shipping_fee", Float),
    FieldSpec::new("refund_amount.refund_tax", "refund_tax", Float),
    FieldSpec::new("refund_amount.retail_delivery_fee", "retail_delivery_fee", Float),
    FieldSpec::new("refund_amount.buyer_service_fee", "buyer_service_fee", Float),
    FieldSpec::new("discount_amount.0.currency", "discount_currency", Text),
    FieldSpec::new(
        "discount_amount.0.product_seller_discount",
        "product_seller_discount",
        Float,
    ),
    FieldSpec::new(
        "discount_amount.0.product_platform_discount",
        "product_platform_discount",
        Float,
    ),
    FieldSpec::new(
        "discount_amount.0.shipping_fee_seller_discount",
        "shipping_fee_seller_discount",
        Float,
    ),
    FieldSpec::new(
        "discount_amount.0.shipping_fee_platform_discount",
        "shipping_fee_platform_discount",
        Float,
    ),
    FieldSpec::new("shipping_fee_amount.0.currency", "shipping_fee_currency", Text),
    FieldSpec::new(
        "shipping_fee_amount.0.seller_paid_return_shipping_fee",
        "seller_paid_return_shipping_fee",
        Float,
    ),
    FieldSpec::new(
        "shipping_fee_amount.0.platform_paid_return_shipping_fee",
        "platform_paid_return_shipping_fee",
        Float,
    ),
    FieldSpec::new(
        "shipping_fee_amount.0.buyer_paid_return_shipping_fee",
        "buyer_paid_return_shipping_fee",
        Float,
    ),
];

pub const CANCELLATION_FIELDS: &FieldMap = &[
    FieldSpec::same("cancel_id", Text),
    FieldSpec::new("order_id", "tiktok_order_id", Text),
    FieldSpec::same("cancel_type", Text),
    FieldSpec::same("cancel_status", Text),
    FieldSpec::same("role", Text),
    FieldSpec::same("cancel_reason", Text),
    FieldSpec::same("cancel_reason_text", Text),
    FieldSpec::same("create_time", UnixSeconds),
    FieldSpec::same("update_time", UnixSeconds),
    FieldSpec::new("seller_next_action_response.0.action", "seller_next_action", Text),
    FieldSpec::new(
        "seller_next_action_response.0.deadline",
        "seller_action_deadline",
        UnixSeconds,
    ),
    FieldSpec::new("refund_amount.currency", "refund_currency", Text),
    FieldSpec::new("refund_amount.refund_total", "refund_total", Float),
    FieldSpec::new("refund_amount.refund_subtotal", "refund_subtotal", Float),
    FieldSpec::new("refund_amount.refund_shipping_fee", "refund_shipping_fee", Float),
    FieldSpec::new("refund_amount.refund_tax", "refund_tax", Float),
    FieldSpec::new("refund_amount.retail_delivery_fee", "retail_delivery_fee", Float),
    FieldSpec::new("refund_amount.buyer_service_fee", "buyer_service_fee", Float),
];

pub const CANCELLATION_LINE_FIELDS: &FieldMap = &[
    FieldSpec::same("cancel_line_item_id", Text),
    FieldSpec::same("order_line_item_id", Text),
    FieldSpec::same("sku_id", Text),
    FieldSpec::same("seller_sku", Text),
    FieldSpec::same("product_name", Text),
    FieldSpec::same("sku_name", Text),
    FieldSpec::new("product_image.url", "product_image_uri", Text),
    FieldSpec::new("product_image.width", "product_image_width", Integer),
    FieldSpec::new("product_image.height", "product_image_height", Integer),
    FieldSpec::new("refund_amount.currency", "refund_currency", Text),
    FieldSpec::new("refund_amount.refund_total", "refund_total", Float),
    FieldSpec::new("refund_amount.refund_subtotal", "refund_subtotal", Float),
    FieldSpec::new("refund_amount.refund_shipping_fee", "refund_shipping_fee", Float),
    FieldSpec::new("refund_amount.refund_tax", "refund_tax", Float),
    FieldSpec::new("refund_amount.retail_delivery_fee", "retail_delivery_fee", Float),
    FieldSpec::new("refund_amount.buyer_service_fee", "buyer_service_fee", Float),
];

pub const LIVE_SESSION_FIELDS: &FieldMap = &[
    FieldSpec::new("id", "live_id", Text),
    FieldSpec::same("title", Text),
    FieldSpec::same("username", Text),
    FieldSpec::same("start_time", UnixSeconds),
    FieldSpec::same("end_time", UnixSeconds),
    FieldSpec::new("sales_performance.gmv.amount", "gmv_amount", Float),
    FieldSpec::new("sales_performance.gmv.currency", "gmv_currency", Text),
    FieldSpec::new("sales_performance.products_added", "products_added", Integer),
    FieldSpec::new(
        "sales_performance.different_products_sold",
        "different_products_sold",
        Integer,
    ),
    FieldSpec::new("sales_performance.created_sku_orders", "created_sku_orders", Integer),
    FieldSpec::new("sales_performance.sku_orders", "sku_orders", Integer),
    FieldSpec::new("sales_performance.unit_sold", "unit_sold", Integer),
    FieldSpec::new("sales_performance.customers", "customers", Integer),
    FieldSpec::new("sales_performance.avg_price.amount", "avg_price_amount", Float),
    FieldSpec::new("sales_performance.avg_price.currency", "avg_price_currency", Text),
    FieldSpec::new("sales_performance.click_to_order_rate", "click_to_order_rate", Float),
    FieldSpec::new("sales_performance.24h_live_gmv.amount", "live_gmv_24h_amount", Float),
    FieldSpec::new("sales_performance.24h_live_gmv.currency", "live_gmv_24h_currency", Text),
    FieldSpec::new("interaction_performance.acu", "acu", Integer),
    FieldSpec::new("interaction_performance.pcu", "pcu", Integer),
    FieldSpec::new("interaction_performance.viewers", "viewers", Integer),
    FieldSpec::new("interaction_performance.views", "views", Integer),
    FieldSpec::new(
        "interaction_performance.avg_viewing_duration",
        "avg_viewing_duration",
        Float,
    ),
    FieldSpec::new("interaction_performance.comments", "comments", Integer),
    FieldSpec::new("interaction_performance.shares", "shares", Integer),
    FieldSpec::new("interaction_performance.likes", "likes", Integer),
    FieldSpec::new("interaction_performance.new_followers", "new_followers", Integer),
    FieldSpec::new(
        "interaction_performance.product_impressions",
        "product_impressions",
        Integer,
    ),
    FieldSpec::new("interaction_performance.product_clicks", "product_clicks", Integer),
    FieldSpec::new(
        "interaction_performance.click_through_rate",
        "click_through_rate",
        Float,
    ),
];

pub const PRODUCT_PERFORMANCE_FIELDS: &FieldMap = &[
    FieldSpec::same("start_date", Text),
    FieldSpec::same("end_date", Text),
    FieldSpec::new("gmv.amount", "gmv_amount", Float),
    FieldSpec::new("gmv.currency", "gmv_currency", Text),
    FieldSpec::new("orders", "orders_count", Integer),
    FieldSpec::same("units_sold", Integer),
    FieldSpec::same("click_through_rate", Float),
    FieldSpec::new("impressions", "total_impressions", Integer),
    FieldSpec::new("page_views", "total_page_views", Integer),
    FieldSpec::same("avg_page_visitors", Integer),
];

pub const SKU_PERFORMANCE_FIELDS: &FieldMap = &[
    FieldSpec::same("start_date", Text),
    FieldSpec::same("end_date", Text),
    FieldSpec::new("gmv.amount", "gmv_amount", Float),
    FieldSpec::new("gmv.currency", "gmv_currency", Text),
    FieldSpec::same("units_sold", Integer),
    FieldSpec::same("sku_orders", Integer),
];

pub const VIDEO_PERFORMANCE_FIELDS: &FieldMap = &[
    FieldSpec::same("start_date", Text),
    FieldSpec::same("end_date", Text),
    FieldSpec::new("gmv.amount", "gmv_amount", Float),
    FieldSpec::new("gmv.currency", "gmv_currency", Text),
    FieldSpec::same("click_through_rate", Float),
    FieldSpec::same("daily_avg_buyers", Float),
    FieldSpec::same("views", Integer),
];

static NULL: Value = Value::Null;

/// Traffic sources a report splits its totals across.
const BREAKDOWN_TYPES: [&str; 3] = ["live", "video", "product_card"];

/// `(vendor key, local suffix)` of the product and video breakdown arrays;
/// a `LIVE` entry of `gmv_breakdowns` lands in `live_gmv`.
const TRAFFIC_BREAKDOWNS: [(&str, &str); 5] = [
    ("gmv_breakdowns", "gmv"),
    ("unit_sold_breakdowns", "units_sold"),
    ("impression_breakdowns", "impressions"),
    ("page_view_breakdowns", "page_views"),
    ("click_through_rate_breakdowns", "click_through_rate"),
];

fn updated_at(raw: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    lookup(raw, "update_time").and_then(unix_seconds)
}

fn lines(raw: &Value, key: &str, id_key: &str, map: &FieldMap) -> Vec<NormalizedLine> {
    array_field(raw, key)
        .into_iter()
        .map(|item| NormalizedLine {
            external_id: str_field(&item, id_key),
            fields: map_fields(&item, map),
            raw_payload: item,
        })
        .collect()
}

/// Order detail with its `line_items`.
#[must_use]
pub fn normalize_order(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "id")?;
    Some(
        NormalizedRecord::new(id, map_fields(raw, ORDER_FIELDS), raw.clone())
            .with_updated_at(updated_at(raw))
            .with_lines(lines(raw, "line_items", "id", ORDER_LINE_FIELDS)),
    )
}

/// Full product document; each SKU becomes a line.
#[must_use]
pub fn normalize_product(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "id")?;
    Some(
        NormalizedRecord::new(id, map_fields(raw, PRODUCT_FIELDS), raw.clone())
            .with_updated_at(updated_at(raw))
            .with_lines(lines(raw, "skus", "id", SKU_FIELDS)),
    )
}

#[must_use]
pub fn normalize_warehouse(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "id")?;
    Some(NormalizedRecord::new(id, map_fields(raw, WAREHOUSE_FIELDS), raw.clone()))
}

/// Return request with its `return_line_items`.
#[must_use]
pub fn normalize_return(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "return_id")?;
    Some(
        NormalizedRecord::new(id, map_fields(raw, RETURN_FIELDS), raw.clone())
            .with_updated_at(updated_at(raw))
            .with_lines(lines(
                raw,
                "return_line_items",
                "return_line_item_id",
                RETURN_LINE_FIELDS,
            )),
    )
}

/// Cancellation request with its `cancel_line_items`.
#[must_use]
pub fn normalize_cancellation(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "cancel_id")?;
    Some(
        NormalizedRecord::new(id, map_fields(raw, CANCELLATION_FIELDS), raw.clone())
            .with_updated_at(updated_at(raw))
            .with_lines(lines(
                raw,
                "cancel_line_items",
                "cancel_line_item_id",
                CANCELLATION_LINE_FIELDS,
            )),
    )
}

/// One LIVE session with its totals, keyed by the session id.
#[must_use]
pub fn normalize_live_session(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "id")?;
    let mut fields = map_fields(raw, LIVE_SESSION_FIELDS);
    let start = lookup(raw, "start_time").and_then(unix_seconds);
    let end = lookup(raw, "end_time").and_then(unix_seconds);
    if let (Some(start), Some(end)) = (start, end) {
        #[allow(clippy::cast_precision_loss)]
        let minutes = (end - start).num_seconds() as f64 / 60.0;
        fields.insert("duration_minutes".to_owned(), Value::from(minutes));
    }
    Some(NormalizedRecord::new(id, fields, raw.clone()))
}

/// The daily rows of a report detail response.
#[must_use]
pub fn report_intervals(detail: &Value) -> Vec<Value> {
    lookup(detail, "performance")
        .map(|performance| array_field(performance, "intervals"))
        .unwrap_or_default()
}

/// One day of a product, SKU or video report, keyed `<subject>:<start_date>`.
///
/// Breakdown amounts are spread into one field per traffic source; amounts
/// that do not parse store `0.0`.
#[must_use]
pub fn normalize_report_interval(
    report: ShopReport,
    subject_id: &str,
    detail: &Value,
    interval: &Value,
) -> Option<NormalizedRecord> {
    let day = str_field(interval, "start_date")?;
    let performance = lookup(detail, "performance").unwrap_or(&NULL);

    let (subject_key, map) = match report {
        ShopReport::Product => ("tiktok_product_id", PRODUCT_PERFORMANCE_FIELDS),
        ShopReport::Sku => ("tiktok_sku_id", SKU_PERFORMANCE_FIELDS),
        ShopReport::Video => ("video_id", VIDEO_PERFORMANCE_FIELDS),
    };
    let mut fields = map_fields(interval, map);
    fields.insert(subject_key.to_owned(), Value::from(subject_id));
    fields.insert("report_date".to_owned(), Value::from(day.as_str()));

    match report {
        ShopReport::Product | ShopReport::Video => {
            for (key, suffix) in TRAFFIC_BREAKDOWNS {
                spread_breakdowns(interval, key, &mut fields, |source| {
                    format!("{source}_{suffix}")
                });
            }
        }
        ShopReport::Sku => {
            spread_breakdowns(interval, "gmv_breakdown", &mut fields, |source| {
                format!("gmv_{source}")
            });
            spread_breakdowns(interval, "units_sold_breakdown", &mut fields, |source| {
                format!("units_sold_{source}")
            });
            if let Some(product_id) = str_field(performance, "product_id") {
                fields.insert("tiktok_product_id".to_owned(), Value::from(product_id));
            }
        }
    }
    if report == ShopReport::Video {
        for (vendor_key, coercion) in [
            ("video_post_time", UnixSeconds),
            ("engagement_data", JsonText),
        ] {
            if let Some(value) = lookup(performance, vendor_key) {
                fields.insert(vendor_key.to_owned(), coerce(value, coercion));
            }
        }
    }

    Some(NormalizedRecord::new(
        format!("{subject_id}:{day}"),
        fields,
        interval.clone(),
    ))
}

/// Copies `[{ type, amount }]` entries under `key` into `name(type)` fields
/// for the known traffic sources.
fn spread_breakdowns<F>(interval: &Value, key: &str, fields: &mut Map<String, Value>, name: F)
where
    F: Fn(&str) -> String,
{
    for entry in array_field(interval, key) {
        let Some(source) = str_field(&entry, "type").map(|t| t.to_ascii_lowercase()) else {
            continue;
        };
        if !BREAKDOWN_TYPES.contains(&source.as_str()) {
            continue;
        }
        let amount = entry.get("amount").unwrap_or(&NULL);
        fields.insert(name(&source), coerce(amount, Float));
    }
}
