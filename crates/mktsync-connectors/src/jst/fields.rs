//! JST field tables and record normalisation.
//!
//! JST timestamps are Unix seconds. `modified` is stored as `jst_modified`
//! so it never collides with local bookkeeping columns.

use mktsync_core::mapping::{lookup, map_fields, unix_seconds, Coercion, FieldMap, FieldSpec};
use mktsync_core::{NormalizedLine, NormalizedRecord};
use serde_json::{Map, Value};

use crate::{array_field, str_field};

use Coercion::{Bool, Float, Passthrough, Text, UnixSeconds};

pub const ORDER_FIELDS: &FieldMap = &[
    FieldSpec::same("orderId", Text),
    FieldSpec::same("platformOrderId", Text),
    FieldSpec::same("mergePlatformOrderId", Text),
    FieldSpec::same("trackingNumber", Text),
    FieldSpec::same("status", Text),
    FieldSpec::same("statusDisplay", Text),
    FieldSpec::same("platformStatus", Text),
    FieldSpec::same("orderType", Passthrough),
    FieldSpec::same("orderTypeDisplay", Text),
    FieldSpec::same("orderFrom", Text),
    FieldSpec::same("platformId", Passthrough),
    FieldSpec::same("platformBuyerId", Text),
    FieldSpec::same("platformBuyerNickName", Text),
    FieldSpec::same("buyerId", Text),
    FieldSpec::same("buyerMessage", Text),
    FieldSpec::same("shopId", Passthrough),
    FieldSpec::same("shopName", Text),
    FieldSpec::same("warehouseId", Passthrough),
    FieldSpec::same("wmsCoId", Passthrough),
    FieldSpec::same("companyId", Passthrough),
    FieldSpec::same("currency", Text),
    FieldSpec::same("amount", Float),
    FieldSpec::same("paidAmount", Float),
    FieldSpec::same("payAmount", Float),
    FieldSpec::same("freightFee", Float),
    FieldSpec::same("freightIncome", Float),
    FieldSpec::same("discountRate", Float),
    FieldSpec::same("drpAmount", Float),
    FieldSpec::same("ortherAmount", Float),
    FieldSpec::same("platformFreeAmount", Float),
    FieldSpec::same("shopFreeAmount", Float),
    FieldSpec::same("weight", Float),
    FieldSpec::same("calcWeight", Float),
    FieldSpec::same("isCod", Bool),
    FieldSpec::same("isPaid", Bool),
    FieldSpec::same("isSplit", Bool),
    FieldSpec::same("isMerge", Bool),
    FieldSpec::same("isPresend", Bool),
    FieldSpec::same("isQuestion", Bool),
    FieldSpec::same("isRejectOrder", Bool),
    FieldSpec::same("questionType", Text),
    FieldSpec::same("questionDesc", Text),
    FieldSpec::same("cancelType", Text),
    FieldSpec::same("cancelDesc", Text),
    FieldSpec::same("deliveryWay", Text),
    FieldSpec::same("logisticsId", Passthrough),
    FieldSpec::same("logisticsCompanyName", Text),
    FieldSpec::same("logisticsCompanyCode", Text),
    FieldSpec::same("logisticsBillType", Text),
    FieldSpec::same("receiverFirstName", Text),
    FieldSpec::same("receiverLastName", Text),
    FieldSpec::same("receiverCountry", Text),
    FieldSpec::same("receiverProvince", Text),
    FieldSpec::same("receiverCity", Text),
    FieldSpec::same("receiverDistrict", Text),
    FieldSpec::same("receiverAddress", Text),
    FieldSpec::same("receiverZip", Text),
    FieldSpec::same("salesman", Text),
    FieldSpec::same("offlineNote", Text),
    FieldSpec::same("settlementMethod", Text),
    FieldSpec::same("payment", Text),
    FieldSpec::same("countryId", Passthrough),
    FieldSpec::same("splitBeforeOrderId", Text),
    FieldSpec::same("afterSaleId", Text),
    FieldSpec::same("skuIdStr", Text),
    FieldSpec::same("pdfFileUrl", Text),
    FieldSpec::same("creator", Text),
    FieldSpec::same("modifier", Text),
    FieldSpec::same("labelStr", Coercion::ListToDelimited(", ")),
    FieldSpec::same("orderTime", UnixSeconds),
    FieldSpec::same("sendTime", UnixSeconds),
    FieldSpec::same("payTime", UnixSeconds),
    FieldSpec::same("finalPayTime", UnixSeconds),
    FieldSpec::same("presendSendTime", UnixSeconds),
    FieldSpec::same("signTime", UnixSeconds),
    FieldSpec::same("endDeliveryTime", UnixSeconds),
    FieldSpec::same("endPickupTime", UnixSeconds),
    FieldSpec::same("created", UnixSeconds),
    FieldSpec::new("modified", "jst_modified", UnixSeconds),
];

pub const ORDER_LINE_FIELDS: &FieldMap = &[
    FieldSpec::same("orderItemId", Text),
    FieldSpec::same("orderId", Text),
    FieldSpec::same("itemId", Text),
    FieldSpec::same("skuId", Text),
    FieldSpec::same("platformSkuId", Text),
    FieldSpec::same("platformOrderItemId", Text),
    FieldSpec::same("skuType", Text),
    FieldSpec::same("name", Text),
    FieldSpec::same("pic", Text),
    FieldSpec::same("propertiesValue", Text),
    FieldSpec::same("qty", Float),
    FieldSpec::same("price", Float),
    FieldSpec::same("basePrice", Float),
    FieldSpec::same("amount", Float),
    FieldSpec::same("paidAmount", Float),
    FieldSpec::same("platformFreeAmount", Float),
    FieldSpec::same("shopFreeAmount", Float),
    FieldSpec::same("weight", Float),
    FieldSpec::same("totalWeight", Float),
    FieldSpec::same("isGift", Bool),
    FieldSpec::same("isPresale", Bool),
    FieldSpec::same("isDeleted", Bool),
    FieldSpec::same("isCombined", Bool),
    FieldSpec::same("itemStatus", Text),
    FieldSpec::same("refundId", Text),
    FieldSpec::same("refundStatus", Text),
    FieldSpec::same("refundQty", Float),
    FieldSpec::same("itemLogisticsCompany", Text),
    FieldSpec::same("remark", Text),
    FieldSpec::same("created", UnixSeconds),
    FieldSpec::same("itemSendDate", UnixSeconds),
];

pub const SHOP_FIELDS: &FieldMap = &[
    FieldSpec::same("shopId", Text),
    FieldSpec::same("shopName", Text),
    FieldSpec::same("companyId", Passthrough),
    FieldSpec::same("companyName", Text),
    FieldSpec::same("platformId", Passthrough),
    FieldSpec::same("platformShopId", Text),
    FieldSpec::same("platformShopNick", Text),
    FieldSpec::same("platformVersionName", Text),
    FieldSpec::same("shopUrl", Text),
    FieldSpec::same("sessionStatus", Text),
    FieldSpec::same("enabled", Bool),
    FieldSpec::same("creator", Text),
    FieldSpec::same("creatorName", Text),
    FieldSpec::same("modifier", Text),
    FieldSpec::same("modifierName", Text),
    FieldSpec::same("remark", Text),
    FieldSpec::same("mobile", Text),
    FieldSpec::same("address", Text),
    FieldSpec::same("logisticProvider", Text),
    FieldSpec::same("platformShopData", Coercion::JsonText),
    FieldSpec::same("defaultCurrencyId", Text),
    FieldSpec::same("timeZone", Text),
    FieldSpec::same("isMainShop", Bool),
    FieldSpec::same("mainShopId", Text),
    FieldSpec::same("created", UnixSeconds),
    FieldSpec::new("modified", "jst_modified", UnixSeconds),
];

pub const WAREHOUSE_FIELDS: &FieldMap = &[
    FieldSpec::same("warehouseId", Text),
    FieldSpec::same("warehouseName", Text),
    FieldSpec::same("warehouseShortName", Text),
    FieldSpec::same("warehouseType", Text),
    FieldSpec::same("warehouseServerCode", Text),
    FieldSpec::same("companyId", Passthrough),
    FieldSpec::same("country", Text),
    FieldSpec::same("province", Text),
    FieldSpec::same("city", Text),
    FieldSpec::same("district", Text),
    FieldSpec::same("address", Text),
    FieldSpec::same("contactName", Text),
    FieldSpec::same("mobile", Text),
    FieldSpec::same("created", UnixSeconds),
    FieldSpec::new("modified", "jst_modified", UnixSeconds),
];

pub const INOUT_FIELDS: &FieldMap = &[
    FieldSpec::same("inoutId", Text),
    FieldSpec::same("orderId", Text),
    FieldSpec::same("platformOrderId", Text),
    FieldSpec::same("status", Text),
    FieldSpec::same("statusDisplay", Text),
    FieldSpec::same("type", Text),
    FieldSpec::same("typeDisplay", Text),
    FieldSpec::same("outType", Text),
    FieldSpec::same("linkCoId", Passthrough),
    FieldSpec::same("linkCompanyName", Text),
    FieldSpec::same("companyId", Passthrough),
    FieldSpec::same("shopId", Passthrough),
    FieldSpec::same("warehouseId", Passthrough),
    FieldSpec::same("warehouseName", Text),
    FieldSpec::same("supplierCode", Text),
    FieldSpec::same("supplierName", Text),
    FieldSpec::same("areaType", Text),
    FieldSpec::same("areaTypeDisplay", Text),
    FieldSpec::same("currency", Text),
    FieldSpec::same("logisticsId", Passthrough),
    FieldSpec::same("logisticsCompany", Text),
    FieldSpec::same("logisticsCompanyCode", Text),
    FieldSpec::same("qty", Float),
    FieldSpec::same("realQty", Float),
    FieldSpec::same("totalQty", Float),
    FieldSpec::same("skuQty", Float),
    FieldSpec::same("freight", Float),
    FieldSpec::same("factFreight", Float),
    FieldSpec::same("totalAmount", Float),
    FieldSpec::same("paidAmount", Float),
    FieldSpec::same("totalCostAmount", Float),
    FieldSpec::same("realTotalCostAmount", Float),
    FieldSpec::same("platformName", Text),
    FieldSpec::same("receiverName", Text),
    FieldSpec::same("receiverCountry", Text),
    FieldSpec::same("receiverProvince", Text),
    FieldSpec::same("receiverCity", Text),
    FieldSpec::same("receiverDistrict", Text),
    FieldSpec::same("receiverAddress", Text),
    FieldSpec::same("receiverPhone", Text),
    FieldSpec::same("receiverMobile", Text),
    FieldSpec::same("remark", Text),
    FieldSpec::same("creator", Text),
    FieldSpec::same("creatorName", Text),
    FieldSpec::same("modifier", Text),
    FieldSpec::same("modifierName", Text),
    FieldSpec::same("inoutTime", UnixSeconds),
    FieldSpec::same("orderDate", UnixSeconds),
    FieldSpec::same("sendTime", UnixSeconds),
    FieldSpec::same("created", UnixSeconds),
    FieldSpec::new("modified", "jst_modified", UnixSeconds),
];

pub const INOUT_ITEM_FIELDS: &FieldMap = &[
    FieldSpec::same("inoutItemId", Text),
    FieldSpec::same("inoutId", Text),
    FieldSpec::same("subOrderId", Text),
    FieldSpec::same("rawPlatformOrderId", Text),
    FieldSpec::same("itemId", Text),
    FieldSpec::same("skuId", Text),
    FieldSpec::same("skuName", Text),
    FieldSpec::same("skuBatchId", Text),
    FieldSpec::same("packId", Text),
    FieldSpec::same("pic", Text),
    FieldSpec::same("propertiesValue", Text),
    FieldSpec::same("unit", Text),
    FieldSpec::same("bin", Text),
    FieldSpec::same("binType", Text),
    FieldSpec::same("areaType", Text),
    FieldSpec::same("qty", Float),
    FieldSpec::same("realQty", Float),
    FieldSpec::same("cost", Float),
    FieldSpec::same("costAmount", Float),
    FieldSpec::same("salePrice", Float),
    FieldSpec::same("saleBasePrice", Float),
    FieldSpec::same("saleAmount", Float),
    FieldSpec::same("payAmount", Float),
    FieldSpec::same("isGift", Bool),
    FieldSpec::same("isVerifyShelfLife", Bool),
    FieldSpec::same("shelfLife", Passthrough),
    FieldSpec::same("remark", Text),
    FieldSpec::same("producedDate", UnixSeconds),
];

/// Keys present on the inout list rows but missing from inout details.
pub const INOUT_LIST_ONLY_KEYS: [&str; 12] = [
    "factFreight",
    "modifier",
    "outType",
    "totalQty",
    "modified",
    "receiverCountry",
    "receiverCity",
    "receiverDistrict",
    "receiverAddress",
    "receiverPhone",
    "receiverMobile",
    "modifierName",
];

fn modified_at(raw: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    lookup(raw, "modified").and_then(unix_seconds)
}

fn lines(raw: &Value, key: &str, map: &FieldMap, id_key: &str) -> Vec<NormalizedLine> {
    array_field(raw, key)
        .into_iter()
        .map(|item| NormalizedLine {
            external_id: str_field(&item, id_key),
            fields: map_fields(&item, map),
            raw_payload: item,
        })
        .collect()
}

/// Order detail (from `GetOrderDetailByIds`) to a record with its `orderItems`.
#[must_use]
pub fn normalize_order(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "orderId")?;
    Some(
        NormalizedRecord::new(id, map_fields(raw, ORDER_FIELDS), raw.clone())
            .with_updated_at(modified_at(raw))
            .with_lines(lines(raw, "orderItems", ORDER_LINE_FIELDS, "orderItemId")),
    )
}

#[must_use]
pub fn normalize_shop(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "shopId")?;
    Some(
        NormalizedRecord::new(id, map_fields(raw, SHOP_FIELDS), raw.clone())
            .with_updated_at(modified_at(raw)),
    )
}

#[must_use]
pub fn normalize_warehouse(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "warehouseId")?;
    Some(
        NormalizedRecord::new(id, map_fields(raw, WAREHOUSE_FIELDS), raw.clone())
            .with_updated_at(modified_at(raw)),
    )
}

/// Inout detail (from `GetInoutItems`) merged with the matching list row.
///
/// Detail values win; [`INOUT_LIST_ONLY_KEYS`] are copied from `list_row`
/// when the detail lacks them.
#[must_use]
pub fn normalize_inout(detail: &Value, list_row: Option<&Value>) -> Option<NormalizedRecord> {
    let id = str_field(detail, "inoutId")?;

    let mut merged: Map<String, Value> = detail.as_object().cloned().unwrap_or_default();
    if let Some(row) = list_row {
        for key in INOUT_LIST_ONLY_KEYS {
            if merged.get(key).is_none_or(Value::is_null) {
                if let Some(value) = row.get(key) {
                    merged.insert(key.to_owned(), value.clone());
                }
            }
        }
    }
    let merged = Value::Object(merged);

    Some(
        NormalizedRecord::new(id, map_fields(&merged, INOUT_FIELDS), merged.clone())
            .with_updated_at(modified_at(&merged))
            .with_lines(lines(&merged, "itemDetails", INOUT_ITEM_FIELDS, "inoutItemId")),
    )
}
