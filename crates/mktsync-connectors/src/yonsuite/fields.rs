//! YonSuite field tables and record normalisation.
//!
//! YonSuite timestamps are naive local text (`2025-09-18 16:21:54`) and are
//! stored as-is, offset stripped. Multilingual names arrive either as plain
//! text or as `{ simplifiedName, zh_CN, vi_VN, en_US }` objects.

use mktsync_core::mapping::{lookup, map_fields, parse_datetime_str, Coercion, FieldMap, FieldSpec};
use mktsync_core::{NormalizedLine, NormalizedRecord};
use serde_json::{Map, Value};

use crate::{array_field, str_field};

use Coercion::{Bool, DateTimeString, Float, Integer, JsonText, Text};

pub const PARTNER_FIELDS: &FieldMap = &[
    FieldSpec::same("code", Text),
    FieldSpec::new("name.simplifiedName", "simplified_name", Text),
    FieldSpec::new("createOrgId", "create_org_id", Text),
    FieldSpec::new("createOrgCode", "create_org_code", Text),
    FieldSpec::new("belongOrgId", "belong_org_id", Text),
    FieldSpec::new("belongOrgCode", "belong_org_code", Text),
    FieldSpec::new("transTypeId", "trans_type_id", Text),
    FieldSpec::new("transTypeCode", "trans_type_code", Text),
    FieldSpec::new("customerClassId", "customer_class_id", Text),
    FieldSpec::new("customerClassCode", "customer_class_code", Text),
    FieldSpec::new("retailInvestors", "retail_investors", Bool),
    FieldSpec::new("internalOrg", "internal_org", Bool),
    FieldSpec::new("taxPayingCategories", "tax_paying_categories", Integer),
    FieldSpec::new("enterpriseNature", "enterprise_nature", Integer),
    FieldSpec::new("scopeModel", "scope_model", Integer),
    FieldSpec::new("stopStatus", "stop_status", Bool),
    FieldSpec::same("creator", Text),
    FieldSpec::same("modifier", Text),
    FieldSpec::same("pubts", DateTimeString),
    FieldSpec::new("createTime", "create_time", DateTimeString),
    FieldSpec::new("modifyTime", "modify_time", DateTimeString),
];

pub const PRODUCT_FIELDS: &FieldMap = &[
    FieldSpec::same("code", Text),
    FieldSpec::new("transType", "trans_type", Text),
    FieldSpec::new("unitId", "unit_id", Text),
    FieldSpec::new("unitCode", "unit_code", Text),
    FieldSpec::new("unitName", "unit_name", Text),
    FieldSpec::new("manageClass", "manage_class", Text),
    FieldSpec::new("manageClassCode", "manage_class_code", Text),
    FieldSpec::new("manageClassName", "manage_class_name", Text),
    FieldSpec::new("saleProductClass", "sale_product_class", Text),
    FieldSpec::new("saleProductClassCode", "sale_product_class_code", Text),
    FieldSpec::new("purchaseClass", "purchase_class", Text),
    FieldSpec::new("purchaseClassCode", "purchase_class_code", Text),
    FieldSpec::new("productTemplate", "product_template", Text),
    FieldSpec::new("productFamily", "product_family", Integer),
    FieldSpec::new("hasSpecs", "has_specs", Bool),
    FieldSpec::new("stopStatus", "stop_status", Bool),
    FieldSpec::same("url", Text),
    FieldSpec::new("brand", "brand_id", Text),
    FieldSpec::new("brand_Code", "brand_code", Text),
    FieldSpec::new("brand_Name", "brand_name", Text),
    FieldSpec::new("placeOfOrigin", "place_of_origin", Text),
    FieldSpec::same("manufacturer", Text),
    FieldSpec::same("weight", Float),
    FieldSpec::new("weightUnit_Name", "weight_unit_name", Text),
    FieldSpec::same("volume", Float),
    FieldSpec::new("volumeUnit_Name", "volume_unit_name", Text),
    FieldSpec::new("taxClass_Code", "tax_class_code", Text),
    FieldSpec::new("defaultSKUId", "default_sku_id", Text),
    FieldSpec::same("deleted", Bool),
    FieldSpec::new("createOrgId", "create_org_id", Text),
    FieldSpec::same("creator", Text),
    FieldSpec::same("modifier", Text),
    FieldSpec::new("createTime", "create_time", DateTimeString),
    FieldSpec::new("modifyTime", "modify_time", DateTimeString),
    FieldSpec::same("detail", JsonText),
];

pub const ORDER_FIELDS: &FieldMap = &[
    FieldSpec::same("code", Text),
    FieldSpec::same("name", Text),
    FieldSpec::same("status", Integer),
    FieldSpec::same("verifystate", Integer),
    FieldSpec::new("quoteStatus", "quote_status", Text),
    FieldSpec::same("vouchdate", DateTimeString),
    FieldSpec::new("receiveContacter", "receive_contacter", Text),
    FieldSpec::new("receiveContacterPhone", "receive_contacter_phone", Text),
    FieldSpec::new("corpContact", "corp_contact", Text),
    FieldSpec::new("corpContactUserName", "corp_contact_user_name", Text),
    FieldSpec::new("agentId", "agent_id", Text),
    FieldSpec::new("agentId_name", "agent_name", Text),
    FieldSpec::new("transactionTypeId_code", "transaction_type_code", Text),
    FieldSpec::new("quotePersonId_name", "quote_person_name", Text),
    FieldSpec::same("currency", Text),
    FieldSpec::same("currency_name", Text),
    FieldSpec::new("natCurrency_code", "nat_currency_code", Text),
    FieldSpec::new("exchRate", "exch_rate", Float),
    FieldSpec::new("quoteTableTotalMoney", "quote_table_total_money", Float),
    FieldSpec::new("totalMoney", "total_money", Float),
    FieldSpec::new("totalOriMoney", "total_ori_money", Float),
    FieldSpec::new("totalOriTax", "total_ori_tax", Float),
    FieldSpec::new("totalDiscountSum", "total_discount_sum", Float),
    FieldSpec::new("totalDiscountRate", "total_discount_rate", Float),
    FieldSpec::new("salesOrgId", "sales_org_id", Text),
    FieldSpec::new("salesOrgId_name", "sales_org_name", Text),
    FieldSpec::new("invoiceTypeIdName", "invoice_type_name", Text),
    FieldSpec::new("isWfControlled", "is_wf_controlled", Bool),
    FieldSpec::same("memo", Text),
    FieldSpec::same("pubts", DateTimeString),
];

/// Line fields after the `childs_` prefix has been stripped.
pub const ORDER_LINE_FIELDS: &FieldMap = &[
    FieldSpec::new("productId", "product_id", Text),
    FieldSpec::new("productId_code", "product_code", Text),
    FieldSpec::new("productId_name", "product_name", Text),
    FieldSpec::new("skuId", "sku_id", Text),
    FieldSpec::new("skuId_code", "sku_code", Text),
    FieldSpec::new("skuId_name", "sku_name", Text),
    FieldSpec::new("masterUnitId_name", "master_unit_name", Text),
    FieldSpec::new("saleunitId_name", "sale_unit_name", Text),
    FieldSpec::same("qty", Float),
    FieldSpec::new("subQty", "sub_qty", Float),
    FieldSpec::new("priceQty", "price_qty", Float),
    FieldSpec::new("oriUnitPrice", "ori_unit_price", Float),
    FieldSpec::new("oriTaxUnitPrice", "ori_tax_unit_price", Float),
    FieldSpec::new("natUnitPrice", "nat_unit_price", Float),
    FieldSpec::new("oriMoney", "ori_money", Float),
    FieldSpec::new("oriSum", "ori_sum", Float),
    FieldSpec::new("natMoney", "nat_money", Float),
    FieldSpec::new("natSum", "nat_sum", Float),
    FieldSpec::new("discountRate", "discount_rate", Float),
    FieldSpec::new("discountSum", "discount_sum", Float),
    FieldSpec::new("taxRate", "tax_rate", Float),
];

pub const WAREHOUSE_FIELDS: &FieldMap = &[
    FieldSpec::same("code", Text),
    FieldSpec::same("name", Text),
    FieldSpec::same("org", Text),
    FieldSpec::same("org_name", Text),
    FieldSpec::same("org_code", Text),
    FieldSpec::same("ownerorg", Text),
    FieldSpec::same("ownerorg_name", Text),
    FieldSpec::new("regionCode", "region_code", Text),
    FieldSpec::same("address", Text),
    FieldSpec::same("country", Text),
    FieldSpec::same("country_name", Text),
    FieldSpec::same("longitude", Float),
    FieldSpec::same("latitude", Float),
    FieldSpec::same("linkman", Text),
    FieldSpec::same("phone", Text),
    FieldSpec::same("department_name", Text),
    FieldSpec::new("erpCode", "erp_code", Text),
    FieldSpec::new("iSerialManage", "serial_manage", Bool),
    FieldSpec::new("isGoodsPosition", "is_goods_position", Bool),
    FieldSpec::new("eStore", "e_store", Bool),
    FieldSpec::new("wStore", "w_store", Bool),
    FieldSpec::new("bWMS", "wms", Bool),
    FieldSpec::new("isConsignment", "is_consignment", Bool),
    FieldSpec::new("iUsed", "used", Text),
    FieldSpec::same("operator_name", Text),
    FieldSpec::new("modifyTime", "modify_time", DateTimeString),
];

pub const ORG_UNIT_FIELDS: &FieldMap = &[
    FieldSpec::same("code", Text),
    FieldSpec::same("innercode", Text),
    FieldSpec::same("parent", Text),
    FieldSpec::same("parentid", Text),
    FieldSpec::same("path", Text),
    FieldSpec::same("level", Integer),
    FieldSpec::same("orgid", Text),
    FieldSpec::same("orgtype", Integer),
    FieldSpec::same("isbizunit", Bool),
    FieldSpec::same("isdefault", Bool),
    FieldSpec::same("externalorg", Bool),
    FieldSpec::same("taxpayername", Text),
    FieldSpec::same("taxpayerid", Text),
    FieldSpec::same("companytype", Text),
    FieldSpec::same("enable", Bool),
    FieldSpec::same("frozen", Bool),
    FieldSpec::same("closed", Bool),
    FieldSpec::same("sort", Integer),
    FieldSpec::same("parent_name", Text),
    FieldSpec::same("parent_code", Text),
    FieldSpec::same("principal_name", Text),
    FieldSpec::new("isEnd", "is_end", Bool),
    FieldSpec::same("description", Text),
    FieldSpec::same("address", Text),
    FieldSpec::new("shortname.vi_VN", "shortname_vi", Text),
    FieldSpec::new("shortname.en_US", "shortname_en", Text),
    FieldSpec::new("name.zh_CN", "name_zh", Text),
    FieldSpec::new("name.vi_VN", "name_vi", Text),
    FieldSpec::new("name.en_US", "name_en", Text),
    FieldSpec::same("modifiedtime", DateTimeString),
];

/// Display name: plain text, or the best entry of a multilingual object.
fn display_name(raw: &Value) -> Option<String> {
    let name = match raw.get("name") {
        Some(Value::Object(names)) => ["simplifiedName", "vi_VN", "en_US", "zh_CN"]
            .iter()
            .find_map(|key| names.get(*key).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
        Some(Value::String(name)) if !name.is_empty() => Some(name.clone()),
        _ => None,
    };
    name.or_else(|| str_field(raw, "code"))
}

fn updated_at(raw: &Value, key: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    lookup(raw, key).and_then(Value::as_str).and_then(parse_datetime_str)
}

fn with_name(raw: &Value, map: &FieldMap) -> Map<String, Value> {
    let mut fields = map_fields(raw, map);
    if let Some(name) = display_name(raw) {
        fields.insert("name".to_owned(), Value::String(name));
    }
    fields
}

#[must_use]
pub fn normalize_partner(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "id")?;
    Some(
        NormalizedRecord::new(id, with_name(raw, PARTNER_FIELDS), raw.clone())
            .with_updated_at(updated_at(raw, "modifyTime")),
    )
}

#[must_use]
pub fn normalize_product(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "id")?;
    Some(
        NormalizedRecord::new(id, with_name(raw, PRODUCT_FIELDS), raw.clone())
            .with_updated_at(updated_at(raw, "modifyTime")),
    )
}

#[must_use]
pub fn normalize_warehouse(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "id")?;
    Some(
        NormalizedRecord::new(id, map_fields(raw, WAREHOUSE_FIELDS), raw.clone())
            .with_updated_at(updated_at(raw, "modifyTime")),
    )
}

/// Org unit linked to its `parent` unit id. The root has no parent.
#[must_use]
pub fn normalize_org_unit(raw: &Value) -> Option<NormalizedRecord> {
    let id = str_field(raw, "id")?;
    let parent = str_field(raw, "parent")
        .or_else(|| str_field(raw, "parentid"))
        .filter(|p| !p.is_empty() && *p != id);
    Some(
        NormalizedRecord::new(id, with_name(raw, ORG_UNIT_FIELDS), raw.clone())
            .with_parent(parent)
            .with_updated_at(updated_at(raw, "modifiedtime")),
    )
}

/// Quotation header from the list row, overlaid with its detail when the
/// detail call succeeded. Lines come from the detail's `childs`.
#[must_use]
pub fn normalize_order(row: &Value, detail: Option<&Value>) -> Option<NormalizedRecord> {
    let id = str_field(row, "id")?;
    let header = detail
        .filter(|d| d.as_object().is_some_and(|map| !map.is_empty()))
        .unwrap_or(row);

    let childs = array_field(header, "childs");
    let lines: Vec<NormalizedLine> = childs
        .iter()
        .map(|child| {
            let flat = strip_child_prefix(child);
            NormalizedLine {
                external_id: str_field(&flat, "id"),
                fields: map_fields(&flat, ORDER_LINE_FIELDS),
                raw_payload: child.clone(),
            }
        })
        .collect();

    Some(
        NormalizedRecord::new(id, map_fields(header, ORDER_FIELDS), header.clone())
            .with_updated_at(updated_at(header, "pubts"))
            .with_lines(lines),
    )
}

/// Quotation lines use `childs_qty` in some payloads and `qty` in others;
/// prefixed keys win.
fn strip_child_prefix(line: &Value) -> Value {
    let Value::Object(map) = line else {
        return line.clone();
    };
    let mut flat: Map<String, Value> = map
        .iter()
        .filter(|(key, _)| !key.starts_with("childs_"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (key, value) in map {
        if let Some(stripped) = key.strip_prefix("childs_") {
            flat.insert(stripped.to_owned(), value.clone());
        }
    }
    Value::Object(flat)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn partner_name_prefers_simplified_name() {
        let raw = json!({
            "id": 2_001_234_567_890_i64,
            "code": "KH001",
            "name": { "simplifiedName": "Công ty An Phát", "zh_CN": "安发公司" },
            "retailInvestors": false,
            "modifyTime": "2025-09-18T16:21:54+07:00"
        });
        let record = normalize_partner(&raw).unwrap();
        assert_eq!(record.external_id, "2001234567890");
        assert_eq!(record.field("name"), Some(&json!("Công ty An Phát")));
        assert_eq!(record.field("modify_time"), Some(&json!("2025-09-18T16:21:54Z")));
        assert_eq!(
            record.source_updated_at.map(|t| t.to_rfc3339()).as_deref(),
            Some("2025-09-18T16:21:54+00:00")
        );
    }

    #[test]
    fn partner_without_name_falls_back_to_code() {
        let record = normalize_partner(&json!({ "id": "1", "code": "KH002", "name": {} })).unwrap();
        assert_eq!(record.field("name"), Some(&json!("KH002")));
    }

    #[test]
    fn order_lines_come_from_detail_childs() {
        let row = json!({ "id": "q1", "code": "SQ-001", "status": 0 });
        let detail = json!({
            "id": "q1",
            "code": "SQ-001",
            "status": 1,
            "pubts": "2025-10-01 08:00:00",
            "childs": [
                { "childs_id": "l1", "childs_productId_code": "P-1", "childs_qty": 3, "qty": 99 },
                { "id": "l2", "productId_code": "P-2", "qty": "2" }
            ]
        });
        let record = normalize_order(&row, Some(&detail)).unwrap();
        assert_eq!(record.field("status"), Some(&json!(1)));
        assert_eq!(record.lines.len(), 2);
        assert_eq!(record.lines[0].external_id.as_deref(), Some("l1"));
        assert_eq!(record.lines[0].fields.get("qty"), Some(&json!(3.0)));
        assert_eq!(record.lines[1].fields.get("product_code"), Some(&json!("P-2")));
    }

    #[test]
    fn order_without_detail_uses_list_row() {
        let record =
            normalize_order(&json!({ "id": "q2", "code": "SQ-002" }), Some(&json!({}))).unwrap();
        assert_eq!(record.field("code"), Some(&json!("SQ-002")));
        assert!(record.lines.is_empty());
    }

    #[test]
    fn org_unit_links_parent_but_not_itself() {
        let raw = json!({ "id": "u1", "parent": "root", "name": { "vi_VN": "Chi nhánh HN" } });
        let child = normalize_org_unit(&raw).unwrap();
        assert_eq!(child.parent_external_id.as_deref(), Some("root"));
        assert_eq!(child.field("name"), Some(&json!("Chi nhánh HN")));

        let root = normalize_org_unit(&json!({ "id": "root", "level": 0, "parent": "" })).unwrap();
        assert_eq!(root.parent_external_id, None);
    }
}
