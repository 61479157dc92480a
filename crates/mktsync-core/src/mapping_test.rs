use serde_json::json;

use super::*;

// -----------------------------------------------------------------------
// map_fields
// -----------------------------------------------------------------------

const ORDER_FIELDS: &FieldMap = &[
    FieldSpec::new("orderId", "external_order_id", Coercion::Text),
    FieldSpec::same("status", Coercion::Passthrough),
    FieldSpec::new("orderTime", "order_time", Coercion::UnixSeconds),
    FieldSpec::new("payment.total_amount", "total_amount", Coercion::Float),
    FieldSpec::new("statuses.0", "first_status", Coercion::Text),
    FieldSpec::new("labelStr", "labels", Coercion::ListToDelimited(", ")),
    FieldSpec::new("isCod", "is_cod", Coercion::Bool),
];

#[test]
fn map_fields_renames_and_coerces() {
    let payload = json!({
        "orderId": 88123,
        "status": "WaitConfirm",
        "orderTime": 1_700_000_000,
        "payment": { "total_amount": "125.50" },
        "statuses": ["pending", "packed"],
        "labelStr": ["vip", "gift"],
        "isCod": "true",
        "unmapped": "ignored"
    });

    let mapped = map_fields(&payload, ORDER_FIELDS);

    assert_eq!(mapped["external_order_id"], json!("88123"));
    assert_eq!(mapped["status"], json!("WaitConfirm"));
    assert_eq!(mapped["order_time"], json!("2023-11-14T22:13:20Z"));
    assert_eq!(mapped["total_amount"], json!(125.5));
    assert_eq!(mapped["first_status"], json!("pending"));
    assert_eq!(mapped["labels"], json!("[vip, gift]"));
    assert_eq!(mapped["is_cod"], json!(true));
    assert!(!mapped.contains_key("unmapped"));
}

#[test]
fn map_fields_skips_missing_keys() {
    let mapped = map_fields(&json!({ "status": "Sent" }), ORDER_FIELDS);
    assert_eq!(mapped.len(), 1);
    assert_eq!(mapped["status"], json!("Sent"));
}

#[test]
fn map_fields_maps_null_and_empty_to_null() {
    let mapped = map_fields(&json!({ "status": "", "orderTime": null }), ORDER_FIELDS);
    assert_eq!(mapped["status"], Value::Null);
    assert_eq!(mapped["order_time"], Value::Null);
}

#[test]
fn lookup_returns_none_through_scalars() {
    let payload = json!({ "payment": 5 });
    assert!(lookup(&payload, "payment.total_amount").is_none());
    assert!(lookup(&payload, "statuses.0").is_none());
}

// -----------------------------------------------------------------------
// coercions
// -----------------------------------------------------------------------

#[test]
fn unix_seconds_zero_is_null() {
    assert_eq!(coerce(&json!(0), Coercion::UnixSeconds), Value::Null);
    assert_eq!(coerce(&json!("0"), Coercion::UnixSeconds), Value::Null);
}

#[test]
fn unix_millis_converts() {
    assert_eq!(
        coerce(&json!(1_700_000_000_123_i64), Coercion::UnixMillis),
        json!("2023-11-14T22:13:20Z")
    );
}

#[test]
fn datetime_string_accepts_t_separator_and_strips_offset() {
    assert_eq!(
        coerce(&json!("2025-09-18T16:21:54+07:00"), Coercion::DateTimeString),
        json!("2025-09-18T16:21:54Z")
    );
    assert_eq!(
        coerce(&json!("2025-09-18 16:21:54"), Coercion::DateTimeString),
        json!("2025-09-18T16:21:54Z")
    );
    assert_eq!(
        coerce(&json!("2025-09-18T16:21:54Z"), Coercion::DateTimeString),
        json!("2025-09-18T16:21:54Z")
    );
}

#[test]
fn datetime_string_accepts_fractional_seconds() {
    let parsed = parse_datetime_str("2025-10-01T10:00:00.1234567+08:00").unwrap();
    assert_eq!(parsed.to_rfc3339_opts(SecondsFormat::Secs, true), "2025-10-01T10:00:00Z");
}

#[test]
fn datetime_string_garbage_is_null() {
    assert_eq!(coerce(&json!("yesterday"), Coercion::DateTimeString), Value::Null);
}

#[test]
fn iso_datetime_honours_offset() {
    assert_eq!(
        coerce(&json!("2024-05-01 09:00:00 +0700"), Coercion::IsoDateTime),
        json!("2024-05-01T02:00:00Z")
    );
    assert_eq!(
        coerce(&json!("2024-05-01T09:00:00+07:00"), Coercion::IsoDateTime),
        json!("2024-05-01T02:00:00Z")
    );
}

#[test]
fn float_unparsable_is_zero() {
    assert_eq!(coerce(&json!("n/a"), Coercion::Float), json!(0.0));
    assert_eq!(coerce(&json!(true), Coercion::Float), json!(0.0));
    assert_eq!(coerce(&json!("12.5"), Coercion::Float), json!(12.5));
}

#[test]
fn integer_accepts_integral_strings() {
    assert_eq!(coerce(&json!("42"), Coercion::Integer), json!(42));
    assert_eq!(coerce(&json!(7.0), Coercion::Integer), json!(7));
    assert_eq!(coerce(&json!("4.5"), Coercion::Integer), Value::Null);
}

#[test]
fn json_text_serialises_arrays() {
    assert_eq!(
        coerce(&json!(["GAMBLING", "HOUSING"]), Coercion::JsonText),
        json!("[\"GAMBLING\",\"HOUSING\"]")
    );
}

#[test]
fn one_of_falls_back_to_other() {
    const MODES: Coercion = Coercion::OneOf(&["BUDGET_MODE_DAY", "BUDGET_MODE_TOTAL"]);
    assert_eq!(coerce(&json!("BUDGET_MODE_DAY"), MODES), json!("BUDGET_MODE_DAY"));
    assert_eq!(coerce(&json!("BUDGET_MODE_DYNAMIC"), MODES), json!("OTHER"));
}

#[test]
fn bool_rejects_unknown_text() {
    assert_eq!(coerce(&json!("maybe"), Coercion::Bool), Value::Null);
    assert_eq!(coerce(&json!(0), Coercion::Bool), json!(false));
}
