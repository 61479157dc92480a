//! Declarative vendor-to-local field mapping.
//!
//! Each vendor entity declares a static table of [`FieldSpec`]s. [`map_fields`]
//! walks the table against a vendor JSON object, resolving dotted paths and
//! applying the per-field [`Coercion`]. Keys absent from the payload are
//! skipped; `null` and empty strings always map to `null`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// Value conversion applied while mapping one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Copy the JSON value unchanged.
    Passthrough,
    /// Unix epoch seconds to an RFC 3339 UTC string. Zero and negatives map to `null`.
    UnixSeconds,
    /// Unix epoch milliseconds to an RFC 3339 UTC string.
    UnixMillis,
    /// Naive datetime text (`YYYY-MM-DD HH:MM:SS`, `T` separator allowed).
    /// A trailing `Z` or `+hh:mm` is dropped and the clock time read as UTC.
    DateTimeString,
    /// ISO 8601 datetime honouring its offset, converted to UTC.
    IsoDateTime,
    /// Array rendered as `[a<sep>b]` text.
    ListToDelimited(&'static str),
    /// Arrays and objects serialised to compact JSON text.
    JsonText,
    /// Number or numeric text to a float; anything unparsable maps to `0.0`.
    Float,
    /// Number or numeric text to an integer; anything unparsable maps to `null`.
    Integer,
    /// Booleans, `"true"`/`"false"`, `"1"`/`"0"` and numbers.
    Bool,
    /// Scalar rendered as text.
    Text,
    /// Text restricted to a known set; other values become `"OTHER"`.
    OneOf(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Dotted path into the vendor payload, e.g. `payment.total_amount` or `statuses.0`.
    pub vendor_key: &'static str,
    pub local_key: &'static str,
    pub coercion: Coercion,
}

impl FieldSpec {
    #[must_use]
    pub const fn new(
        vendor_key: &'static str,
        local_key: &'static str,
        coercion: Coercion,
    ) -> Self {
        Self {
            vendor_key,
            local_key,
            coercion,
        }
    }

    /// A field whose local name equals its vendor name.
    #[must_use]
    pub const fn same(key: &'static str, coercion: Coercion) -> Self {
        Self::new(key, key, coercion)
    }
}

pub type FieldMap = [FieldSpec];

/// Map `source` through `map`, producing the local field object.
#[must_use]
pub fn map_fields(source: &Value, map: &FieldMap) -> Map<String, Value> {
    let mut out = Map::new();
    for spec in map {
        if let Some(value) = lookup(source, spec.vendor_key) {
            out.insert(spec.local_key.to_string(), coerce(value, spec.coercion));
        }
    }
    out
}

/// Resolve a dotted path. Numeric segments index into arrays.
#[must_use]
pub fn lookup<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(source, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Apply a single coercion.
#[must_use]
pub fn coerce(value: &Value, coercion: Coercion) -> Value {
    if is_empty(value) {
        return Value::Null;
    }

    match coercion {
        Coercion::Passthrough => value.clone(),
        Coercion::UnixSeconds => unix_seconds(value).map_or(Value::Null, datetime_value),
        Coercion::UnixMillis => unix_millis(value).map_or(Value::Null, datetime_value),
        Coercion::DateTimeString => value
            .as_str()
            .and_then(parse_datetime_str)
            .map_or(Value::Null, datetime_value),
        Coercion::IsoDateTime => value
            .as_str()
            .and_then(parse_iso_datetime)
            .map_or(Value::Null, datetime_value),
        Coercion::ListToDelimited(sep) => match value {
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().filter_map(value_as_string).collect();
                Value::String(format!("[{}]", parts.join(sep)))
            }
            other => value_as_string(other).map_or(Value::Null, Value::String),
        },
        Coercion::JsonText => match value {
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        },
        Coercion::Float => Value::from(value_as_f64(value).unwrap_or(0.0)),
        Coercion::Integer => value_as_i64(value).map_or(Value::Null, Value::from),
        Coercion::Bool => value_as_bool(value).map_or(Value::Null, Value::Bool),
        Coercion::Text => match value {
            Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
            other => value_as_string(other).map_or(Value::Null, Value::String),
        },
        Coercion::OneOf(allowed) => match value_as_string(value) {
            Some(s) if allowed.contains(&s.as_str()) => Value::String(s),
            Some(_) => Value::String("OTHER".to_string()),
            None => Value::Null,
        },
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn datetime_value(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Interpret a number or numeric string as Unix epoch seconds.
#[must_use]
pub fn unix_seconds(value: &Value) -> Option<DateTime<Utc>> {
    value_as_i64(value)
        .filter(|&secs| secs > 0)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Interpret a number or numeric string as Unix epoch milliseconds.
#[must_use]
pub fn unix_millis(value: &Value) -> Option<DateTime<Utc>> {
    value_as_i64(value)
        .filter(|&ms| ms > 0)
        .and_then(DateTime::from_timestamp_millis)
}

/// Parse naive datetime text, discarding any `Z` or `+hh:mm` suffix.
///
/// Accepts `2025-09-18 16:21:54`, `2025-09-18T16:21:54`, fractional seconds
/// and a bare date.
#[must_use]
pub fn parse_datetime_str(raw: &str) -> Option<DateTime<Utc>> {
    let mut s = raw.trim().replace('T', " ");
    if let Some(idx) = s.find('+') {
        s.truncate(idx);
    }
    let s = s.trim_end_matches('Z').trim();

    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Parse an ISO 8601 datetime, honouring its offset. Text without an offset
/// is read as UTC.
#[must_use]
pub fn parse_iso_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z"))
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_datetime_str(s))
}

#[must_use]
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract().abs() < f64::EPSILON && f.abs() < 9.0e15).then(|| f as i64)
}

#[must_use]
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

#[must_use]
pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Some(true),
            "false" | "0" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Render a scalar as text. Numbers keep their JSON spelling.
#[must_use]
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "mapping_test.rs"]
mod tests;
