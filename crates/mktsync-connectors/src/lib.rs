//! HTTP clients for the marketplace and ERP vendors synced by mktsync.
//!
//! Each vendor module exposes a client (raw, paged vendor JSON) and a
//! `fields` module that maps that JSON onto [`mktsync_core::NormalizedRecord`]s.
//! Transport concerns shared by all vendors live in [`http`], [`signing`] and
//! [`pagination`].

pub mod error;
pub mod http;
pub mod jst;
pub mod lazada;
pub mod pagination;
mod retry;
pub mod signing;
pub mod tiktok_business;
pub mod tiktok_shop;
pub mod yonsuite;

use chrono::{DateTime, Utc};
use serde_json::Value;

pub use error::ConnectorError;
pub use http::HttpSettings;
pub use jst::JstClient;
pub use lazada::LazadaClient;
pub use pagination::{Cursor, Page};
pub use tiktok_business::TiktokBusinessClient;
pub use tiktok_shop::TiktokShopClient;
pub use yonsuite::YonsuiteClient;

/// Credentials issued by a vendor token endpoint.
#[derive(Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
    /// Vendor account the token belongs to: seller id, company id, or the
    /// advertiser list, depending on the vendor.
    pub external_ref: Option<String>,
    /// Display name reported alongside the token, when any.
    pub account_name: Option<String>,
    pub raw: Value,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[redacted]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("expires_at", &self.expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .field("external_ref", &self.external_ref)
            .field("account_name", &self.account_name)
            .finish_non_exhaustive()
    }
}

/// Reads `key` from a JSON object as text, accepting numbers too.
pub(crate) fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(mktsync_core::mapping::value_as_string)
}

/// Returns the array at `key`, or an empty vector when absent or not an array.
pub(crate) fn array_field(value: &Value, key: &str) -> Vec<Value> {
    match value.get(key) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}
