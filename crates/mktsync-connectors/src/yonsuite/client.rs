//! HTTP client for the YonSuite open API.
//!
//! A self-built app exchanges its key for a short-lived `access_token`
//! (`/open-auth/selfAppAuth/getAccessToken`, signed), then passes that token
//! as a query parameter on every business call. Business envelopes report
//! success as `code == "200"`; the token endpoint uses `"00000"`.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use reqwest::{Client, Url};
use serde_json::{json, Value};

use crate::error::ConnectorError;
use crate::http::{build_client, endpoint, now_millis, parse_base_url, send_json, HttpSettings};
use crate::pagination::{next_index, Page};
use crate::signing::{compact_json, yonsuite_sign};
use crate::{array_field, str_field, TokenGrant};

const VENDOR: &str = "yonsuite";
const TOKEN_OK: &str = "00000";
const BUSINESS_OK: &str = "200";
const DEFAULT_EXPIRE_SECS: i64 = 7_200;

/// Page size used when the tenant does not configure one.
pub const DEFAULT_PAGE_SIZE: u32 = 500;
/// Sales-org code queried for the organisation root.
pub const DEFAULT_ROOT_ORG_CODE: &str = "global00";

/// Messages YonSuite returns instead of an empty list.
const EMPTY_MARKERS: [&str; 4] = ["rỗng", "empty", "không có", "khong co"];

/// Client for one YonSuite tenant (base URL plus self-built app keys).
pub struct YonsuiteClient {
    client: Client,
    settings: HttpSettings,
    app_key: String,
    app_secret: String,
    base_url: Url,
}

impl YonsuiteClient {
    /// Creates a client for the tenant's gateway `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ConnectorError::InvalidBaseUrl`] if `base_url` is invalid.
    pub fn new(
        app_key: &str,
        app_secret: &str,
        settings: HttpSettings,
        base_url: &str,
    ) -> Result<Self, ConnectorError> {
        Ok(Self {
            client: build_client(&settings)?,
            settings,
            app_key: app_key.to_owned(),
            app_secret: app_secret.to_owned(),
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Fetches a fresh access token for the app.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::Api`] if `code` is not `00000` or no token is returned.
    /// - [`ConnectorError::Http`] / [`ConnectorError::UnexpectedStatus`] on
    ///   transport failure.
    pub async fn get_access_token(&self) -> Result<TokenGrant, ConnectorError> {
        let timestamp = now_millis().to_string();
        let mut params = BTreeMap::new();
        params.insert("appKey".to_owned(), self.app_key.clone());
        params.insert("timestamp".to_owned(), timestamp.clone());
        let signature = yonsuite_sign(&self.app_secret, &params)?;

        let mut url = endpoint(&self.base_url, "/open-auth/selfAppAuth/getAccessToken")?;
        // The signature is already percent-encoded and must not be encoded twice.
        url.set_query(Some(&format!(
            "appKey={}&timestamp={timestamp}&signature={signature}",
            self.app_key
        )));

        let envelope = send_json(&self.settings, "yonsuite getAccessToken", || {
            self.client.get(url.clone())
        })
        .await?;

        let code = str_field(&envelope, "code").unwrap_or_default();
        if code != TOKEN_OK {
            return Err(envelope_error(&envelope));
        }
        let data = envelope.get("data").cloned().unwrap_or(Value::Null);
        let access_token = str_field(&data, "access_token").ok_or_else(|| {
            ConnectorError::api(VENDOR, "missing_token", "token response has no access_token")
        })?;
        let expire_secs = data
            .get("expire")
            .and_then(mktsync_core::mapping::value_as_i64)
            .unwrap_or(DEFAULT_EXPIRE_SECS);
        tracing::info!(expire_secs, "YonSuite access token retrieved");

        Ok(TokenGrant {
            access_token,
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::seconds(expire_secs)),
            refresh_expires_at: None,
            external_ref: None,
            account_name: None,
            raw: data,
        })
    }

    /// One page of customers (`merchant/newlist`); `data` is the row list.
    ///
    /// # Errors
    ///
    /// As [`YonsuiteClient::get_access_token`].
    pub async fn get_partners(
        &self,
        access_token: &str,
        page_index: u32,
        page_size: u32,
    ) -> Result<Page<Value>, ConnectorError> {
        self.list_page(access_token, "/yonbip/digitalModel/merchant/newlist", page_index, page_size)
            .await
    }

    /// One page of products (`product/integration/querylist`).
    ///
    /// # Errors
    ///
    /// As [`YonsuiteClient::get_access_token`].
    pub async fn get_products(
        &self,
        access_token: &str,
        page_index: u32,
        page_size: u32,
    ) -> Result<Page<Value>, ConnectorError> {
        self.list_page(
            access_token,
            "/yonbip/digitalModel/product/integration/querylist",
            page_index,
            page_size,
        )
        .await
    }

    /// One page of sales quotations.
    ///
    /// # Errors
    ///
    /// As [`YonsuiteClient::get_access_token`].
    pub async fn get_orders(
        &self,
        access_token: &str,
        page_index: u32,
        page_size: u32,
    ) -> Result<Page<Value>, ConnectorError> {
        self.list_page(access_token, "/yonbip/sd/quote/salesquotation/list", page_index, page_size)
            .await
    }

    /// Full sales quotation including its `childs` lines.
    ///
    /// # Errors
    ///
    /// As [`YonsuiteClient::get_access_token`].
    pub async fn get_order_detail(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<Value, ConnectorError> {
        self.get(access_token, "/yonbip/sd/quote/salesquotation/detail", &[("id", id)])
            .await
    }

    /// One page of warehouses.
    ///
    /// # Errors
    ///
    /// As [`YonsuiteClient::get_access_token`].
    pub async fn get_warehouses(
        &self,
        access_token: &str,
        page_index: u32,
        page_size: u32,
    ) -> Result<Page<Value>, ConnectorError> {
        self.list_page(access_token, "/yonbip/digitalModel/warehouse/list", page_index, page_size)
            .await
    }

    /// The organisation tree: the sales-org root (tagged `level = 0`) followed
    /// by the level-1 units, each level-1 unit enriched with its detail.
    ///
    /// A failing root or detail lookup is logged and skipped; only the
    /// level-1 listing is required.
    ///
    /// # Errors
    ///
    /// As [`YonsuiteClient::get_access_token`], for the level-1 listing.
    pub async fn get_org_units(
        &self,
        access_token: &str,
        root_code: &str,
    ) -> Result<Vec<Value>, ConnectorError> {
        let mut units = Vec::new();

        let root_body = json!({ "funcType": "salesorg", "code": root_code });
        match self
            .post(access_token, "/yonbip/digitalModel/queryRootOrgInfos", Some(&root_body))
            .await
        {
            Ok(data) => units.extend(root_units(data)),
            Err(e) => tracing::warn!(error = %e, root_code, "YonSuite root org lookup failed"),
        }

        let level1 = self
            .post(access_token, "/yonbip/digitalModel/orgunit/querytree", None)
            .await?;
        for unit in list_rows(&level1) {
            let Some(id) = str_field(&unit, "id") else {
                continue;
            };
            match self
                .get(access_token, "/yonbip/digitalModel/orgunit/detail", &[("id", id.as_str())])
                .await
            {
                Ok(detail) if detail.is_object() => units.push(detail),
                Ok(_) => units.push(unit),
                Err(e) => {
                    tracing::warn!(error = %e, id = %id, "YonSuite org unit detail failed");
                    units.push(unit);
                }
            }
        }

        tracing::debug!(units = units.len(), "YonSuite org tree fetched");
        Ok(units)
    }

    async fn list_page(
        &self,
        access_token: &str,
        path: &str,
        page_index: u32,
        page_size: u32,
    ) -> Result<Page<Value>, ConnectorError> {
        let body = json!({ "pageIndex": page_index, "pageSize": page_size });
        let envelope = self.send_post(access_token, path, Some(&body)).await?;

        if str_field(&envelope, "code").as_deref() != Some(BUSINESS_OK) {
            if is_empty_result(&envelope) {
                tracing::info!(path, page_index, "YonSuite reports an empty result");
                return Ok(Page::last(Vec::new()));
            }
            return Err(envelope_error(&envelope));
        }

        let data = envelope.get("data").cloned().unwrap_or(Value::Null);
        let items = list_rows(&data);
        let page_count = data.get("pageCount").and_then(Value::as_u64);
        let next = next_index(page_index, page_count, items.len(), page_size);
        tracing::debug!(path, page_index, rows = items.len(), ?page_count, "YonSuite page fetched");
        Ok(Page::new(items, next))
    }

    async fn post(
        &self,
        access_token: &str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ConnectorError> {
        let envelope = self.send_post(access_token, path, body).await?;
        checked_data(&envelope)
    }

    async fn send_post(
        &self,
        access_token: &str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ConnectorError> {
        let url = endpoint(&self.base_url, path)?;
        let body = body.map(compact_json).transpose()?;
        let context = format!("yonsuite {path}");
        send_json(&self.settings, &context, || {
            let request = self
                .client
                .post(url.clone())
                .header("Content-Type", "application/json")
                .query(&[("access_token", access_token)]);
            match &body {
                Some(body) => request.body(body.clone()),
                None => request,
            }
        })
        .await
    }

    async fn get(
        &self,
        access_token: &str,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, ConnectorError> {
        let url = endpoint(&self.base_url, path)?;
        let context = format!("yonsuite {path}");
        let envelope = send_json(&self.settings, &context, || {
            self.client
                .get(url.clone())
                .query(&[("access_token", access_token)])
                .query(params)
        })
        .await?;
        checked_data(&envelope)
    }
}

fn checked_data(envelope: &Value) -> Result<Value, ConnectorError> {
    if str_field(envelope, "code").as_deref() == Some(BUSINESS_OK) {
        Ok(envelope.get("data").cloned().unwrap_or(Value::Null))
    } else {
        Err(envelope_error(envelope))
    }
}

fn envelope_error(envelope: &Value) -> ConnectorError {
    let code = str_field(envelope, "code").unwrap_or_else(|| "missing".to_owned());
    let message = envelope
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    ConnectorError::api(VENDOR, code, message)
}

/// Whether a failed envelope only says the query matched nothing.
fn is_empty_result(envelope: &Value) -> bool {
    let message = envelope
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    EMPTY_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Rows of a list payload: either `data` itself or `data.recordList`.
fn list_rows(data: &Value) -> Vec<Value> {
    match data {
        Value::Array(rows) => rows.clone(),
        other => array_field(other, "recordList"),
    }
}

/// The root lookup answers with one object or a list; tag each as level 0.
fn root_units(data: Value) -> Vec<Value> {
    let roots = match data {
        Value::Array(rows) => rows,
        Value::Object(_) => vec![data],
        _ => Vec::new(),
    };
    roots
        .into_iter()
        .map(|mut root| {
            if let Value::Object(map) = &mut root {
                map.insert("level".to_owned(), Value::from(0));
            }
            root
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vietnamese_empty_message_is_recognised() {
        assert!(is_empty_result(&json!({
            "code": "999",
            "message": "Kết quả truy vấn rỗng"
        })));
        assert!(is_empty_result(&json!({ "code": "999", "message": "Query result is EMPTY" })));
        assert!(!is_empty_result(&json!({ "code": "999", "message": "token invalid" })));
    }

    #[test]
    fn list_rows_accepts_both_shapes() {
        assert_eq!(list_rows(&json!([{ "id": 1 }])).len(), 1);
        assert_eq!(list_rows(&json!({ "recordList": [{ "id": 1 }, { "id": 2 }] })).len(), 2);
        assert!(list_rows(&json!({ "pageCount": 0 })).is_empty());
    }

    #[test]
    fn root_units_are_tagged_level_zero() {
        let roots = root_units(json!({ "id": "root", "name": "Global" }));
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0]["level"], 0);
        assert!(root_units(Value::Null).is_empty());
    }

    #[test]
    fn business_code_must_be_200() {
        let err = checked_data(&json!({ "code": "310046", "message": "非法token" })).unwrap_err();
        assert!(matches!(err, ConnectorError::Api { ref code, .. } if code == "310046"));
        assert_eq!(checked_data(&json!({ "code": "200", "data": [] })).unwrap(), json!([]));
    }
}
