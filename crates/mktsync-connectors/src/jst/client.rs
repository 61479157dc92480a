//! HTTP client for the JST ERP open API.
//!
//! Every call is a signed POST of a compact JSON body. The envelope carries
//! `success`, `message`, `data`, and for list endpoints a top-level
//! `dataPage { isLast, pageIndex }`.

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde_json::{json, Value};

use crate::error::ConnectorError;
use crate::http::{
    build_client, endpoint, now_millis, now_secs, parse_base_url, send_json, HttpSettings,
};
use crate::pagination::{Cursor, Page};
use crate::signing::{compact_json, jst_auth_sign, jst_sign, jst_token_sign};
use crate::{str_field, TokenGrant};

const DEFAULT_BASE_URL: &str = "https://asiaopenapi.jsterp.com/";
const DEFAULT_AUTH_URL: &str = "https://asia.jsterp.com/account/companyauth/auth";
const VENDOR: &str = "jst";

/// Rows requested per list page.
pub const PAGE_SIZE: u32 = 500;
/// Maximum ids accepted by the detail endpoints.
pub const DETAIL_BATCH: usize = 200;

/// Per-company credentials obtained through the JST authorisation flow.
#[derive(Clone, PartialEq, Eq)]
pub struct JstAccess {
    pub access_token: String,
    pub company_id: String,
}

impl std::fmt::Debug for JstAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JstAccess")
            .field("access_token", &"[redacted]")
            .field("company_id", &self.company_id)
            .finish()
    }
}

/// Which order timestamp a `GetOrders` window filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTimeField {
    Modified,
    OrderTime,
    SendTime,
}

impl OrderTimeField {
    fn keys(self) -> (&'static str, &'static str) {
        match self {
            OrderTimeField::Modified => ("modifiedBegin", "modifiedEnd"),
            OrderTimeField::OrderTime => ("orderTimeBegin", "orderTimeEnd"),
            OrderTimeField::SendTime => ("sendTimeBegin", "sendTimeEnd"),
        }
    }
}

/// Which inout timestamp a `GetSaleInouts` window filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InoutTimeField {
    Created,
    SendTime,
}

impl InoutTimeField {
    fn keys(self) -> (&'static str, &'static str) {
        match self {
            InoutTimeField::Created => ("CreateBegin", "CreateEnd"),
            InoutTimeField::SendTime => ("SendTimeBegin", "SendTimeEnd"),
        }
    }
}

/// Client for the JST ERP open API.
///
/// One instance serves every authorised company: the app key and secret are
/// shared, the per-company token travels in [`JstAccess`].
pub struct JstClient {
    client: Client,
    settings: HttpSettings,
    app_key: String,
    app_secret: String,
    base_url: Url,
    auth_url: String,
}

impl JstClient {
    /// Creates a client pointed at the production JST API.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        app_key: &str,
        app_secret: &str,
        settings: HttpSettings,
    ) -> Result<Self, ConnectorError> {
        Self::with_base_url(app_key, app_secret, settings, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ConnectorError::InvalidBaseUrl`] if `base_url` is invalid.
    pub fn with_base_url(
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
            auth_url: DEFAULT_AUTH_URL.to_owned(),
        })
    }

    /// Fetches one page of order ids changed inside `[begin, end]`.
    ///
    /// Items are the list rows as returned; callers collect `orderId`s and
    /// resolve them through [`JstClient::get_order_details`].
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::Api`] if the envelope reports `success: false`.
    /// - [`ConnectorError::UnexpectedStatus`] on a non-200 response.
    /// - [`ConnectorError::Http`] on network failure.
    pub async fn get_orders(
        &self,
        access: &JstAccess,
        field: OrderTimeField,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        page_index: u32,
    ) -> Result<Page<Value>, ConnectorError> {
        let (begin_key, end_key) = field.keys();
        let body = json!({
            "requestModel": { begin_key: begin.timestamp(), end_key: end.timestamp() },
            "dataPage": { "pageSize": PAGE_SIZE, "pageIndex": page_index },
        });
        self.list_page(access, "/api/Order/GetOrders", &body, page_index)
            .await
    }

    /// Fetches full order documents, lines included under `orderItems`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidRequest`] for more than
    /// [`DETAIL_BATCH`] ids, otherwise as [`JstClient::get_orders`].
    pub async fn get_order_details(
        &self,
        access: &JstAccess,
        order_ids: &[i64],
    ) -> Result<Vec<Value>, ConnectorError> {
        check_batch(order_ids.len())?;
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({ "orderIds": order_ids });
        let envelope = self
            .call(access, "/api/Order/GetOrderDetailByIds", &body)
            .await?;
        Ok(data_rows(&envelope))
    }

    /// Fetches one page of shops modified inside `[begin, end]`.
    ///
    /// # Errors
    ///
    /// As [`JstClient::get_orders`].
    pub async fn get_shops(
        &self,
        access: &JstAccess,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        page_index: u32,
    ) -> Result<Page<Value>, ConnectorError> {
        let body = json!({
            "requestModel": { "modifiedBegin": begin.timestamp(), "modifiedEnd": end.timestamp() },
            "dataPage": { "pageSize": PAGE_SIZE, "pageIndex": page_index },
        });
        self.list_page(access, "/api/Shop/GetShops", &body, page_index)
            .await
    }

    /// Fetches every warehouse of the company in one call.
    ///
    /// # Errors
    ///
    /// As [`JstClient::get_orders`].
    pub async fn get_warehouses(&self, access: &JstAccess) -> Result<Vec<Value>, ConnectorError> {
        let envelope = self
            .call(access, "/api/Warehouse/GetWarehouses", &json!({}))
            .await?;
        Ok(data_rows(&envelope))
    }

    /// Fetches one page of sale inouts (delivery notes) inside `[begin, end]`.
    ///
    /// # Errors
    ///
    /// As [`JstClient::get_orders`].
    pub async fn get_inouts(
        &self,
        access: &JstAccess,
        field: InoutTimeField,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        page_index: u32,
    ) -> Result<Page<Value>, ConnectorError> {
        let (begin_key, end_key) = field.keys();
        let body = json!({
            "requestModel": { begin_key: begin.timestamp(), end_key: end.timestamp() },
            "dataPage": { "pageSize": PAGE_SIZE, "pageIndex": page_index },
        });
        self.list_page(access, "/api/SaleInout/GetSaleInouts", &body, page_index)
            .await
    }

    /// Fetches inout documents with their `itemDetails`.
    ///
    /// # Errors
    ///
    /// As [`JstClient::get_order_details`].
    pub async fn get_inout_items(
        &self,
        access: &JstAccess,
        inout_ids: &[i64],
    ) -> Result<Vec<Value>, ConnectorError> {
        check_batch(inout_ids.len())?;
        if inout_ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({ "inoutIds": inout_ids });
        let envelope = self.call(access, "/api/Order/GetInoutItems", &body).await?;
        Ok(data_rows(&envelope))
    }

    /// Exchanges an authorisation code for a company access token.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::Api`] if JST rejects the code.
    /// - [`ConnectorError::Http`] / [`ConnectorError::UnexpectedStatus`] on
    ///   transport failure.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ConnectorError> {
        let body = compact_json(&json!({ "Code": code }))?;
        let url = endpoint(&self.base_url, "/api/Authentication/GetToken")?;
        let context = "jst GetToken";

        let envelope = send_json(&self.settings, context, || {
            let ts = now_millis();
            let sign = jst_token_sign(&self.app_key, &self.app_secret, &body, ts);
            self.client
                .post(url.clone())
                .header("appkey", &self.app_key)
                .header("sign", sign)
                .header("ts", ts.to_string())
                .header("Content-Type", "application/json")
                .body(body.clone())
        })
        .await?;
        check_success(&envelope)?;

        let data = envelope.get("data").cloned().unwrap_or(Value::Null);
        let access_token = str_field(&data, "accessToken").ok_or_else(|| {
            ConnectorError::api(VENDOR, "missing_token", "GetToken returned no accessToken")
        })?;

        tracing::info!(company_id = ?str_field(&data, "companyId"), "JST company authorised");

        Ok(TokenGrant {
            access_token,
            refresh_token: str_field(&data, "refreshToken"),
            expires_at: expiry(&data, "expiredTime"),
            refresh_expires_at: expiry(&data, "refreshTokenExpireTime"),
            external_ref: str_field(&data, "companyId"),
            account_name: str_field(&data, "companyName"),
            raw: data,
        })
    }

    /// Builds the company authorisation URL a JST administrator must visit.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidBaseUrl`] if the authorisation host is
    /// not a valid URL.
    pub fn authorization_url(
        &self,
        state: &str,
        redirect_uri: &str,
    ) -> Result<String, ConnectorError> {
        let timestamp = now_secs();
        let sign = jst_auth_sign(&self.app_key, &self.app_secret, state, timestamp);
        let mut url = Url::parse(&self.auth_url).map_err(|e| ConnectorError::InvalidBaseUrl {
            url: self.auth_url.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("appkey", &self.app_key)
            .append_pair("timestamp", &timestamp.to_string())
            .append_pair("state", state)
            .append_pair("sign", &sign)
            .append_pair("redirect_uri", redirect_uri);
        Ok(url.into())
    }

    async fn list_page(
        &self,
        access: &JstAccess,
        path: &str,
        body: &Value,
        page_index: u32,
    ) -> Result<Page<Value>, ConnectorError> {
        let envelope = self.call(access, path, body).await?;
        let rows = data_rows(&envelope);
        let next = next_page(&envelope, page_index, rows.len());
        tracing::debug!(
            path,
            page_index,
            rows = rows.len(),
            has_next = next.is_some(),
            "JST page fetched"
        );
        Ok(Page::new(rows, next))
    }

    /// Signs and posts `body` to `path`, returning the checked envelope.
    async fn call(
        &self,
        access: &JstAccess,
        path: &str,
        body: &Value,
    ) -> Result<Value, ConnectorError> {
        let body = compact_json(body)?;
        let url = endpoint(&self.base_url, path)?;
        let context = format!("jst {path}");

        let envelope = send_json(&self.settings, &context, || {
            let ts = now_millis();
            let sign = jst_sign(
                &self.app_key,
                &self.app_secret,
                &body,
                &access.access_token,
                &access.company_id,
                ts,
            );
            self.client
                .post(url.clone())
                .header("appkey", &self.app_key)
                .header("accesstoken", &access.access_token)
                .header("CompanyId", &access.company_id)
                .header("sign", sign)
                .header("ts", ts.to_string())
                .header("Content-Type", "application/json")
                .body(body.clone())
        })
        .await?;

        check_success(&envelope)?;
        Ok(envelope)
    }
}

fn check_batch(len: usize) -> Result<(), ConnectorError> {
    if len > DETAIL_BATCH {
        return Err(ConnectorError::InvalidRequest(format!(
            "JST detail calls accept at most {DETAIL_BATCH} ids, got {len}"
        )));
    }
    Ok(())
}

fn check_success(envelope: &Value) -> Result<(), ConnectorError> {
    if envelope.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }
    let code = str_field(envelope, "code").unwrap_or_else(|| "unsuccessful".to_owned());
    let message = envelope
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Err(ConnectorError::api(VENDOR, code, message))
}

fn data_rows(envelope: &Value) -> Vec<Value> {
    match envelope.get("data") {
        Some(Value::Array(rows)) => rows.clone(),
        _ => Vec::new(),
    }
}

/// Next page from `dataPage`; a missing `isLast` means last page.
fn next_page(envelope: &Value, requested: u32, returned: usize) -> Option<Cursor> {
    if returned == 0 {
        return None;
    }
    let data_page = envelope.get("dataPage")?;
    let is_last = data_page.get("isLast").and_then(Value::as_bool).unwrap_or(true);
    if is_last {
        return None;
    }
    let current = data_page
        .get("pageIndex")
        .and_then(Value::as_u64)
        .and_then(|p| u32::try_from(p).ok())
        .unwrap_or(requested);
    Some(Cursor::Index(current + 1))
}

fn expiry(data: &Value, key: &str) -> Option<DateTime<Utc>> {
    data.get(key)
        .and_then(Value::as_str)
        .and_then(mktsync_core::mapping::parse_iso_datetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> JstClient {
        JstClient::with_base_url(
            "key123",
            "secret456",
            HttpSettings::for_tests(),
            "http://localhost",
        )
            .expect("client construction should not fail")
    }

    #[test]
    fn next_page_follows_data_page() {
        let envelope = json!({
            "success": true,
            "data": [{}],
            "dataPage": { "isLast": false, "pageIndex": 3 }
        });
        assert_eq!(next_page(&envelope, 3, 1), Some(Cursor::Index(4)));
    }

    #[test]
    fn missing_is_last_means_last_page() {
        let envelope = json!({ "success": true, "data": [{}], "dataPage": { "pageIndex": 1 } });
        assert_eq!(next_page(&envelope, 1, 1), None);
    }

    #[test]
    fn empty_page_stops_even_if_not_last() {
        let envelope = json!({
            "success": true,
            "data": [],
            "dataPage": { "isLast": false, "pageIndex": 2 }
        });
        assert_eq!(next_page(&envelope, 2, 0), None);
    }

    #[test]
    fn unsuccessful_envelope_becomes_api_error() {
        let envelope = json!({ "success": false, "code": 401, "message": "token expired" });
        let err = check_success(&envelope)
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::Api { vendor: "jst", ref code, ref message }
                if code == "401" && message == "token expired"
        ));
    }

    #[test]
    fn detail_batch_over_limit_is_rejected() {
        assert!(check_batch(DETAIL_BATCH).is_ok());
        assert!(matches!(check_batch(DETAIL_BATCH + 1), Err(ConnectorError::InvalidRequest(_))));
    }

    #[test]
    fn token_expiry_honours_offset() {
        let data = json!({ "expiredTime": "2025-01-01T08:00:00+08:00" });
        assert_eq!(
            expiry(&data, "expiredTime").map(|d| d.to_rfc3339()),
            Some("2025-01-01T00:00:00+00:00".to_owned())
        );
    }

    #[test]
    fn authorization_url_carries_signed_params() {
        let url = test_client()
            .authorization_url("mktsync", "https://sync.example.com/oauth/jst/callback")
            .unwrap();
        assert!(url.starts_with("https://asia.jsterp.com/account/companyauth/auth?appkey=key123"));
        assert!(url.contains("state=mktsync"));
        assert!(
            url.contains("redirect_uri=https%3A%2F%2Fsync.example.com%2Foauth%2Fjst%2Fcallback")
        );
        let sign = Url::parse(&url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "sign")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(sign.len(), 32);
        assert_eq!(sign, sign.to_uppercase());
    }

    #[test]
    fn access_debug_redacts_token() {
        let access = JstAccess {
            access_token: "tok-secret".to_owned(),
            company_id: "10001".to_owned(),
        };
        let rendered = format!("{access:?}");
        assert!(!rendered.contains("tok-secret"));
        assert!(rendered.contains("10001"));
    }
}
