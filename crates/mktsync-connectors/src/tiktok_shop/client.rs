//! HTTP client for the TikTok Shop Partner API (`open-api.tiktokglobalshop.com`).
//!
//! Shop calls carry the token in `x-tts-access-token`, the shop cipher and a
//! signature in the query string, and answer with `{ code, message, data }`
//! where `code == 0` means success. Token calls go to the separate auth host
//! and are not signed.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::{Client, Method, Url};
use serde_json::{json, Value};

use crate::error::ConnectorError;
use crate::http::{build_client, endpoint, now_secs, parse_base_url, send_json, HttpSettings};
use crate::pagination::{Cursor, Page};
use crate::signing::{compact_json, tiktok_shop_sign};
use crate::{array_field, str_field, TokenGrant};

const DEFAULT_API_URL: &str = "https://open-api.tiktokglobalshop.com";
const DEFAULT_AUTH_URL: &str = "https://auth.tiktok-shops.com";
const VENDOR: &str = "tiktok_shop";
/// Used when the token response omits `access_token_expire_in`.
const DEFAULT_TOKEN_DAYS: i64 = 7;

/// Rows requested per search page.
pub const PAGE_SIZE: u32 = 100;
/// Maximum order ids accepted by the order detail endpoint.
pub const DETAIL_BATCH: usize = 50;
/// Rows requested per return or cancellation search page.
pub const AFTER_SALE_PAGE_SIZE: u32 = 50;

const LIVE_SESSIONS_PATH: &str = "/analytics/202508/shop_lives/performance";

/// Return and cancellation requests, searched the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterSale {
    Return,
    Cancellation,
}

impl AfterSale {
    fn path(self) -> &'static str {
        match self {
            AfterSale::Return => "/return_refund/202309/returns/search",
            AfterSale::Cancellation => "/return_refund/202309/cancellations/search",
        }
    }

    fn list_key(self) -> &'static str {
        match self {
            AfterSale::Return => "return_orders",
            AfterSale::Cancellation => "cancellations",
        }
    }
}

/// Shop analytics reports served as a ranked list plus a per-subject daily
/// breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopReport {
    Product,
    Sku,
    Video,
}

impl ShopReport {
    fn collection(self) -> &'static str {
        match self {
            ShopReport::Product => "/analytics/202405/shop_products",
            ShopReport::Sku => "/analytics/202406/shop_skus",
            ShopReport::Video => "/analytics/202409/shop_videos",
        }
    }

    fn list_key(self) -> &'static str {
        match self {
            ShopReport::Product => "products",
            ShopReport::Sku => "skus",
            ShopReport::Video => "videos",
        }
    }
}

/// Token and shop cipher for one authorised shop.
#[derive(Clone, PartialEq, Eq)]
pub struct ShopAccess {
    pub access_token: String,
    pub shop_cipher: String,
}

impl std::fmt::Debug for ShopAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopAccess")
            .field("access_token", &"[redacted]")
            .field("shop_cipher", &self.shop_cipher)
            .finish()
    }
}

/// Client for the TikTok Shop Partner API.
pub struct TiktokShopClient {
    client: Client,
    settings: HttpSettings,
    app_key: String,
    app_secret: String,
    api_url: Url,
    auth_url: Url,
}

impl TiktokShopClient {
    /// Creates a client pointed at the production API and auth hosts.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        app_key: &str,
        app_secret: &str,
        settings: HttpSettings,
    ) -> Result<Self, ConnectorError> {
        Self::with_urls(app_key, app_secret, settings, DEFAULT_API_URL, DEFAULT_AUTH_URL)
    }

    /// Creates a client whose API and auth calls both go to `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidBaseUrl`] if `base_url` is invalid.
    pub fn with_base_url(
        app_key: &str,
        app_secret: &str,
        settings: HttpSettings,
        base_url: &str,
    ) -> Result<Self, ConnectorError> {
        Self::with_urls(app_key, app_secret, settings, base_url, base_url)
    }

    fn with_urls(
        app_key: &str,
        app_secret: &str,
        settings: HttpSettings,
        api_url: &str,
        auth_url: &str,
    ) -> Result<Self, ConnectorError> {
        Ok(Self {
            client: build_client(&settings)?,
            settings,
            app_key: app_key.to_owned(),
            app_secret: app_secret.to_owned(),
            api_url: parse_base_url(api_url)?,
            auth_url: parse_base_url(auth_url)?,
        })
    }

    /// Exchanges an `auth_code` from the seller callback for tokens.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::Api`] if `code` is non-zero or `data` is missing.
    /// - [`ConnectorError::Http`] / [`ConnectorError::UnexpectedStatus`] on
    ///   transport failure.
    pub async fn get_token(&self, auth_code: &str) -> Result<TokenGrant, ConnectorError> {
        let params = [
            ("app_key", self.app_key.as_str()),
            ("app_secret", self.app_secret.as_str()),
            ("auth_code", auth_code),
            ("grant_type", "authorized_code"),
        ];
        let data = self.token_call("/api/v2/token/get", &params).await?;
        token_grant(data)
    }

    /// Exchanges a refresh token for a new pair; the old refresh token is
    /// kept when TikTok does not rotate it.
    ///
    /// # Errors
    ///
    /// As [`TiktokShopClient::get_token`].
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, ConnectorError> {
        let params = [
            ("app_key", self.app_key.as_str()),
            ("app_secret", self.app_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let data = self.token_call("/api/v2/token/refresh", &params).await?;
        let mut grant = token_grant(data)?;
        if grant.refresh_token.is_none() {
            grant.refresh_token = Some(refresh_token.to_owned());
        }
        Ok(grant)
    }

    /// Lists the shops authorised for `access_token`, each with its `cipher`.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::Api`] if `code` is non-zero.
    /// - [`ConnectorError::Http`] / [`ConnectorError::UnexpectedStatus`] on
    ///   transport failure.
    pub async fn get_authorized_shops(
        &self,
        access_token: &str,
    ) -> Result<Vec<Value>, ConnectorError> {
        let data = self
            .call(Method::GET, access_token, "/authorization/202309/shops", BTreeMap::new(), None)
            .await?;
        Ok(array_field(&data, "shops"))
    }

    /// Fetches one page of orders updated at or after `updated_since`,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// As [`TiktokShopClient::get_authorized_shops`].
    pub async fn search_orders(
        &self,
        access: &ShopAccess,
        updated_since: Option<DateTime<Utc>>,
        page_token: Option<&str>,
    ) -> Result<Page<Value>, ConnectorError> {
        let mut params = shop_params(access, page_token);
        params.insert("sort_order".to_owned(), "ASC".to_owned());
        params.insert("sort_field".to_owned(), "update_time".to_owned());
        let body = updated_since.map(|since| json!({ "update_time_ge": since.timestamp() }));

        let data = self
            .call(
                Method::POST,
                &access.access_token,
                "/order/202309/orders/search",
                params,
                body.as_ref(),
            )
            .await?;
        Ok(token_page(&data, "orders"))
    }

    /// Fetches full order documents (with `line_items`) for up to
    /// [`DETAIL_BATCH`] ids.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidRequest`] for an oversized batch,
    /// otherwise as [`TiktokShopClient::get_authorized_shops`].
    pub async fn get_order_details(
        &self,
        access: &ShopAccess,
        order_ids: &[String],
    ) -> Result<Vec<Value>, ConnectorError> {
        if order_ids.len() > DETAIL_BATCH {
            return Err(ConnectorError::InvalidRequest(format!(
                "TikTok Shop accepts at most {DETAIL_BATCH} order ids per detail call, got {}",
                order_ids.len()
            )));
        }
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut params = shop_params(access, None);
        params.remove("page_size");
        params.insert("ids".to_owned(), order_ids.join(","));

        let data = self
            .call(Method::GET, &access.access_token, "/order/202507/orders", params, None)
            .await?;
        Ok(array_field(&data, "orders"))
    }

    /// Fetches one page of product summaries updated at or after `updated_since`.
    ///
    /// # Errors
    ///
    /// As [`TiktokShopClient::get_authorized_shops`].
    pub async fn search_products(
        &self,
        access: &ShopAccess,
        updated_since: Option<DateTime<Utc>>,
        page_token: Option<&str>,
    ) -> Result<Page<Value>, ConnectorError> {
        let params = shop_params(access, page_token);
        let body = updated_since.map(|since| json!({ "update_time_ge": since.timestamp() }));
        let data = self
            .call(
                Method::POST,
                &access.access_token,
                "/product/202309/products/search",
                params,
                body.as_ref(),
            )
            .await?;
        Ok(token_page(&data, "products"))
    }

    /// Fetches the full product document, `skus` included.
    ///
    /// # Errors
    ///
    /// As [`TiktokShopClient::get_authorized_shops`].
    pub async fn get_product(
        &self,
        access: &ShopAccess,
        product_id: &str,
    ) -> Result<Value, ConnectorError> {
        let params = BTreeMap::from([("shop_cipher".to_owned(), access.shop_cipher.clone())]);
        let path = format!("/product/202309/products/{product_id}");
        self.call(Method::GET, &access.access_token, &path, params, None)
            .await
    }

    /// Lists the shop's warehouses in one call.
    ///
    /// # Errors
    ///
    /// As [`TiktokShopClient::get_authorized_shops`].
    pub async fn get_warehouses(&self, access: &ShopAccess) -> Result<Vec<Value>, ConnectorError> {
        let params = BTreeMap::from([("shop_cipher".to_owned(), access.shop_cipher.clone())]);
        let data = self
            .call(Method::GET, &access.access_token, "/logistics/202309/warehouses", params, None)
            .await?;
        Ok(array_field(&data, "warehouses"))
    }

    /// Fetches one page of returns or cancellations updated at or after
    /// `updated_since`, oldest update first.
    ///
    /// # Errors
    ///
    /// As [`TiktokShopClient::get_authorized_shops`].
    pub async fn search_after_sales(
        &self,
        access: &ShopAccess,
        kind: AfterSale,
        updated_since: Option<DateTime<Utc>>,
        page_token: Option<&str>,
    ) -> Result<Page<Value>, ConnectorError> {
        let mut params = shop_params(access, page_token);
        params.insert("page_size".to_owned(), AFTER_SALE_PAGE_SIZE.to_string());
        params.insert("sort_field".to_owned(), "update_time".to_owned());
        params.insert("sort_order".to_owned(), "ASC".to_owned());
        let body = updated_since.map(|since| json!({ "update_time_ge": since.timestamp() }));

        let data = self
            .call(Method::POST, &access.access_token, kind.path(), params, body.as_ref())
            .await?;
        Ok(token_page(&data, kind.list_key()))
    }

    /// Fetches one page of `report` subjects with activity in
    /// `[start, end)`, highest GMV first.
    ///
    /// # Errors
    ///
    /// As [`TiktokShopClient::get_authorized_shops`].
    pub async fn list_report(
        &self,
        access: &ShopAccess,
        report: ShopReport,
        start: NaiveDate,
        end: NaiveDate,
        page_token: Option<&str>,
    ) -> Result<Page<Value>, ConnectorError> {
        let mut params = ranked_params(access, start, end, page_token);
        if report == ShopReport::Video {
            params.insert("account_type".to_owned(), "ALL".to_owned());
        }
        let path = format!("{}/performance", report.collection());
        let data = self
            .call(Method::GET, &access.access_token, &path, params, None)
            .await?;
        Ok(token_page(&data, report.list_key()))
    }

    /// Fetches the daily `performance.intervals` of one report subject over
    /// `[start, end)`.
    ///
    /// # Errors
    ///
    /// As [`TiktokShopClient::get_authorized_shops`].
    pub async fn get_report(
        &self,
        access: &ShopAccess,
        report: ShopReport,
        subject_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value, ConnectorError> {
        let mut params = report_params(access, start, end);
        params.insert("granularity".to_owned(), "1D".to_owned());
        if report == ShopReport::Video {
            params.insert("with_comparison".to_owned(), "false".to_owned());
        }
        let path = format!("{}/{subject_id}/performance", report.collection());
        self.call(Method::GET, &access.access_token, &path, params, None)
            .await
    }

    /// Fetches one page of LIVE sessions that ran in `[start, end)`, each
    /// with its sales and interaction totals.
    ///
    /// # Errors
    ///
    /// As [`TiktokShopClient::get_authorized_shops`].
    pub async fn list_live_sessions(
        &self,
        access: &ShopAccess,
        start: NaiveDate,
        end: NaiveDate,
        page_token: Option<&str>,
    ) -> Result<Page<Value>, ConnectorError> {
        let mut params = ranked_params(access, start, end, page_token);
        params.insert("account_type".to_owned(), "ALL".to_owned());
        let data = self
            .call(Method::GET, &access.access_token, LIVE_SESSIONS_PATH, params, None)
            .await?;
        Ok(token_page(&data, "live_stream_sessions"))
    }

    /// Builds the seller authorisation URL for a Partner Center `service_id`.
    ///
    /// Sellers registered in the US use a separate services host.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidBaseUrl`] if the services host cannot
    /// be parsed.
    pub fn authorization_url(
        service_id: &str,
        state: &str,
        region: &str,
    ) -> Result<String, ConnectorError> {
        let host = if region.eq_ignore_ascii_case("us") {
            "services.us.tiktokshop.com"
        } else {
            "services.tiktokshop.com"
        };
        let raw = format!("https://{host}/open/authorize");
        let mut url = Url::parse(&raw).map_err(|e| ConnectorError::InvalidBaseUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("service_id", service_id)
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Signs and sends a shop API call, returning the checked `data` object.
    async fn call(
        &self,
        method: Method,
        access_token: &str,
        path: &str,
        mut params: BTreeMap<String, String>,
        body: Option<&Value>,
    ) -> Result<Value, ConnectorError> {
        let body = body.map(compact_json).transpose()?;
        params.insert("app_key".to_owned(), self.app_key.clone());
        params.insert("timestamp".to_owned(), now_secs().to_string());
        let sign = tiktok_shop_sign(&self.app_secret, path, &params, body.as_deref())?;
        params.insert("sign".to_owned(), sign);

        let url = endpoint(&self.api_url, path)?;
        let context = format!("tiktok_shop {path}");

        let envelope = send_json(&self.settings, &context, || {
            let request = self
                .client
                .request(method.clone(), url.clone())
                .query(&params)
                .header("x-tts-access-token", access_token)
                .header("Content-Type", "application/json");
            match &body {
                Some(body) => request.body(body.clone()),
                None => request,
            }
        })
        .await?;

        check_code(&envelope)?;
        Ok(envelope.get("data").cloned().unwrap_or(Value::Null))
    }

    async fn token_call(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, ConnectorError> {
        let url = endpoint(&self.auth_url, path)?;
        let context = format!("tiktok_shop {path}");
        let envelope = send_json(&self.settings, &context, || {
            self.client.get(url.clone()).query(params)
        })
        .await?;
        check_code(&envelope)?;
        match envelope.get("data") {
            Some(data @ Value::Object(map)) if !map.is_empty() => Ok(data.clone()),
            _ => Err(ConnectorError::api(VENDOR, "no_data", "token response has no data")),
        }
    }
}

fn shop_params(access: &ShopAccess, page_token: Option<&str>) -> BTreeMap<String, String> {
    let mut params = BTreeMap::from([
        ("shop_cipher".to_owned(), access.shop_cipher.clone()),
        ("page_size".to_owned(), PAGE_SIZE.to_string()),
    ]);
    if let Some(token) = page_token.filter(|t| !t.is_empty()) {
        params.insert("page_token".to_owned(), token.to_owned());
    }
    params
}

/// Shop cipher, local currency and the `[start, end)` day range every
/// analytics call takes.
fn report_params(
    access: &ShopAccess,
    start: NaiveDate,
    end: NaiveDate,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("shop_cipher".to_owned(), access.shop_cipher.clone()),
        ("start_date_ge".to_owned(), start.format("%Y-%m-%d").to_string()),
        ("end_date_lt".to_owned(), end.format("%Y-%m-%d").to_string()),
        ("currency".to_owned(), "LOCAL".to_owned()),
    ])
}

fn ranked_params(
    access: &ShopAccess,
    start: NaiveDate,
    end: NaiveDate,
    page_token: Option<&str>,
) -> BTreeMap<String, String> {
    let mut params = report_params(access, start, end);
    params.extend(shop_params(access, page_token));
    params.insert("sort_field".to_owned(), "gmv".to_owned());
    params.insert("sort_order".to_owned(), "DESC".to_owned());
    params
}

fn check_code(envelope: &Value) -> Result<(), ConnectorError> {
    let code = envelope.get("code").and_then(mktsync_core::mapping::value_as_i64);
    if code == Some(0) {
        return Ok(());
    }
    let message = envelope
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Err(ConnectorError::api(
        VENDOR,
        code.map_or_else(|| "missing".to_owned(), |c| c.to_string()),
        message,
    ))
}

/// Items under `key` plus `next_page_token`; an empty page ends the walk.
fn token_page(data: &Value, key: &str) -> Page<Value> {
    let items = array_field(data, key);
    let next = str_field(data, "next_page_token")
        .filter(|token| !token.is_empty() && !items.is_empty())
        .map(Cursor::Token);
    Page::new(items, next)
}

fn token_grant(data: Value) -> Result<TokenGrant, ConnectorError> {
    let access_token = str_field(&data, "access_token").ok_or_else(|| {
        ConnectorError::api(VENDOR, "missing_token", "token response has no access_token")
    })?;
    let epoch = |key: &str| data.get(key).and_then(mktsync_core::mapping::unix_seconds);
    let expires_at = epoch("access_token_expire_in")
        .unwrap_or_else(|| Utc::now() + Duration::days(DEFAULT_TOKEN_DAYS));
    let refresh_expires_at = epoch("refresh_token_expire_in");

    Ok(TokenGrant {
        access_token,
        refresh_token: str_field(&data, "refresh_token"),
        expires_at: Some(expires_at),
        refresh_expires_at,
        external_ref: str_field(&data, "open_id"),
        account_name: str_field(&data, "seller_name"),
        raw: data,
    })
}
