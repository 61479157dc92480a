//! HTTP client for the Lazada Open Platform.
//!
//! Requests carry their parameters in the query string (or form body for
//! token calls) together with `app_key`, a millisecond `timestamp`,
//! `sign_method=sha256` and the HMAC `sign`. The API path used for signing
//! never includes the `/rest` prefix of the host URL.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::{Client, Method, Url};
use serde_json::Value;

use crate::error::ConnectorError;
use crate::http::{build_client, endpoint, now_millis, parse_base_url, send_json, HttpSettings};
use crate::pagination::{next_offset, Cursor, Page};
use crate::signing::lazada_sign;
use crate::{array_field, str_field, TokenGrant};

const VENDOR: &str = "lazada";

/// Maximum `limit` accepted by `/orders/get`.
pub const ORDERS_LIMIT: u32 = 50;
pub const PRODUCTS_LIMIT: u32 = 50;
/// Maximum order ids per `/orders/items/get` call.
pub const ITEMS_BATCH: usize = 10;

const DEFAULT_EXPIRES_IN: i64 = 3_600;

/// Regional hosts for one Lazada venture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LazadaEndpoints {
    pub api_url: String,
    /// Token host, e.g. `https://auth.lazada.com/rest`.
    pub auth_rest_url: String,
    pub authorize_url: String,
}

impl LazadaEndpoints {
    /// Endpoints for a venture country code; unknown codes fall back to VN.
    #[must_use]
    pub fn for_country(country_code: &str) -> Self {
        let (api, auth_host) = match country_code.trim().to_ascii_uppercase().as_str() {
            "SG" => ("https://api.lazada.sg/rest", "https://auth.lazada.com"),
            "MY" => ("https://api.lazada.com.my/rest", "https://auth.lazada.com.my"),
            "TH" => ("https://api.lazada.co.th/rest", "https://auth.lazada.co.th"),
            "PH" => ("https://api.lazada.com.ph/rest", "https://auth.lazada.com.ph"),
            "ID" => ("https://api.lazada.co.id/rest", "https://auth.lazada.co.id"),
            _ => ("https://api.lazada.vn/rest", "https://auth.lazada.com"),
        };
        Self {
            api_url: api.to_owned(),
            auth_rest_url: format!("{auth_host}/rest"),
            authorize_url: format!("{auth_host}/oauth/authorize"),
        }
    }
}

/// Client for one Lazada app. Seller tokens are passed per call.
pub struct LazadaClient {
    client: Client,
    settings: HttpSettings,
    app_key: String,
    app_secret: String,
    api_url: Url,
    auth_rest_url: Url,
    authorize_url: String,
}

impl LazadaClient {
    /// Creates a client for the venture identified by `country_code`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        app_key: &str,
        app_secret: &str,
        country_code: &str,
        settings: HttpSettings,
    ) -> Result<Self, ConnectorError> {
        let endpoints = LazadaEndpoints::for_country(country_code);
        Self::with_endpoints(app_key, app_secret, settings, &endpoints)
    }

    /// Creates a client with custom hosts (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ConnectorError::InvalidBaseUrl`] for an invalid host.
    pub fn with_endpoints(
        app_key: &str,
        app_secret: &str,
        settings: HttpSettings,
        endpoints: &LazadaEndpoints,
    ) -> Result<Self, ConnectorError> {
        Ok(Self {
            client: build_client(&settings)?,
            settings,
            // Keys copied from the seller centre sometimes keep a leading '+'.
            app_key: app_key.trim().trim_start_matches('+').to_owned(),
            app_secret: app_secret.trim().to_owned(),
            api_url: parse_base_url(&endpoints.api_url)?,
            auth_rest_url: parse_base_url(&endpoints.auth_rest_url)?,
            authorize_url: endpoints.authorize_url.clone(),
        })
    }

    /// Convenience for tests: API and token calls both served by `base_url`.
    ///
    /// # Errors
    ///
    /// As [`LazadaClient::with_endpoints`].
    pub fn with_base_url(
        app_key: &str,
        app_secret: &str,
        settings: HttpSettings,
        base_url: &str,
    ) -> Result<Self, ConnectorError> {
        let endpoints = LazadaEndpoints {
            api_url: base_url.to_owned(),
            auth_rest_url: base_url.to_owned(),
            authorize_url: format!("{}/oauth/authorize", base_url.trim_end_matches('/')),
        };
        Self::with_endpoints(app_key, app_secret, settings, &endpoints)
    }

    /// Fetches one page of orders updated after `update_after`, oldest
    /// update first.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::Api`] if the response `code` is not `"0"`.
    /// - [`ConnectorError::UnexpectedStatus`] / [`ConnectorError::Http`] on
    ///   transport failure.
    pub async fn get_orders(
        &self,
        access_token: &str,
        update_after: DateTime<Utc>,
        offset: u32,
    ) -> Result<Page<Value>, ConnectorError> {
        let params = BTreeMap::from([
            ("limit".to_owned(), ORDERS_LIMIT.to_string()),
            ("offset".to_owned(), offset.to_string()),
            (
                "update_after".to_owned(),
                update_after.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("sort_by".to_owned(), "updated_at".to_owned()),
            ("sort_direction".to_owned(), "ASC".to_owned()),
        ]);
        let body = self.api(access_token, "/orders/get", params).await?;
        let data = body.get("data").cloned().unwrap_or(Value::Null);
        let orders = array_field(&data, "orders");
        let total = data.get("countTotal").and_then(count);
        let next = next_offset(offset, ORDERS_LIMIT, orders.len(), total);
        Ok(Page::new(orders, next))
    }

    /// Fetches items for up to [`ITEMS_BATCH`] orders.
    ///
    /// Returns the raw `data` entries, each `{ order_id, order_items }`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidRequest`] for an oversized batch,
    /// otherwise as [`LazadaClient::get_orders`].
    pub async fn get_order_items(
        &self,
        access_token: &str,
        order_ids: &[String],
    ) -> Result<Vec<Value>, ConnectorError> {
        if order_ids.len() > ITEMS_BATCH {
            return Err(ConnectorError::InvalidRequest(format!(
                "Lazada accepts at most {ITEMS_BATCH} order ids per items call, got {}",
                order_ids.len()
            )));
        }
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = BTreeMap::from([(
            "order_ids".to_owned(),
            format!("[{}]", order_ids.join(",")),
        )]);
        let body = self.api(access_token, "/orders/items/get", params).await?;
        Ok(array_field(&body, "data"))
    }

    /// Fetches one page of products (all statuses).
    ///
    /// # Errors
    ///
    /// As [`LazadaClient::get_orders`].
    pub async fn get_products(
        &self,
        access_token: &str,
        offset: u32,
    ) -> Result<Page<Value>, ConnectorError> {
        let params = BTreeMap::from([
            ("filter".to_owned(), "all".to_owned()),
            ("offset".to_owned(), offset.to_string()),
            ("limit".to_owned(), PRODUCTS_LIMIT.to_string()),
        ]);
        let body = self.api(access_token, "/products/get", params).await?;
        let data = body.get("data").cloned().unwrap_or(Value::Null);
        let products = array_field(&data, "products");
        let total = data.get("total_products").and_then(count);
        let next = next_offset(offset, PRODUCTS_LIMIT, products.len(), total);
        Ok(Page::new(products, next))
    }

    /// Fetches the full product document for `item_id`.
    ///
    /// # Errors
    ///
    /// As [`LazadaClient::get_orders`].
    pub async fn get_product(
        &self,
        access_token: &str,
        item_id: &str,
    ) -> Result<Value, ConnectorError> {
        let params = BTreeMap::from([("item_id".to_owned(), item_id.to_owned())]);
        let body = self.api(access_token, "/product/item/get", params).await?;
        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    /// Fetches one page of fulfilment warehouses for a country.
    ///
    /// # Errors
    ///
    /// As [`LazadaClient::get_orders`].
    pub async fn get_warehouses(
        &self,
        access_token: &str,
        country_code: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Value>, ConnectorError> {
        let params = BTreeMap::from([
            ("country_code".to_owned(), country_code.to_owned()),
            ("page".to_owned(), page.to_string()),
            ("per_page".to_owned(), per_page.to_string()),
        ]);
        let body = self.api(access_token, "/fbl/warehouses/get", params).await?;
        let rows = array_field(&body, "data");
        let total_pages = body.get("total_page").and_then(count);
        let next = crate::pagination::next_index(page, total_pages, rows.len(), per_page);
        Ok(Page::new(rows, next))
    }

    /// Fetches one page of sponsored-solutions campaigns.
    ///
    /// # Errors
    ///
    /// As [`LazadaClient::get_orders`].
    pub async fn search_campaigns(
        &self,
        access_token: &str,
        biz_code: &str,
        page_no: u32,
        page_size: u32,
        date_range: Option<(&str, &str)>,
    ) -> Result<Page<Value>, ConnectorError> {
        let mut params = BTreeMap::from([
            ("bizCode".to_owned(), biz_code.to_owned()),
            ("pageNo".to_owned(), page_no.to_string()),
            ("pageSize".to_owned(), page_size.to_string()),
        ]);
        if let Some((start, end)) = date_range {
            params.insert("startDate".to_owned(), start.to_owned());
            params.insert("endDate".to_owned(), end.to_owned());
        }
        let body = self
            .api(access_token, "/sponsor/solutions/campaign/searchCampaignList", params)
            .await?;
        let items = array_field(&body, "result");
        let total = body.get("totalCount").and_then(count);
        let covered = u64::from(page_no) * u64::from(page_size);
        let next = match total {
            _ if items.is_empty() => None,
            Some(total) if covered >= total => None,
            _ => Some(Cursor::Index(page_no + 1)),
        };
        Ok(Page::new(items, next))
    }

    /// Fetches campaign detail; `None` when Lazada returns no result.
    ///
    /// # Errors
    ///
    /// As [`LazadaClient::get_orders`].
    pub async fn get_campaign(
        &self,
        access_token: &str,
        biz_code: &str,
        campaign_id: &str,
    ) -> Result<Option<Value>, ConnectorError> {
        let params = BTreeMap::from([
            ("campaignId".to_owned(), campaign_id.to_owned()),
            ("bizCode".to_owned(), biz_code.to_owned()),
        ]);
        let body = self
            .api(access_token, "/sponsor/solutions/campaign/getCampaign", params)
            .await?;
        Ok(body.get("result").filter(|r| !r.is_null()).cloned())
    }

    /// Exchanges an authorisation `code` for seller tokens.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::Api`] if Lazada rejects the code.
    /// - [`ConnectorError::Http`] / [`ConnectorError::UnexpectedStatus`] on
    ///   transport failure.
    pub async fn create_token(&self, code: &str) -> Result<TokenGrant, ConnectorError> {
        let params = BTreeMap::from([("code".to_owned(), code.to_owned())]);
        let body = self
            .signed(&self.auth_rest_url, Method::POST, None, "/auth/token/create", params)
            .await?;
        token_grant(body)
    }

    /// Exchanges a refresh token for a new token pair.
    ///
    /// # Errors
    ///
    /// As [`LazadaClient::create_token`].
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, ConnectorError> {
        let params = BTreeMap::from([("refresh_token".to_owned(), refresh_token.to_owned())]);
        let body = self
            .signed(&self.auth_rest_url, Method::POST, None, "/auth/token/refresh", params)
            .await?;
        let mut grant = token_grant(body)?;
        if grant.refresh_token.is_none() {
            grant.refresh_token = Some(refresh_token.to_owned());
        }
        Ok(grant)
    }

    /// Builds the seller authorisation URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidBaseUrl`] if the authorise host is invalid.
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
    ) -> Result<String, ConnectorError> {
        let mut url = Url::parse(&self.authorize_url).map_err(|e| ConnectorError::InvalidBaseUrl {
            url: self.authorize_url.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("client_id", &self.app_key)
            .append_pair("state", state);
        Ok(url.into())
    }

    async fn api(
        &self,
        access_token: &str,
        api_path: &str,
        params: BTreeMap<String, String>,
    ) -> Result<Value, ConnectorError> {
        self.signed(&self.api_url, Method::GET, Some(access_token), api_path, params)
            .await
    }

    /// Adds the common parameters, signs, sends and checks `code`.
    async fn signed(
        &self,
        base: &Url,
        method: Method,
        access_token: Option<&str>,
        api_path: &str,
        mut params: BTreeMap<String, String>,
    ) -> Result<Value, ConnectorError> {
        params.insert("app_key".to_owned(), self.app_key.clone());
        params.insert("sign_method".to_owned(), "sha256".to_owned());
        if let Some(token) = access_token {
            params.insert("access_token".to_owned(), token.to_owned());
        }
        params.remove("sign");
        params.insert("timestamp".to_owned(), now_millis().to_string());
        let sign = lazada_sign(&self.app_secret, api_path, &params)?;
        params.insert("sign".to_owned(), sign);

        let url = endpoint(base, api_path)?;
        let context = format!("lazada {api_path}");

        let body = send_json(&self.settings, &context, || {
            let request = self.client.request(method.clone(), url.clone());
            if method == Method::GET {
                request.query(&params)
            } else {
                request.form(&params)
            }
        })
        .await?;

        check_code(&body)?;
        Ok(body)
    }
}

fn check_code(body: &Value) -> Result<(), ConnectorError> {
    match str_field(body, "code") {
        None => Ok(()),
        Some(code) if code == "0" => Ok(()),
        Some(code) => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            Err(ConnectorError::api(VENDOR, code, message))
        }
    }
}

fn count(value: &Value) -> Option<u64> {
    mktsync_core::mapping::value_as_i64(value).and_then(|n| u64::try_from(n).ok())
}

fn token_grant(body: Value) -> Result<TokenGrant, ConnectorError> {
    // Refresh responses sometimes nest the payload under `data`.
    let payload = if body.get("data").is_some_and(Value::is_object) {
        body["data"].clone()
    } else {
        body
    };
    let access_token = str_field(&payload, "access_token").ok_or_else(|| {
        ConnectorError::api(VENDOR, "missing_token", "token response has no access_token")
    })?;

    let now = Utc::now();
    let expires_in = payload
        .get("expires_in")
        .and_then(mktsync_core::mapping::value_as_i64)
        .unwrap_or(DEFAULT_EXPIRES_IN);
    let refresh_expires_at = payload
        .get("refresh_expires_in")
        .and_then(mktsync_core::mapping::value_as_i64)
        .map(|secs| now + Duration::seconds(secs));

    let seller = array_field(&payload, "country_user_info").into_iter().next();
    let external_ref = seller.as_ref().and_then(|s| str_field(s, "short_code"));

    Ok(TokenGrant {
        access_token,
        refresh_token: str_field(&payload, "refresh_token"),
        expires_at: Some(now + Duration::seconds(expires_in)),
        refresh_expires_at,
        external_ref,
        account_name: str_field(&payload, "account"),
        raw: payload,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn endpoints_follow_country() {
        let th = LazadaEndpoints::for_country("th");
        assert_eq!(th.api_url, "https://api.lazada.co.th/rest");
        assert_eq!(th.auth_rest_url, "https://auth.lazada.co.th/rest");
        assert_eq!(th.authorize_url, "https://auth.lazada.co.th/oauth/authorize");
    }

    #[test]
    fn unknown_country_falls_back_to_vietnam() {
        let ep = LazadaEndpoints::for_country("XX");
        assert_eq!(ep.api_url, "https://api.lazada.vn/rest");
        assert_eq!(ep.authorize_url, "https://auth.lazada.com/oauth/authorize");
    }

    #[test]
    fn check_code_accepts_zero_and_missing() {
        assert!(check_code(&json!({ "code": "0" })).is_ok());
        assert!(check_code(&json!({ "result": [] })).is_ok());
        let err = check_code(&json!({ "code": "IllegalAccessToken", "message": "bad token" }))
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::Api { vendor: "lazada", ref code, .. } if code == "IllegalAccessToken"
        ));
    }

    #[test]
    fn token_grant_reads_seller_short_code() {
        let grant = token_grant(json!({
            "code": "0",
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 600,
            "account": "seller@example.com",
            "country_user_info": [{ "country": "vn", "short_code": "VN1234", "user_id": 42 }]
        }))
        .unwrap();
        assert_eq!(grant.access_token, "at");
        assert_eq!(grant.external_ref.as_deref(), Some("VN1234"));
        assert_eq!(grant.account_name.as_deref(), Some("seller@example.com"));
        let remaining = grant.expires_at.unwrap() - Utc::now();
        assert!(remaining.num_seconds() > 590 && remaining.num_seconds() <= 600);
    }

    #[test]
    fn token_grant_defaults_expiry_to_one_hour() {
        let grant = token_grant(json!({ "data": { "access_token": "at" } })).unwrap();
        let remaining = grant.expires_at.unwrap() - Utc::now();
        assert!(remaining.num_minutes() >= 59);
        assert!(grant.refresh_token.is_none());
    }

    #[test]
    fn authorization_url_uses_app_key_as_client_id() {
        let client = LazadaClient::with_base_url(
            "+123456",
            "secret",
            HttpSettings::for_tests(),
            "http://localhost",
        )
            .expect("client construction should not fail");
        let url = client
            .authorization_url("https://sync.example.com/oauth/lazada/callback", "7:abc")
            .unwrap();
        assert!(url.starts_with("http://localhost/oauth/authorize?response_type=code"));
        assert!(url.contains("client_id=123456"));
        assert!(url.contains("state=7%3Aabc"));
    }
}
