//! HTTP client for the TikTok Business (Marketing) API v1.3.
//!
//! Calls carry the long-lived advertiser token in the `Access-Token` header
//! and answer with `{ code, message, data }`; any non-zero `code` is an error.

use reqwest::{Client, Url};
use serde_json::{json, Value};

use crate::error::ConnectorError;
use crate::http::{build_client, endpoint, parse_base_url, send_json, HttpSettings};
use crate::pagination::{next_index, Page};
use crate::signing::compact_json;
use crate::{array_field, str_field, TokenGrant};

const DEFAULT_BASE_URL: &str = "https://business-api.tiktok.com/open_api/v1.3";
const AUTHORIZE_URL: &str = "https://business-api.tiktok.com/portal/auth";
const VENDOR: &str = "tiktok_business";

/// Largest page size the list endpoints accept.
pub const PAGE_SIZE: u32 = 1000;

/// Client for the TikTok Business API.
pub struct TiktokBusinessClient {
    client: Client,
    settings: HttpSettings,
    app_id: String,
    secret: String,
    base_url: Url,
}

impl TiktokBusinessClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(app_id: &str, secret: &str, settings: HttpSettings) -> Result<Self, ConnectorError> {
        Self::with_base_url(app_id, secret, settings, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ConnectorError::InvalidBaseUrl`] if `base_url` is invalid.
    pub fn with_base_url(
        app_id: &str,
        secret: &str,
        settings: HttpSettings,
        base_url: &str,
    ) -> Result<Self, ConnectorError> {
        Ok(Self {
            client: build_client(&settings)?,
            settings,
            app_id: app_id.to_owned(),
            secret: secret.to_owned(),
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Exchanges an `auth_code` for a token covering the returned
    /// `advertiser_ids`.
    ///
    /// Business tokens do not expire; `external_ref` carries the advertiser
    /// ids comma-joined.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::Api`] if `code` is non-zero.
    /// - [`ConnectorError::Http`] / [`ConnectorError::UnexpectedStatus`] on
    ///   transport failure.
    pub async fn exchange_code(&self, auth_code: &str) -> Result<TokenGrant, ConnectorError> {
        let body = compact_json(&json!({
            "app_id": self.app_id,
            "secret": self.secret,
            "auth_code": auth_code,
        }))?;
        let url = endpoint(&self.base_url, "/oauth2/access_token/")?;

        let envelope = send_json(&self.settings, "tiktok_business oauth2/access_token", || {
            self.client
                .post(url.clone())
                .header("Content-Type", "application/json")
                .body(body.clone())
        })
        .await?;
        let data = checked_data(envelope)?;

        let access_token = str_field(&data, "access_token").ok_or_else(|| {
            ConnectorError::api(VENDOR, "missing_token", "token response has no access_token")
        })?;
        let advertiser_ids = advertiser_ids(&data);
        tracing::info!(advertisers = advertiser_ids.len(), "TikTok Business account authorised");

        Ok(TokenGrant {
            access_token,
            refresh_token: None,
            expires_at: None,
            refresh_expires_at: None,
            external_ref: (!advertiser_ids.is_empty()).then(|| advertiser_ids.join(",")),
            account_name: None,
            raw: data,
        })
    }

    /// Builds the portal authorisation URL for this app.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidBaseUrl`] if the portal URL cannot be
    /// parsed.
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
    ) -> Result<String, ConnectorError> {
        let mut url = Url::parse(AUTHORIZE_URL).map_err(|e| ConnectorError::InvalidBaseUrl {
            url: AUTHORIZE_URL.to_owned(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("app_id", &self.app_id)
            .append_pair("state", state)
            .append_pair("redirect_uri", redirect_uri);
        Ok(url.into())
    }

    /// Fetches advertiser info for the given ids.
    ///
    /// # Errors
    ///
    /// As [`TiktokBusinessClient::exchange_code`].
    pub async fn get_advertisers(
        &self,
        access_token: &str,
        advertiser_ids: &[String],
    ) -> Result<Vec<Value>, ConnectorError> {
        if advertiser_ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = vec![("advertiser_ids".to_owned(), compact_json(&advertiser_ids)?)];
        let data = self.get(access_token, "/advertiser/info/", params).await?;
        Ok(array_field(&data, "list"))
    }

    /// Fetches one page of an advertiser's campaigns.
    ///
    /// # Errors
    ///
    /// As [`TiktokBusinessClient::exchange_code`].
    pub async fn get_campaigns(
        &self,
        access_token: &str,
        advertiser_id: &str,
        page: u32,
        filtering: Option<&Value>,
    ) -> Result<Page<Value>, ConnectorError> {
        self.list_page(access_token, "/campaign/get/", advertiser_id, page, filtering)
            .await
    }

    /// Fetches one page of an advertiser's ad groups.
    ///
    /// # Errors
    ///
    /// As [`TiktokBusinessClient::exchange_code`].
    pub async fn get_ad_groups(
        &self,
        access_token: &str,
        advertiser_id: &str,
        page: u32,
        filtering: Option<&Value>,
    ) -> Result<Page<Value>, ConnectorError> {
        self.list_page(access_token, "/adgroup/get/", advertiser_id, page, filtering)
            .await
    }

    /// Fetches one page of an advertiser's ads.
    ///
    /// # Errors
    ///
    /// As [`TiktokBusinessClient::exchange_code`].
    pub async fn get_ads(
        &self,
        access_token: &str,
        advertiser_id: &str,
        page: u32,
        filtering: Option<&Value>,
    ) -> Result<Page<Value>, ConnectorError> {
        self.list_page(access_token, "/ad/get/", advertiser_id, page, filtering)
            .await
    }

    async fn list_page(
        &self,
        access_token: &str,
        path: &str,
        advertiser_id: &str,
        page: u32,
        filtering: Option<&Value>,
    ) -> Result<Page<Value>, ConnectorError> {
        let mut params = vec![
            ("advertiser_id".to_owned(), advertiser_id.to_owned()),
            ("page".to_owned(), page.to_string()),
            ("page_size".to_owned(), PAGE_SIZE.to_string()),
        ];
        if let Some(filtering) = filtering {
            params.push(("filtering".to_owned(), compact_json(filtering)?));
        }

        let data = self.get(access_token, path, params).await?;
        let items = array_field(&data, "list");
        let total_pages = data
            .pointer("/page_info/total_page")
            .and_then(Value::as_u64);
        let next = next_index(page, total_pages, items.len(), PAGE_SIZE);
        tracing::debug!(
            path,
            advertiser_id,
            page,
            rows = items.len(),
            ?total_pages,
            "TikTok Business page fetched"
        );
        Ok(Page::new(items, next))
    }

    async fn get(
        &self,
        access_token: &str,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<Value, ConnectorError> {
        let url = endpoint(&self.base_url, path)?;
        let context = format!("tiktok_business {path}");
        let envelope = send_json(&self.settings, &context, || {
            self.client
                .get(url.clone())
                .header("Access-Token", access_token)
                .query(&params)
        })
        .await?;
        checked_data(envelope)
    }
}

/// Returns `data` when `code == 0`.
fn checked_data(envelope: Value) -> Result<Value, ConnectorError> {
    let code = envelope.get("code").and_then(mktsync_core::mapping::value_as_i64);
    if code != Some(0) {
        let message = envelope
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ConnectorError::api(
            VENDOR,
            code.map_or_else(|| "missing".to_owned(), |c| c.to_string()),
            message,
        ));
    }
    Ok(envelope.get("data").cloned().unwrap_or(Value::Null))
}

/// Advertiser ids from a token payload, as strings.
#[must_use]
pub fn advertiser_ids(token_data: &Value) -> Vec<String> {
    array_field(token_data, "advertiser_ids")
        .iter()
        .filter_map(mktsync_core::mapping::value_as_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_code_is_error() {
        let err = checked_data(json!({ "code": 40001, "message": "Access token is incorrect" }))
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Api { ref code, .. } if code == "40001"));
    }

    #[test]
    fn missing_data_is_null() {
        assert_eq!(checked_data(json!({ "code": 0 })).unwrap(), Value::Null);
    }

    #[test]
    fn advertiser_ids_accept_numbers_and_strings() {
        let ids = advertiser_ids(&json!({ "advertiser_ids": [7_000_000_001_i64, "7000000002"] }));
        assert_eq!(ids, vec!["7000000001", "7000000002"]);
    }

    #[test]
    fn authorize_url_carries_app_id() {
        let client = TiktokBusinessClient::with_base_url(
            "app-1",
            "s",
            HttpSettings::for_tests(),
            "http://localhost",
        )
        .unwrap();
        let url = client
            .authorization_url("https://erp.example.com/oauth/tiktok-business/callback", "7")
            .unwrap();
        assert!(url.starts_with(
            "https://business-api.tiktok.com/portal/auth?app_id=app-1&state=7&redirect_uri="
        ));
    }
}
