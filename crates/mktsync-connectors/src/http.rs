//! Shared HTTP plumbing for the vendor clients.

use std::time::Duration;

use mktsync_core::AppConfig;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::Value;

use crate::error::ConnectorError;
use crate::retry::retry_with_backoff;

/// Transport knobs shared by every vendor client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure for transient errors.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "mktsync/0.1 (connector-sync)".to_owned(),
            max_retries: 3,
            backoff_base_ms: 1_000,
        }
    }
}

impl HttpSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.http_timeout_secs,
            user_agent: config.http_user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
        }
    }

    /// Settings for tests: no back-off sleep, one retry.
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            timeout_secs: 5,
            max_retries: 1,
            backoff_base_ms: 0,
            ..Self::default()
        }
    }
}

pub(crate) fn build_client(settings: &HttpSettings) -> Result<Client, ConnectorError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(settings.user_agent.as_str())
        .build()?;
    Ok(client)
}

/// Parses `raw` and normalises it to end with exactly one slash so that
/// relative joins append to the path instead of replacing its last segment.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ConnectorError> {
    let normalised = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| ConnectorError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })
}

/// Resolves a vendor path such as `/api/Order/GetOrders` against `base`.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, ConnectorError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| ConnectorError::InvalidRequest(format!("bad endpoint path '{path}': {e}")))
}

/// Sends the request produced by `build`, retrying transient failures, and
/// parses the body as JSON.
///
/// `build` runs once per attempt because a sent `RequestBuilder` is consumed.
///
/// # Errors
///
/// - [`ConnectorError::RateLimited`] on HTTP 429 after all retries.
/// - [`ConnectorError::UnexpectedStatus`] on any other non-2xx status.
/// - [`ConnectorError::Http`] on network failure.
/// - [`ConnectorError::Deserialize`] if the body is not JSON.
pub(crate) async fn send_json<F>(
    settings: &HttpSettings,
    context: &str,
    build: F,
) -> Result<Value, ConnectorError>
where
    F: Fn() -> RequestBuilder,
{
    retry_with_backoff(settings.max_retries, settings.backoff_base_ms, || {
        let request = build();
        async move {
            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(ConnectorError::RateLimited {
                    context: context.to_owned(),
                    retry_after_secs,
                });
            }

            if !status.is_success() {
                return Err(ConnectorError::UnexpectedStatus {
                    status: status.as_u16(),
                    context: context.to_owned(),
                });
            }

            let body = response.text().await?;
            serde_json::from_str(&body).map_err(|e| ConnectorError::Deserialize {
                context: context.to_owned(),
                source: e,
            })
        }
    })
    .await
}

/// Current Unix time in milliseconds, as vendors expect in `timestamp`/`ts`.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_single_trailing_slash() {
        let url = parse_base_url("https://api.lazada.vn/rest//").unwrap();
        assert_eq!(url.as_str(), "https://api.lazada.vn/rest/");
    }

    #[test]
    fn endpoint_appends_to_base_path() {
        let base = parse_base_url("https://business-api.tiktok.com/open_api/v1.3").unwrap();
        let url = endpoint(&base, "/campaign/get/").unwrap();
        assert_eq!(
            url.as_str(),
            "https://business-api.tiktok.com/open_api/v1.3/campaign/get/"
        );
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let err = parse_base_url("not a url").unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::InvalidBaseUrl { ref url, .. } if url == "not a url"
        ));
    }
}
