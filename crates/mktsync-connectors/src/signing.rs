//! Vendor request signatures.
//!
//! Every function is a pure computation over already-serialised inputs; the
//! caller decides timestamps and must sign the exact body bytes it sends.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;

use crate::error::ConnectorError;

type HmacSha256 = Hmac<Sha256>;

/// Characters left unescaped in a YonSuite signature (RFC 3986 unreserved plus `/`).
const YONSUITE_SIGNATURE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Params excluded from the TikTok Shop canonical string.
const TIKTOK_SHOP_UNSIGNED: [&str; 2] = ["sign", "access_token"];

fn md5_upper(source: &str) -> String {
    hex::encode_upper(Md5::digest(source.as_bytes()))
}

fn hmac_sha256(secret: &str, message: &str) -> Result<Vec<u8>, ConnectorError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ConnectorError::InvalidRequest(format!("signing key rejected: {e}")))?;
    mac.update(message.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn concat_sorted<'a>(params: impl Iterator<Item = (&'a String, &'a String)>) -> String {
    params.fold(String::new(), |mut acc, (k, v)| {
        acc.push_str(k);
        acc.push_str(v);
        acc
    })
}

/// Signature for authenticated JST open-API calls.
#[must_use]
pub fn jst_sign(
    app_key: &str,
    app_secret: &str,
    body: &str,
    access_token: &str,
    company_id: &str,
    ts_millis: i64,
) -> String {
    md5_upper(&format!(
        "appkey={app_key}&appsecret={app_secret}&data={body}\
         &accesstoken={access_token}&companyid={company_id}&ts={ts_millis}"
    ))
}

/// Signature for the JST code-for-token exchange, which has no access token yet.
#[must_use]
pub fn jst_token_sign(app_key: &str, app_secret: &str, body: &str, ts_millis: i64) -> String {
    md5_upper(&format!(
        "appkey={app_key}&appsecret={app_secret}&data={body}&ts={ts_millis}"
    ))
}

/// Signature embedded in the JST company authorisation URL.
#[must_use]
pub fn jst_auth_sign(app_key: &str, app_secret: &str, state: &str, timestamp_secs: i64) -> String {
    md5_upper(&format!(
        "appkey={app_key}&appsecret={app_secret}&state={state}&timestamp={timestamp_secs}"
    ))
}

/// Lazada: `HMAC-SHA256(secret, api_path + sorted k+v)`, upper-case hex.
///
/// # Errors
///
/// Returns [`ConnectorError::InvalidRequest`] if the key is rejected by the MAC.
pub fn lazada_sign(
    secret: &str,
    api_path: &str,
    params: &BTreeMap<String, String>,
) -> Result<String, ConnectorError> {
    let message = format!("{api_path}{}", concat_sorted(params.iter()));
    Ok(hex::encode_upper(hmac_sha256(secret, &message)?))
}

/// TikTok Shop: `HMAC-SHA256(secret, secret + path + sorted k+v + body + secret)`,
/// lower-case hex. `sign` and `access_token` never take part.
///
/// # Errors
///
/// Returns [`ConnectorError::InvalidRequest`] if the key is rejected by the MAC.
pub fn tiktok_shop_sign(
    secret: &str,
    path: &str,
    params: &BTreeMap<String, String>,
    body: Option<&str>,
) -> Result<String, ConnectorError> {
    let signed = concat_sorted(
        params
            .iter()
            .filter(|(k, _)| !TIKTOK_SHOP_UNSIGNED.contains(&k.as_str())),
    );
    let message = format!("{secret}{path}{signed}{}{secret}", body.unwrap_or_default());
    Ok(hex::encode(hmac_sha256(secret, &message)?))
}

/// YonSuite: URL-encoded `base64(HMAC-SHA256(secret, sorted k+v))`.
///
/// # Errors
///
/// Returns [`ConnectorError::InvalidRequest`] if the key is rejected by the MAC.
pub fn yonsuite_sign(
    secret: &str,
    params: &BTreeMap<String, String>,
) -> Result<String, ConnectorError> {
    let digest = hmac_sha256(secret, &concat_sorted(params.iter()))?;
    let encoded = STANDARD.encode(digest);
    Ok(utf8_percent_encode(&encoded, YONSUITE_SIGNATURE).to_string())
}

/// Compact JSON (no whitespace), the form JST and TikTok sign and send.
///
/// # Errors
///
/// Returns [`ConnectorError::InvalidRequest`] if `value` cannot be serialised.
pub fn compact_json<T: serde::Serialize>(value: &T) -> Result<String, ConnectorError> {
    serde_json::to_string(value)
        .map_err(|e| ConnectorError::InvalidRequest(format!("body not serialisable: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn jst_call_signature_matches_known_vector() {
        let body = r#"{"dataPage":{"pageIndex":1,"pageSize":500}}"#;
        assert_eq!(
            jst_sign("key123", "secret456", body, "tok", "10001", 1_700_000_000_000),
            "3A1C429B6A4888A2D0931D5A145BE68B"
        );
    }

    #[test]
    fn jst_token_signature_matches_known_vector() {
        assert_eq!(
            jst_token_sign("key123", "secret456", r#"{"Code":"abc"}"#, 1_700_000_000_000),
            "7EB8B6A6A6307D2607A931859A9C1DB1"
        );
    }

    #[test]
    fn jst_auth_signature_matches_known_vector() {
        assert_eq!(
            jst_auth_sign("key123", "secret456", "mktsync", 1_700_000_000),
            "05C374C52F02C2BA5C3E4D07919774DB"
        );
    }

    #[test]
    fn lazada_signature_matches_known_vector() {
        let p = params(&[
            ("app_key", "12345"),
            ("timestamp", "1700000000000"),
            ("sign_method", "sha256"),
            ("access_token", "at"),
            ("offset", "0"),
            ("limit", "50"),
        ]);
        assert_eq!(
            lazada_sign("laz-secret", "/orders/get", &p).unwrap(),
            "8FDD89C9D248A6017714726D0F5F9742AA7A4A18B0CC458B551A81934178EA6E"
        );
    }

    #[test]
    fn tiktok_shop_signature_includes_body() {
        let p = params(&[
            ("app_key", "appk"),
            ("timestamp", "1700000000"),
            ("shop_cipher", "C1"),
            ("page_size", "100"),
        ]);
        let path = "/order/202309/orders/search";
        assert_eq!(
            tiktok_shop_sign("tts-secret", path, &p, Some(r#"{"update_time_ge":1700000000}"#))
                .unwrap(),
            "cda71e5fc029cdbab13bfd6388ec371fd9f61f3ce0ddb4ee972ef4036f18edbc"
        );
        assert_eq!(
            tiktok_shop_sign("tts-secret", path, &p, None).unwrap(),
            "d9b1e870797532404e00a05b01f3290ee9e7210544270a7f6b13820f9f663f2f"
        );
    }

    #[test]
    fn tiktok_shop_signature_ignores_sign_and_access_token() {
        let base = params(&[("app_key", "appk"), ("timestamp", "1700000000")]);
        let mut noisy = base.clone();
        noisy.insert("sign".to_owned(), "stale".to_owned());
        noisy.insert("access_token".to_owned(), "tok".to_owned());
        assert_eq!(
            tiktok_shop_sign("s", "/p", &base, None).unwrap(),
            tiktok_shop_sign("s", "/p", &noisy, None).unwrap()
        );
    }

    #[test]
    fn yonsuite_signature_is_url_encoded_base64() {
        let p = params(&[("appKey", "ak"), ("timestamp", "1700000000000")]);
        assert_eq!(
            yonsuite_sign("ys-secret", &p).unwrap(),
            "IKhcZiqy6pBdnJmxcX0sm86CywXF9HtMfJ21//f8ssA%3D"
        );
    }

    #[test]
    fn yonsuite_signature_escapes_plus_but_keeps_slash() {
        let p = params(&[("appKey", "ak0"), ("timestamp", "1700000000000")]);
        assert_eq!(
            yonsuite_sign("ys-secret", &p).unwrap(),
            "0uEmkfqld36ubhggaGI5MW7qg%2B/XzNbpvMlzUgwzvzY%3D"
        );
    }

    #[test]
    fn compact_json_has_no_whitespace() {
        let body = serde_json::json!({"Code": "abc", "n": [1, 2]});
        assert_eq!(compact_json(&body).unwrap(), r#"{"Code":"abc","n":[1,2]}"#);
    }
}
