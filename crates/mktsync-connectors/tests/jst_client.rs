//! Integration tests for `JstClient` using wiremock HTTP mocks.

use chrono::{TimeZone, Utc};
use mktsync_connectors::jst::{InoutTimeField, JstAccess, OrderTimeField};
use mktsync_connectors::{ConnectorError, Cursor, HttpSettings, JstClient};
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> JstClient {
    JstClient::with_base_url("key123", "secret456", HttpSettings::for_tests(), base_url)
        .expect("client construction should not fail")
}

fn access() -> JstAccess {
    JstAccess {
        access_token: "tok".to_owned(),
        company_id: "10001".to_owned(),
    }
}

#[tokio::test]
async fn get_orders_sends_signed_window_and_reads_data_page() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/Order/GetOrders"))
        .and(header("appkey", "key123"))
        .and(header("accesstoken", "tok"))
        .and(header("CompanyId", "10001"))
        .and(header_exists("sign"))
        .and(header_exists("ts"))
        .and(body_json(json!({
            "requestModel": { "modifiedBegin": 1_700_000_000, "modifiedEnd": 1_700_000_360 },
            "dataPage": { "pageSize": 500, "pageIndex": 1 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{ "orderId": 1 }, { "orderId": 2 }],
            "dataPage": { "isLast": false, "pageIndex": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let begin = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let end = Utc.timestamp_opt(1_700_000_360, 0).unwrap();
    let page = test_client(&server.uri())
        .get_orders(&access(), OrderTimeField::Modified, begin, end, 1)
        .await
        .expect("orders page should parse");

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next, Some(Cursor::Index(2)));
}

#[tokio::test]
async fn get_inouts_uses_send_time_keys() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/SaleInout/GetSaleInouts"))
        .and(body_json(json!({
            "requestModel": { "SendTimeBegin": 10, "SendTimeEnd": 20 },
            "dataPage": { "pageSize": 500, "pageIndex": 4 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{ "inoutId": 8 }],
            "dataPage": { "isLast": true, "pageIndex": 4 }
        })))
        .mount(&server)
        .await;

    let page = test_client(&server.uri())
        .get_inouts(
            &access(),
            InoutTimeField::SendTime,
            Utc.timestamp_opt(10, 0).unwrap(),
            Utc.timestamp_opt(20, 0).unwrap(),
            4,
        )
        .await
        .expect("inouts page should parse");

    assert_eq!(page.items.len(), 1);
    assert!(page.is_last());
}

#[tokio::test]
async fn get_order_details_posts_ids() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/Order/GetOrderDetailByIds"))
        .and(body_json(json!({ "orderIds": [11, 12] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                { "orderId": 11, "orderItems": [{ "orderItemId": 1 }] },
                { "orderId": 12, "orderItems": [] }
            ]
        })))
        .mount(&server)
        .await;

    let details = test_client(&server.uri())
        .get_order_details(&access(), &[11, 12])
        .await
        .expect("details should parse");

    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["orderItems"][0]["orderItemId"], 1);
}

#[tokio::test]
async fn unsuccessful_envelope_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/Warehouse/GetWarehouses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "code": 100,
            "message": "sign error"
        })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .get_warehouses(&access())
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            ConnectorError::Api { vendor: "jst", ref message, .. } if message == "sign error"
        ),
        "expected Api error, got: {err:?}"
    );
}

#[tokio::test]
async fn non_200_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/Shop/GetShops"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .get_shops(&access(), Utc.timestamp_opt(0, 0).unwrap(), Utc::now(), 1)
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::UnexpectedStatus { status: 403, .. }));
}

#[tokio::test]
async fn exchange_code_returns_grant() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/Authentication/GetToken"))
        .and(header("appkey", "key123"))
        .and(header_exists("sign"))
        .and(body_json(json!({ "Code": "auth-code" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "accessToken": "at-1",
                "refreshToken": "rt-1",
                "expiredTime": "2025-06-01T08:00:00+08:00",
                "companyId": 10001
            }
        })))
        .mount(&server)
        .await;

    let grant = test_client(&server.uri())
        .exchange_code("auth-code")
        .await
        .expect("token exchange should succeed");

    assert_eq!(grant.access_token, "at-1");
    assert_eq!(grant.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(grant.external_ref.as_deref(), Some("10001"));
    assert_eq!(
        grant.expires_at,
        Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
    );
}
