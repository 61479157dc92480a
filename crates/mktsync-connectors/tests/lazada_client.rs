//! Integration tests for `LazadaClient` using wiremock HTTP mocks.

use chrono::{TimeZone, Utc};
use mktsync_connectors::{ConnectorError, Cursor, HttpSettings, LazadaClient};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> LazadaClient {
    LazadaClient::with_base_url("+100200", "secret", HttpSettings::for_tests(), base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn get_orders_filters_on_update_time_oldest_first() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/get"))
        .and(query_param("app_key", "100200"))
        .and(query_param("access_token", "seller-token"))
        .and(query_param("sign_method", "sha256"))
        .and(query_param("limit", "50"))
        .and(query_param("offset", "0"))
        .and(query_param("update_after", "2024-01-01T00:00:00Z"))
        .and(query_param("sort_by", "updated_at"))
        .and(query_param("sort_direction", "ASC"))
        .and(query_param_is_missing("created_after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "data": {
                "countTotal": 120,
                "orders": (0..50).map(|i| json!({ "order_id": i })).collect::<Vec<_>>()
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = test_client(&server.uri())
        .get_orders("seller-token", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), 0)
        .await
        .expect("orders page should parse");

    assert_eq!(page.items.len(), 50);
    assert_eq!(page.next, Some(Cursor::Offset(50)));
}

#[tokio::test]
async fn get_order_items_rejects_oversized_batch_without_calling() {
    let server = MockServer::start().await;
    let ids: Vec<String> = (0..11).map(|i| i.to_string()).collect();

    let err = test_client(&server.uri())
        .get_order_items("tok", &ids)
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::InvalidRequest(_)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn get_order_items_joins_ids() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/items/get"))
        .and(query_param("order_ids", "[1,2]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "data": [
                { "order_id": 1, "order_items": [{ "order_item_id": 10 }] },
                { "order_id": 2, "order_items": [] }
            ]
        })))
        .mount(&server)
        .await;

    let items = test_client(&server.uri())
        .get_order_items("tok", &["1".to_owned(), "2".to_owned()])
        .await
        .expect("items should parse");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["order_items"][0]["order_item_id"], 10);
}

#[tokio::test]
async fn error_code_becomes_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "IllegalAccessToken",
            "message": "The specified access token is invalid or expired"
        })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri()).get_products("bad", 0).await.unwrap_err();

    assert!(
        matches!(
            err,
            ConnectorError::Api { vendor: "lazada", ref code, .. } if code == "IllegalAccessToken"
        ),
        "expected Api error, got: {err:?}"
    );
}

#[tokio::test]
async fn campaigns_stop_when_total_is_covered() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sponsor/solutions/campaign/searchCampaignList"))
        .and(query_param("bizCode", "sponsoredSearch"))
        .and(query_param("pageNo", "2"))
        .and(query_param_is_missing("startDate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "totalCount": 60,
            "result": [{ "campaignId": 51 }]
        })))
        .mount(&server)
        .await;

    let page = test_client(&server.uri())
        .search_campaigns("tok", "sponsoredSearch", 2, 50, None)
        .await
        .expect("campaign page should parse");

    assert_eq!(page.items.len(), 1);
    assert!(page.is_last());
}

#[tokio::test]
async fn warehouses_follow_total_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fbl/warehouses/get"))
        .and(query_param("country_code", "VN"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "total_page": 2,
            "data": [{ "warehouse_code": "A" }, { "warehouse_code": "B" }]
        })))
        .mount(&server)
        .await;

    let page = test_client(&server.uri())
        .get_warehouses("tok", "VN", 1, 2)
        .await
        .expect("warehouses should parse");

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next, Some(Cursor::Index(2)));
}

#[tokio::test]
async fn create_token_posts_code_and_reads_seller() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/token/create"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("app_key=100200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 604_800,
            "account": "seller@example.com",
            "country_user_info": [{ "country": "vn", "short_code": "VN1234" }]
        })))
        .mount(&server)
        .await;

    let before = Utc::now();
    let grant = test_client(&server.uri())
        .create_token("auth-code")
        .await
        .expect("token exchange should succeed");

    assert_eq!(grant.access_token, "at");
    assert_eq!(grant.refresh_token.as_deref(), Some("rt"));
    assert_eq!(grant.external_ref.as_deref(), Some("VN1234"));
    assert_eq!(grant.account_name.as_deref(), Some("seller@example.com"));
    let expires_at = grant.expires_at.expect("expiry should be set");
    assert!(expires_at >= before + chrono::Duration::seconds(604_800));
}

#[tokio::test]
async fn refresh_keeps_previous_refresh_token_when_absent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/token/refresh"))
        .and(body_string_contains("refresh_token=old-rt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "data": { "access_token": "new-at" }
        })))
        .mount(&server)
        .await;

    let grant = test_client(&server.uri())
        .refresh_token("old-rt")
        .await
        .expect("refresh should succeed");

    assert_eq!(grant.access_token, "new-at");
    assert_eq!(grant.refresh_token.as_deref(), Some("old-rt"));
}
