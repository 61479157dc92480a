//! Integration tests for `TiktokShopClient` using wiremock HTTP mocks.

use chrono::{NaiveDate, TimeZone, Utc};
use mktsync_connectors::tiktok_shop::{AfterSale, ShopAccess};
use mktsync_connectors::{ConnectorError, Cursor, HttpSettings, TiktokShopClient};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> TiktokShopClient {
    TiktokShopClient::with_base_url("app-key", "app-secret", HttpSettings::for_tests(), base_url)
        .expect("client construction should not fail")
}

fn access() -> ShopAccess {
    ShopAccess {
        access_token: "shop-token".to_owned(),
        shop_cipher: "ROW_cipher".to_owned(),
    }
}

#[tokio::test]
async fn search_orders_posts_update_window_and_reads_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/order/202309/orders/search"))
        .and(header("x-tts-access-token", "shop-token"))
        .and(query_param("shop_cipher", "ROW_cipher"))
        .and(query_param("app_key", "app-key"))
        .and(query_param("page_size", "100"))
        .and(query_param("sort_field", "update_time"))
        .and(query_param_is_missing("page_token"))
        .and(body_json(json!({ "update_time_ge": 1_700_000_000 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "Success",
            "data": {
                "orders": [{ "id": "o-1" }, { "id": "o-2" }],
                "next_page_token": "tok-2",
                "total_count": 240
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let since = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let page = test_client(&server.uri())
        .search_orders(&access(), Some(since), None)
        .await
        .expect("order search should parse");

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next, Some(Cursor::Token("tok-2".to_owned())));
}

#[tokio::test]
async fn order_details_send_comma_joined_ids() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/order/202507/orders"))
        .and(query_param("ids", "o-1,o-2"))
        .and(query_param_is_missing("page_size"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": { "orders": [
                { "id": "o-1", "line_items": [] },
                { "id": "o-2", "line_items": [] }
            ] }
        })))
        .mount(&server)
        .await;

    let orders = test_client(&server.uri())
        .get_order_details(&access(), &["o-1".to_owned(), "o-2".to_owned()])
        .await
        .expect("details should parse");

    assert_eq!(orders.len(), 2);
}

#[tokio::test]
async fn non_zero_code_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/logistics/202309/warehouses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 105_002,
            "message": "Expired credentials"
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
            ConnectorError::Api { vendor: "tiktok_shop", ref message, .. }
                if message == "Expired credentials"
        ),
        "expected Api error, got: {err:?}"
    );
}

#[tokio::test]
async fn authorized_shops_are_listed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/authorization/202309/shops"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "shops": [{ "id": "7000", "name": "Demo", "cipher": "ROW_x", "code": "VNLC" }]
            }
        })))
        .mount(&server)
        .await;

    let shops = test_client(&server.uri())
        .get_authorized_shops("shop-token")
        .await
        .expect("shops should parse");

    assert_eq!(shops[0]["cipher"], "ROW_x");
}

#[tokio::test]
async fn get_token_uses_auth_code_grant() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/token/get"))
        .and(query_param("auth_code", "code-1"))
        .and(query_param("grant_type", "authorized_code"))
        .and(query_param("app_secret", "app-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "access_token": "at",
                "refresh_token": "rt",
                "access_token_expire_in": 1_760_000_000,
                "seller_name": "Demo Seller",
                "open_id": "open-1"
            }
        })))
        .mount(&server)
        .await;

    let grant = test_client(&server.uri())
        .get_token("code-1")
        .await
        .expect("token exchange should succeed");

    assert_eq!(grant.access_token, "at");
    assert_eq!(grant.account_name.as_deref(), Some("Demo Seller"));
    assert_eq!(grant.expires_at.map(|d| d.timestamp()), Some(1_760_000_000));
}

#[tokio::test]
async fn refresh_without_data_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/token/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "data": {} })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .refresh_token("rt")
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::Api { ref code, .. } if code == "no_data"));
}

#[tokio::test]
async fn returns_search_sorts_by_update_time_ascending() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/return_refund/202309/returns/search"))
        .and(query_param("shop_cipher", "ROW_cipher"))
        .and(query_param("page_size", "50"))
        .and(query_param("sort_field", "update_time"))
        .and(query_param("sort_order", "ASC"))
        .and(query_param("page_token", "tok-1"))
        .and(body_json(json!({ "update_time_ge": 1_700_000_000 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": { "return_orders": [{ "return_id": "r-1" }], "next_page_token": "" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let since = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let page = test_client(&server.uri())
        .search_after_sales(&access(), AfterSale::Return, Some(since), Some("tok-1"))
        .await
        .expect("return search should parse");

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.next, None);
}

#[tokio::test]
async fn live_sessions_are_ranked_by_gmv_over_whole_days() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/analytics/202508/shop_lives/performance"))
        .and(query_param("start_date_ge", "2025-06-01"))
        .and(query_param("end_date_lt", "2025-06-08"))
        .and(query_param("sort_field", "gmv"))
        .and(query_param("sort_order", "DESC"))
        .and(query_param("currency", "LOCAL"))
        .and(query_param("account_type", "ALL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "live_stream_sessions": [{ "id": "7419" }, { "id": "7420" }],
                "next_page_token": "tok-2"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let day = |d| NaiveDate::from_ymd_opt(2025, 6, d).unwrap();
    let page = test_client(&server.uri())
        .list_live_sessions(&access(), day(1), day(8), None)
        .await
        .expect("live sessions should parse");

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next, Some(Cursor::Token("tok-2".to_owned())));
}
