//! Integration tests for `YonsuiteClient` using wiremock HTTP mocks.

use mktsync_connectors::{ConnectorError, Cursor, HttpSettings, YonsuiteClient};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> YonsuiteClient {
    YonsuiteClient::new("ys-key", "ys-secret", HttpSettings::for_tests(), base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn access_token_is_read_from_token_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/open-auth/selfAppAuth/getAccessToken"))
        .and(query_param("appKey", "ys-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "00000",
            "message": "成功！",
            "data": { "access_token": "ys-token", "expire": 7200 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let grant = test_client(&server.uri())
        .get_access_token()
        .await
        .expect("token should be issued");

    assert_eq!(grant.access_token, "ys-token");
    assert!(grant.refresh_token.is_none());
    assert!(grant.expires_at.is_some());
}

#[tokio::test]
async fn token_error_code_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/open-auth/selfAppAuth/getAccessToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "10001",
            "message": "signature invalid"
        })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri()).get_access_token().await.unwrap_err();

    assert!(
        matches!(err, ConnectorError::Api { vendor: "yonsuite", ref code, .. } if code == "10001"),
        "expected Api error, got: {err:?}"
    );
}

#[tokio::test]
async fn partners_page_posts_page_body_and_advances() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/yonbip/digitalModel/merchant/newlist"))
        .and(query_param("access_token", "ys-token"))
        .and(body_json(json!({ "pageIndex": 1, "pageSize": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "200",
            "data": [{ "id": 1, "code": "KH001" }, { "id": 2, "code": "KH002" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = test_client(&server.uri())
        .get_partners("ys-token", 1, 2)
        .await
        .expect("partner page should parse");

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next, Some(Cursor::Index(2)));
}

#[tokio::test]
async fn products_stop_at_page_count() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/yonbip/digitalModel/product/integration/querylist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "200",
            "data": { "pageIndex": 3, "pageCount": 3, "recordList": [{ "id": "p1" }] }
        })))
        .mount(&server)
        .await;

    let page = test_client(&server.uri())
        .get_products("ys-token", 3, 500)
        .await
        .expect("product page should parse");

    assert_eq!(page.items[0]["id"], "p1");
    assert!(page.is_last());
}

#[tokio::test]
async fn empty_result_message_is_a_last_page() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/yonbip/sd/quote/salesquotation/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "999",
            "message": "Kết quả truy vấn rỗng"
        })))
        .mount(&server)
        .await;

    let page = test_client(&server.uri())
        .get_orders("ys-token", 7, 500)
        .await
        .expect("empty result is not an error");

    assert!(page.items.is_empty());
    assert!(page.is_last());
}

#[tokio::test]
async fn org_tree_combines_root_and_level_one_details() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/yonbip/digitalModel/queryRootOrgInfos"))
        .and(body_json(json!({ "funcType": "salesorg", "code": "global00" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "200",
            "data": { "id": "root", "name": "Tập đoàn" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/yonbip/digitalModel/orgunit/querytree"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "200",
            "data": [{ "id": "u1", "parent": "root" }, { "id": "u2", "parent": "root" }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/yonbip/digitalModel/orgunit/detail"))
        .and(query_param("id", "u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "200",
            "data": { "id": "u1", "parent": "root", "code": "HN", "taxpayerid": "0101234567" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/yonbip/digitalModel/orgunit/detail"))
        .and(query_param("id", "u2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "404",
            "message": "not found"
        })))
        .mount(&server)
        .await;

    let units = test_client(&server.uri())
        .get_org_units("ys-token", "global00")
        .await
        .expect("org tree should load");

    assert_eq!(units.len(), 3);
    assert_eq!(units[0]["level"], 0);
    assert_eq!(units[1]["taxpayerid"], "0101234567");
    assert_eq!(units[2]["id"], "u2");
}
