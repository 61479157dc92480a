//! Authorisation callbacks against a real database and a mocked vendor.

use mktsync_core::{AppConfig, AppCredentials, Environment, Vendor};
use mktsync_sync::{complete_authorization, SyncError};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> AppConfig {
    AppConfig {
        database_url: String::new(),
        env: Environment::Test,
        bind_addr: "127.0.0.1:0".parse().expect("addr"),
        log_level: "info".to_owned(),
        tenants_path: "config/tenants.yaml".into(),
        public_base_url: "https://sync.example.com".to_owned(),
        db_max_connections: 5,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
        http_timeout_secs: 5,
        http_user_agent: "mktsync-test".to_owned(),
        max_concurrent_tenants: 2,
        max_retries: 0,
        retry_backoff_base_ms: 1,
        default_max_pages: 10,
        jst_window_minutes: 6,
        jst: AppCredentials::default(),
        yonsuite_base_url: None,
        yonsuite: AppCredentials::default(),
        tiktok_business: AppCredentials::default(),
    }
}

async fn insert_shop_tenant(pool: &sqlx::PgPool, base_url: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO tenants (vendor, slug, name, app_key, app_secret, settings) \
         VALUES ('tiktok_shop', 'tts-vn', 'TikTok VN', 'app-key', 'app-secret', $1) RETURNING id",
    )
    .bind(json!({ "base_url": base_url, "shop_id": "7001" }))
    .fetch_one(pool)
    .await
    .expect("insert tenant")
}

#[sqlx::test(migrations = "../../migrations")]
async fn tiktok_shop_callback_stores_tokens_and_shop_cipher(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/token/get"))
        .and(query_param("auth_code", "code-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "access_token_expire_in": 1_900_000_000,
                "open_id": "open-1",
                "seller_name": "Demo Seller"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/authorization/202309/shops"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": { "shops": [
                { "id": "7000", "cipher": "ROW_other" },
                { "id": "7001", "cipher": "ROW_mine" }
            ] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = insert_shop_tenant(&pool, &server.uri()).await;

    let tenant = complete_authorization(
        &pool,
        &test_config(),
        Vendor::TiktokShop,
        "tts-vn",
        "code-123",
    )
    .await
    .expect("authorisation should succeed");

    assert_eq!(tenant.id, id);
    assert_eq!(tenant.auth_status, "authorized");
    assert_eq!(tenant.access_token.as_deref(), Some("at-1"));
    assert_eq!(tenant.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(tenant.external_ref.as_deref(), Some("ROW_mine"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn callback_rejects_unknown_or_mismatched_tenant(pool: sqlx::PgPool) {
    insert_shop_tenant(&pool, "http://127.0.0.1:9").await;
    let config = test_config();

    let err = complete_authorization(&pool, &config, Vendor::TiktokShop, "nobody", "c")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::UnknownTenant(ref slug) if slug == "nobody"));

    let err = complete_authorization(&pool, &config, Vendor::Lazada, "tts-vn", "c")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::WrongVendor {
            vendor: Vendor::Lazada,
            ..
        }
    ));
}
