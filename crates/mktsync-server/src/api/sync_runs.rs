use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct SyncRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncRunItem {
    id: i64,
    sync_run_id: Uuid,
    vendor: String,
    entity: Option<String>,
    trigger_source: String,
    status: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    records_processed: i32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<mktsync_db::SyncRunRow> for SyncRunItem {
    fn from(row: mktsync_db::SyncRunRow) -> Self {
        Self {
            id: row.id,
            sync_run_id: row.public_id,
            vendor: row.vendor,
            entity: row.entity,
            trigger_source: row.trigger_source,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            records_processed: row.records_processed,
            error_message: row.error_message,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SyncRunTenantItem {
    tenant_id: i64,
    status: String,
    records_processed: i32,
    error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncRunDetail {
    #[serde(flatten)]
    run: SyncRunItem,
    tenants: Vec<SyncRunTenantItem>,
}

pub(super) async fn list_sync_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SyncRunsQuery>,
) -> Result<Json<ApiResponse<Vec<SyncRunItem>>>, ApiError> {
    let rows = mktsync_db::list_sync_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(SyncRunItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_sync_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(run_id): Path<i64>,
) -> Result<Json<ApiResponse<SyncRunDetail>>, ApiError> {
    let run = match mktsync_db::get_sync_run(&state.pool, run_id).await {
        Ok(run) => run,
        Err(mktsync_db::DbError::NotFound) => {
            return Err(ApiError::new(
                req_id.0,
                "not_found",
                format!("sync run {run_id} not found"),
            ));
        }
        Err(e) => return Err(map_db_error(req_id.0, &e)),
    };
    let tenants = mktsync_db::list_sync_run_tenants(&state.pool, run_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: SyncRunDetail {
            run: run.into(),
            tenants: tenants
                .into_iter()
                .map(|t| SyncRunTenantItem {
                    tenant_id: t.tenant_id,
                    status: t.status,
                    records_processed: t.records_processed,
                    error_message: t.error_message,
                })
                .collect(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::super::{build_app, test_support::test_config, AppState};
    use crate::middleware::AuthState;

    async fn get(pool: sqlx::PgPool, uri: &str) -> (StatusCode, serde_json::Value) {
        let auth = AuthState::from_keys("", true).expect("auth");
        let app = build_app(
            AppState {
                pool,
                config: test_config(),
            },
            auth,
        );
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&body).expect("json parse"))
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn run_detail_includes_tenant_outcomes(pool: sqlx::PgPool) {
        let tenant_id: i64 = sqlx::query_scalar(
            "INSERT INTO tenants (vendor, slug, name) \
             VALUES ('lazada', 'lzd-vn', 'Lazada VN') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .expect("insert tenant");
        let run = mktsync_db::create_sync_run(&pool, "lazada", Some("lazada.order"), "api")
            .await
            .expect("create run");
        mktsync_db::upsert_sync_run_tenant(&pool, run.id, tenant_id, "succeeded", Some(12), None)
            .await
            .expect("tenant outcome");

        let (status, json) = get(pool.clone(), &format!("/api/v1/sync-runs/{}", run.id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["vendor"], "lazada");
        assert_eq!(json["data"]["entity"], "lazada.order");
        assert_eq!(json["data"]["tenants"][0]["records_processed"], 12);

        let (status, json) = get(pool, "/api/v1/sync-runs?limit=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().map(Vec::len), Some(1));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn missing_run_is_not_found(pool: sqlx::PgPool) {
        let (status, json) = get(pool, "/api/v1/sync-runs/999999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }
}
