//! Manual sync trigger. The run is spawned in the background and tracked
//! through `/api/v1/sync-runs`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use mktsync_core::{EntityKind, Vendor};
use mktsync_sync::{SyncRequest, TriggerSource};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct TriggerQuery {
    pub entity: Option<String>,
    pub tenant: Option<String>,
    pub max_pages: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct TriggerAccepted {
    vendor: Vendor,
    entity: Option<&'static str>,
    tenants: usize,
}

pub(super) async fn trigger_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(vendor): Path<String>,
    Query(query): Query<TriggerQuery>,
) -> Result<(StatusCode, Json<ApiResponse<TriggerAccepted>>), ApiError> {
    let invalid = |message: String| ApiError::new(req_id.0.clone(), "validation_error", message);

    let vendor: Vendor = vendor
        .parse()
        .map_err(|e: mktsync_core::CoreError| invalid(e.to_string()))?;
    let entity = query
        .entity
        .as_deref()
        .map(|name| EntityKind::find(vendor, name))
        .transpose()
        .map_err(|e| invalid(e.to_string()))?;
    if query.max_pages == Some(0) {
        return Err(invalid("max_pages must be at least 1".to_owned()));
    }

    let mut tenants = mktsync_db::list_active_tenants(&state.pool, Some(vendor))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    if let Some(slug) = query.tenant.as_deref() {
        tenants.retain(|t| t.slug == slug);
    }
    if tenants.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("no active {vendor} tenants match the request"),
        ));
    }

    let request = SyncRequest {
        entity,
        tenant_slug: query.tenant,
        max_pages: query.max_pages,
        ..SyncRequest::vendor(vendor, TriggerSource::Api)
    };
    let (pool, config) = (state.pool.clone(), state.config.clone());
    tokio::spawn(async move {
        match mktsync_sync::run_sync(&pool, &config, &request).await {
            Ok(summary) => tracing::info!(
                run_id = ?summary.run_id,
                %vendor,
                records = summary.records,
                "api-triggered sync finished"
            ),
            Err(e) => tracing::error!(%vendor, error = %e, "api-triggered sync failed"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: TriggerAccepted {
                vendor,
                entity: entity.map(EntityKind::as_str),
                tenants: tenants.len(),
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::super::{build_app, test_support::test_config, AppState};
    use crate::middleware::AuthState;

    async fn post(pool: sqlx::PgPool, uri: &str) -> StatusCode {
        let auth = AuthState::from_keys("", true).expect("auth");
        let app = build_app(
            AppState {
                pool,
                config: test_config(),
            },
            auth,
        );
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
        .status()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unknown_vendor_is_rejected(pool: sqlx::PgPool) {
        assert_eq!(post(pool, "/api/v1/sync/shopee").await, StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn entity_of_another_vendor_is_rejected(pool: sqlx::PgPool) {
        assert_eq!(
            post(pool, "/api/v1/sync/jst?entity=campaign").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn vendor_without_tenants_is_not_found(pool: sqlx::PgPool) {
        assert_eq!(post(pool, "/api/v1/sync/yonsuite").await, StatusCode::NOT_FOUND);
    }
}
