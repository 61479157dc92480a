use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use mktsync_core::Vendor;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct TenantsQuery {
    pub vendor: Option<String>,
}

/// Tenant as exposed over the API; credentials never leave the database.
#[derive(Debug, Serialize)]
pub(super) struct TenantItem {
    slug: String,
    vendor: String,
    name: String,
    external_ref: Option<String>,
    auth_status: String,
    token_expires_at: Option<DateTime<Utc>>,
    last_sync_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

pub(super) async fn list_tenants(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TenantsQuery>,
) -> Result<Json<ApiResponse<Vec<TenantItem>>>, ApiError> {
    let vendor = query
        .vendor
        .as_deref()
        .map(str::parse::<Vendor>)
        .transpose()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let rows = mktsync_db::list_active_tenants(&state.pool, vendor)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| TenantItem {
            slug: row.slug,
            vendor: row.vendor,
            name: row.name,
            external_ref: row.external_ref,
            auth_status: row.auth_status,
            token_expires_at: row.token_expires_at,
            last_sync_at: row.last_sync_at,
            last_error: row.last_error,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::TenantItem;

    #[test]
    fn tenant_item_carries_no_secrets() {
        let item = TenantItem {
            slug: "lzd-vn".to_string(),
            vendor: "lazada".to_string(),
            name: "Lazada VN".to_string(),
            external_ref: None,
            auth_status: "authorized".to_string(),
            token_expires_at: None,
            last_sync_at: None,
            last_error: None,
        };
        let json = serde_json::to_string(&item).expect("serialize tenant");
        assert!(json.contains("\"slug\":\"lzd-vn\""));
        assert!(!json.contains("token\""));
        assert!(!json.contains("secret"));
    }
}
