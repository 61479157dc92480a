//! Seller consent callbacks: `/oauth/{vendor}/callback?code=..&state=<tenant slug>`.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use mktsync_core::Vendor;
use mktsync_sync::SyncError;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CallbackQuery {
    /// TikTok Business names it `auth_code`.
    #[serde(alias = "auth_code")]
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct AuthorizedTenant {
    tenant: String,
    vendor: String,
    auth_status: String,
    external_ref: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
}

pub(super) async fn callback(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(vendor): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<ApiResponse<AuthorizedTenant>>, ApiError> {
    let invalid = |message: String| ApiError::new(req_id.0.clone(), "validation_error", message);

    let vendor: Vendor = vendor
        .parse()
        .map_err(|e: mktsync_core::CoreError| invalid(e.to_string()))?;
    if let Some(error) = query.error.as_deref() {
        let detail = query.error_description.as_deref().unwrap_or(error);
        tracing::warn!(%vendor, error, "seller declined authorisation");
        return Err(invalid(format!("authorisation declined: {detail}")));
    }
    let (Some(code), Some(tenant_slug)) = (query.code.as_deref(), query.state.as_deref()) else {
        return Err(invalid("callback requires code and state".to_owned()));
    };

    let tenant = mktsync_sync::complete_authorization(
        &state.pool,
        &state.config,
        vendor,
        tenant_slug,
        code,
    )
    .await
    .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: AuthorizedTenant {
            tenant: tenant.slug,
            vendor: tenant.vendor,
            auth_status: tenant.auth_status,
            external_ref: tenant.external_ref,
            token_expires_at: tenant.token_expires_at,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn map_sync_error(request_id: String, error: &SyncError) -> ApiError {
    let code = match error {
        SyncError::UnknownTenant(_) => "not_found",
        SyncError::WrongVendor { .. }
        | SyncError::OAuthUnsupported(_)
        | SyncError::MissingCredential { .. }
        | SyncError::Core(_) => "validation_error",
        SyncError::Connector(_) | SyncError::TokenRefresh { .. } => "upstream_error",
        _ => "internal_error",
    };
    tracing::error!(error = %error, code, "authorisation callback failed");
    ApiError::new(request_id, code, error.to_string())
}
