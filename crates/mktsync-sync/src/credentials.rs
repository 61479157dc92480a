//! Access-token upkeep for tenants whose vendor tokens expire.

use chrono::{DateTime, Duration, Utc};
use mktsync_connectors::{HttpSettings, TokenGrant};
use mktsync_core::{AppConfig, AuthStatus, Vendor};
use mktsync_db::{TenantRow, TenantTokens};
use sqlx::PgPool;

use crate::clients::VendorClient;
use crate::SyncError;

/// Refresh window used right before a sync.
pub const SYNC_REFRESH_SKEW_SECS: i64 = 5 * 60;
/// Refresh window used by the scheduled refresh job.
pub const CRON_REFRESH_SKEW_SECS: i64 = 24 * 60 * 60;

/// Returns a usable access token for `tenant`, refreshing and persisting a
/// new one when the stored token is missing or expires within `skew`.
///
/// JST and TikTok Business tokens are long-lived and only read. Lazada and
/// TikTok Shop refresh through their refresh token; YonSuite requests a new
/// self-app token.
///
/// # Errors
///
/// - [`SyncError::MissingCredential`] if there is no token to use or refresh.
/// - [`SyncError::TokenRefresh`] if the vendor rejects the refresh; the
///   tenant is marked `error` first.
/// - [`SyncError::Db`] if the new token cannot be stored.
pub async fn ensure_fresh_token(
    pool: &PgPool,
    client: &VendorClient,
    tenant: &TenantRow,
    now: DateTime<Utc>,
    skew: Duration,
) -> Result<String, SyncError> {
    let missing = |what| SyncError::MissingCredential {
        tenant: tenant.slug.clone(),
        what,
    };

    let refresh = match client {
        VendorClient::Jst(_) | VendorClient::TiktokBusiness(_) => {
            return tenant
                .access_token
                .clone()
                .ok_or_else(|| missing("access token"));
        }
        _ if !tenant.token_expires_within(now, skew) => {
            return tenant
                .access_token
                .clone()
                .ok_or_else(|| missing("access token"));
        }
        VendorClient::Lazada(lazada) => {
            let refresh_token = tenant
                .refresh_token
                .as_deref()
                .ok_or_else(|| missing("refresh token"))?;
            lazada.refresh_token(refresh_token).await
        }
        VendorClient::TiktokShop(shop) => {
            let refresh_token = tenant
                .refresh_token
                .as_deref()
                .ok_or_else(|| missing("refresh token"))?;
            shop.refresh_token(refresh_token).await
        }
        VendorClient::Yonsuite(yonsuite) => yonsuite.get_access_token().await,
    };

    match refresh {
        Ok(grant) => {
            // Refreshes never move the tenant to another account or shop.
            let grant = TokenGrant {
                external_ref: None,
                ..grant
            };
            store_grant(pool, tenant.id, &grant).await?;
            tracing::info!(
                tenant = %tenant.slug,
                expires_at = ?grant.expires_at,
                "access token refreshed"
            );
            Ok(grant.access_token)
        }
        Err(source) => {
            tracing::error!(tenant = %tenant.slug, error = %source, "token refresh failed");
            let message = source.to_string();
            let status = AuthStatus::Error;
            let recorded =
                mktsync_db::set_tenant_auth_status(pool, tenant.id, status, Some(&message)).await;
            if let Err(e) = recorded {
                tracing::warn!(tenant = %tenant.slug, error = %e, "could not record auth failure");
            }
            Err(SyncError::TokenRefresh {
                tenant: tenant.slug.clone(),
                source,
            })
        }
    }
}

/// Persists a token grant and marks the tenant authorized. A grant without
/// an external ref keeps the stored one.
///
/// # Errors
///
/// Returns [`SyncError::Db`] if the update fails.
pub async fn store_grant(
    pool: &PgPool,
    tenant_id: i64,
    grant: &TokenGrant,
) -> Result<(), SyncError> {
    let tokens = TenantTokens {
        access_token: grant.access_token.clone(),
        refresh_token: grant.refresh_token.clone(),
        expires_at: grant.expires_at,
        refresh_expires_at: grant.refresh_expires_at,
        external_ref: grant.external_ref.clone(),
    };
    mktsync_db::update_tenant_tokens(pool, tenant_id, &tokens).await?;
    Ok(())
}

/// Counts from [`refresh_expiring_tokens`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub checked: usize,
    pub refreshed: usize,
    pub failed: usize,
}

/// Refreshes every active tenant token expiring within `skew`, optionally
/// restricted to one tenant slug. Failures are logged and counted.
///
/// # Errors
///
/// Returns [`SyncError::Db`] if tenants cannot be listed.
pub async fn refresh_expiring_tokens(
    pool: &PgPool,
    config: &AppConfig,
    tenant_slug: Option<&str>,
    skew: Duration,
) -> Result<RefreshSummary, SyncError> {
    let http = HttpSettings::from_app_config(config);
    let now = Utc::now();
    let mut summary = RefreshSummary::default();

    let tenants = mktsync_db::list_active_tenants(pool, None).await?;
    for tenant in tenants
        .iter()
        .filter(|t| tenant_slug.is_none_or(|slug| t.slug == slug))
    {
        let Ok(vendor) = tenant.vendor() else {
            tracing::warn!(
                tenant = %tenant.slug,
                vendor = %tenant.vendor,
                "unknown vendor; skipping"
            );
            continue;
        };
        if matches!(vendor, Vendor::Jst | Vendor::TiktokBusiness) {
            continue;
        }
        summary.checked += 1;
        if !tenant.token_expires_within(now, skew) {
            continue;
        }

        let result = match VendorClient::for_tenant(config, &http, tenant) {
            Ok(client) => ensure_fresh_token(pool, &client, tenant, now, skew).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(_) => summary.refreshed += 1,
            Err(e) => {
                tracing::error!(
                    tenant = %tenant.slug,
                    error = %e,
                    "scheduled token refresh failed"
                );
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        checked = summary.checked,
        refreshed = summary.refreshed,
        failed = summary.failed,
        "token refresh pass finished"
    );
    Ok(summary)
}
