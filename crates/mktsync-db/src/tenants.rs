//! Database operations for the `tenants` table.

use chrono::{DateTime, Utc};
use mktsync_core::{AuthStatus, CoreError, Vendor};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

const TENANT_COLUMNS: &str = "id, vendor, slug, name, external_ref, app_key, app_secret, \
     access_token, refresh_token, token_expires_at, refresh_expires_at, auth_status, \
     sync_since, is_active, settings, last_sync_at, last_error, created_at, updated_at";

/// A row from the `tenants` table.
#[derive(Clone, sqlx::FromRow)]
pub struct TenantRow {
    pub id: i64,
    pub vendor: String,
    pub slug: String,
    pub name: String,
    pub external_ref: Option<String>,
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
    pub auth_status: String,
    pub sync_since: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Vendor-specific knobs seeded from `tenants.yaml`.
    pub settings: Value,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for TenantRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("TenantRow")
            .field("id", &self.id)
            .field("vendor", &self.vendor)
            .field("slug", &self.slug)
            .field("name", &self.name)
            .field("external_ref", &self.external_ref)
            .field("app_key", &self.app_key)
            .field("app_secret", &redact(&self.app_secret))
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("token_expires_at", &self.token_expires_at)
            .field("auth_status", &self.auth_status)
            .field("sync_since", &self.sync_since)
            .field("is_active", &self.is_active)
            .field("settings", &self.settings)
            .field("last_sync_at", &self.last_sync_at)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl TenantRow {
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownVendor`] if the stored vendor is unknown.
    pub fn vendor(&self) -> Result<Vendor, CoreError> {
        self.vendor.parse()
    }

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAuthStatus`] if the stored status is unknown.
    pub fn auth_status(&self) -> Result<AuthStatus, CoreError> {
        self.auth_status.parse()
    }

    /// Text setting, accepting numbers too.
    #[must_use]
    pub fn setting_str(&self, key: &str) -> Option<String> {
        self.settings
            .get(key)
            .and_then(mktsync_core::mapping::value_as_string)
            .filter(|s| !s.trim().is_empty())
    }

    /// Positive integer setting, falling back to `default`.
    #[must_use]
    pub fn setting_u32(&self, key: &str, default: u32) -> u32 {
        self.settings
            .get(key)
            .and_then(mktsync_core::mapping::value_as_i64)
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(default)
    }

    /// Whether the access token is missing or expires within `skew`.
    #[must_use]
    pub fn token_expires_within(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        if self.access_token.is_none() {
            return true;
        }
        self.token_expires_at
            .is_some_and(|expires_at| expires_at <= now + skew)
    }
}

/// Fresh credentials to store on a tenant after an OAuth exchange or refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct TenantTokens {
    pub access_token: String,
    /// `None` keeps the stored refresh token.
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
    /// `None` keeps the stored external reference.
    pub external_ref: Option<String>,
}

impl std::fmt::Debug for TenantTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantTokens")
            .field("access_token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .field("external_ref", &self.external_ref)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns active tenants, optionally restricted to one vendor, ordered by slug.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_tenants(
    pool: &PgPool,
    vendor: Option<Vendor>,
) -> Result<Vec<TenantRow>, DbError> {
    let sql = format!(
        "SELECT {TENANT_COLUMNS} FROM tenants \
         WHERE is_active = true AND ($1::text IS NULL OR vendor = $1) \
         ORDER BY slug"
    );
    let rows = sqlx::query_as::<_, TenantRow>(&sql)
        .bind(vendor.map(Vendor::as_str))
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns a tenant by slug, active or not, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_tenant_by_slug(pool: &PgPool, slug: &str) -> Result<Option<TenantRow>, DbError> {
    let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE slug = $1");
    let row = sqlx::query_as::<_, TenantRow>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Fetches a tenant by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no tenant has `id`, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_tenant(pool: &PgPool, id: i64) -> Result<TenantRow, DbError> {
    let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1");
    sqlx::query_as::<_, TenantRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Stores new tokens and marks the tenant `authorized`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no tenant has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_tenant_tokens(
    pool: &PgPool,
    id: i64,
    tokens: &TenantTokens,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE tenants SET \
             access_token       = $1, \
             refresh_token      = COALESCE($2, refresh_token), \
             token_expires_at   = $3, \
             refresh_expires_at = COALESCE($4, refresh_expires_at), \
             external_ref       = COALESCE($5, external_ref), \
             auth_status        = 'authorized', \
             last_error         = NULL, \
             updated_at         = NOW() \
         WHERE id = $6",
    )
    .bind(&tokens.access_token)
    .bind(&tokens.refresh_token)
    .bind(tokens.expires_at)
    .bind(tokens.refresh_expires_at)
    .bind(&tokens.external_ref)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Sets `auth_status`, recording `error` in `last_error` when given.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_tenant_auth_status(
    pool: &PgPool,
    id: i64,
    status: AuthStatus,
    error: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE tenants \
         SET auth_status = $1, last_error = COALESCE($2, last_error), updated_at = NOW() \
         WHERE id = $3",
    )
    .bind(status.as_str())
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Records the end of a sync for the tenant: `last_sync_at = NOW()` and the
/// outcome's error (cleared on success).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn touch_tenant_sync(pool: &PgPool, id: i64, error: Option<&str>) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE tenants \
         SET last_sync_at = NOW(), last_error = $1, updated_at = NOW() \
         WHERE id = $2",
    )
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
