use std::env::VarError;

use mktsync_core::TenantConfig;
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// Upsert tenants from `tenants.yaml` into the database.
///
/// Secrets are resolved through `lookup` from the env-var names the config
/// references. A secret that resolves to nothing never overwrites one already
/// stored (tokens obtained through OAuth survive a re-seed). A tenant seeded
/// with an access token is marked `authorized`.
///
/// Returns the number of tenants processed. All upserts run inside a single
/// transaction; if any operation fails the entire batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_tenants<F>(
    pool: &PgPool,
    tenants: &[TenantConfig],
    lookup: F,
) -> Result<usize, DbError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for tenant in tenants {
        let secrets = tenant.resolve_secrets(&lookup);
        let settings = Value::Object(tenant.settings.clone());

        sqlx::query(
            "INSERT INTO tenants \
                 (vendor, slug, name, external_ref, app_key, app_secret, access_token, \
                  auth_status, sync_since, is_active, settings) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, \
                     CASE WHEN $7::text IS NULL THEN 'pending' ELSE 'authorized' END, \
                     $8, $9, $10) \
             ON CONFLICT (slug) DO UPDATE SET \
                 vendor       = EXCLUDED.vendor, \
                 name         = EXCLUDED.name, \
                 external_ref = COALESCE(EXCLUDED.external_ref, tenants.external_ref), \
                 app_key      = COALESCE(EXCLUDED.app_key, tenants.app_key), \
                 app_secret   = COALESCE(EXCLUDED.app_secret, tenants.app_secret), \
                 access_token = COALESCE(EXCLUDED.access_token, tenants.access_token), \
                 auth_status  = CASE WHEN EXCLUDED.access_token IS NULL \
                                     THEN tenants.auth_status ELSE 'authorized' END, \
                 sync_since   = EXCLUDED.sync_since, \
                 is_active    = EXCLUDED.is_active, \
                 settings     = EXCLUDED.settings, \
                 updated_at   = NOW()",
        )
        .bind(tenant.vendor.as_str())
        .bind(tenant.slug())
        .bind(&tenant.name)
        .bind(&tenant.external_ref)
        .bind(&secrets.app_key)
        .bind(&secrets.app_secret)
        .bind(&secrets.access_token)
        .bind(tenant.sync_since)
        .bind(tenant.active)
        .bind(settings)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
