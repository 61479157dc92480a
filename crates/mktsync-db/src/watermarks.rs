//! Database operations for the `watermarks` table.

use mktsync_core::{EntityKind, Watermark};
use sqlx::PgExecutor;

use crate::DbError;

/// Loads the saved position for a tenant's entity, if any.
///
/// # Errors
///
/// Returns [`DbError::InvalidStoredValue`] if the stored pair does not parse,
/// or [`DbError::Sqlx`] if the query fails.
pub async fn get_watermark<'e, E: PgExecutor<'e>>(
    executor: E,
    tenant_id: i64,
    entity: EntityKind,
) -> Result<Option<Watermark>, DbError> {
    let row: Option<(String, String)> = sqlx::query_as(
        "SELECT kind, value FROM watermarks WHERE tenant_id = $1 AND entity = $2",
    )
    .bind(tenant_id)
    .bind(entity.as_str())
    .fetch_optional(executor)
    .await?;

    row.map(|(kind, value)| Watermark::from_parts(&kind, &value))
        .transpose()
        .map_err(DbError::from)
}

/// Saves the position for a tenant's entity, replacing any previous one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn set_watermark<'e, E: PgExecutor<'e>>(
    executor: E,
    tenant_id: i64,
    entity: EntityKind,
    watermark: &Watermark,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO watermarks (tenant_id, entity, kind, value) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (tenant_id, entity) DO UPDATE SET \
             kind       = EXCLUDED.kind, \
             value      = EXCLUDED.value, \
             updated_at = NOW()",
    )
    .bind(tenant_id)
    .bind(entity.as_str())
    .bind(watermark.kind())
    .bind(watermark.value_string())
    .execute(executor)
    .await?;
    Ok(())
}

/// Forgets the position so the next run starts from the beginning.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_watermark<'e, E: PgExecutor<'e>>(
    executor: E,
    tenant_id: i64,
    entity: EntityKind,
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM watermarks WHERE tenant_id = $1 AND entity = $2")
        .bind(tenant_id)
        .bind(entity.as_str())
        .execute(executor)
        .await?;
    Ok(())
}
