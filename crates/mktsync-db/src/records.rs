//! Database operations for `synced_records`, `synced_record_lines` and
//! `record_field_changes`.

use chrono::{DateTime, Utc};
use mktsync_core::{EntityKind, NormalizedRecord};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Connection, PgConnection, PgExecutor};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `synced_records` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordRow {
    pub id: i64,
    pub tenant_id: i64,
    pub entity: String,
    pub external_id: String,
    pub fields: Value,
    pub raw_payload: Value,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub sync_state: String,
    pub error_message: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub parent_external_id: Option<String>,
    pub parent_id: Option<i64>,
    pub tree_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `synced_record_lines` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordLineRow {
    pub id: i64,
    pub record_id: i64,
    pub line_no: i32,
    pub external_id: Option<String>,
    pub fields: Value,
    pub raw_payload: Value,
}

/// A row from the `record_field_changes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FieldChangeRow {
    pub id: i64,
    pub record_id: i64,
    pub field: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub changed_at: DateTime<Utc>,
}

/// Result of [`upsert_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: i64,
    /// `true` when the row was inserted, `false` when an existing row was
    /// overwritten.
    pub created: bool,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts or overwrites the record keyed by `(tenant_id, entity, external_id)`.
///
/// Last write wins: every mapped field, the raw payload and the parent link
/// are replaced, `sync_state` becomes `synced` and any previous error is
/// cleared. For entities with lines the stored lines are replaced wholesale.
/// Tracked fields (see [`EntityKind::tracked_fields`]) get a history row on
/// create and on every change of value. All of it commits atomically.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written then.
pub async fn upsert_record(
    conn: &mut PgConnection,
    tenant_id: i64,
    entity: EntityKind,
    record: &NormalizedRecord,
) -> Result<UpsertOutcome, DbError> {
    let mut tx = conn.begin().await?;

    let tracked = entity.tracked_fields();
    let previous: Option<Value> = if tracked.is_empty() {
        None
    } else {
        sqlx::query_scalar(
            "SELECT fields FROM synced_records \
             WHERE tenant_id = $1 AND entity = $2 AND external_id = $3 \
             FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(entity.as_str())
        .bind(&record.external_id)
        .fetch_optional(&mut *tx)
        .await?
    };

    let (id, created): (i64, bool) = sqlx::query_as(
        "INSERT INTO synced_records \
             (tenant_id, entity, external_id, fields, raw_payload, source_updated_at, \
              parent_external_id, sync_state, error_message, last_synced_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, 'synced', NULL, NOW()) \
         ON CONFLICT (tenant_id, entity, external_id) DO UPDATE SET \
             fields             = EXCLUDED.fields, \
             raw_payload        = EXCLUDED.raw_payload, \
             source_updated_at  = EXCLUDED.source_updated_at, \
             parent_external_id = EXCLUDED.parent_external_id, \
             sync_state         = 'synced', \
             error_message      = NULL, \
             last_synced_at     = NOW(), \
             updated_at         = NOW() \
         RETURNING id, (xmax = 0) AS created",
    )
    .bind(tenant_id)
    .bind(entity.as_str())
    .bind(&record.external_id)
    .bind(Json(&record.fields))
    .bind(&record.raw_payload)
    .bind(record.source_updated_at)
    .bind(&record.parent_external_id)
    .fetch_one(&mut *tx)
    .await?;

    if entity.has_lines() {
        sqlx::query("DELETE FROM synced_record_lines WHERE record_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for (line_no, line) in (1_i32..).zip(&record.lines) {
            sqlx::query(
                "INSERT INTO synced_record_lines \
                 (record_id, line_no, external_id, fields, raw_payload) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(id)
            .bind(line_no)
            .bind(&line.external_id)
            .bind(Json(&line.fields))
            .bind(&line.raw_payload)
            .execute(&mut *tx)
            .await?;
        }
    }

    for field in tracked {
        let new_value = record.fields.get(*field);
        match &previous {
            None => record_field_change(&mut *tx, id, field, None, new_value).await?,
            Some(old_fields) => {
                let old_value = old_fields.get(*field);
                if old_value != new_value {
                    record_field_change(&mut *tx, id, field, old_value, new_value).await?;
                }
            }
        }
    }

    tx.commit().await?;
    Ok(UpsertOutcome { id, created })
}

/// Appends one history row for a tracked field.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn record_field_change<'e, E: PgExecutor<'e>>(
    executor: E,
    record_id: i64,
    field: &str,
    old_value: Option<&Value>,
    new_value: Option<&Value>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO record_field_changes (record_id, field, old_value, new_value) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(record_id)
    .bind(field)
    .bind(old_value)
    .bind(new_value)
    .execute(executor)
    .await?;
    Ok(())
}

/// Flags a record as `error` with `message`. A record that was never stored
/// gets a placeholder row so the failure stays visible.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn mark_record_error<'e, E: PgExecutor<'e>>(
    executor: E,
    tenant_id: i64,
    entity: EntityKind,
    external_id: &str,
    message: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO synced_records (tenant_id, entity, external_id, sync_state, error_message) \
         VALUES ($1, $2, $3, 'error', $4) \
         ON CONFLICT (tenant_id, entity, external_id) DO UPDATE SET \
             sync_state    = 'error', \
             error_message = EXCLUDED.error_message, \
             updated_at    = NOW()",
    )
    .bind(tenant_id)
    .bind(entity.as_str())
    .bind(external_id)
    .bind(message)
    .execute(executor)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetches one record by its natural key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_record<'e, E: PgExecutor<'e>>(
    executor: E,
    tenant_id: i64,
    entity: EntityKind,
    external_id: &str,
) -> Result<Option<RecordRow>, DbError> {
    let row = sqlx::query_as::<_, RecordRow>(
        "SELECT id, tenant_id, entity, external_id, fields, raw_payload, source_updated_at, \
                sync_state, error_message, last_synced_at, parent_external_id, parent_id, \
                tree_path, created_at, updated_at \
         FROM synced_records \
         WHERE tenant_id = $1 AND entity = $2 AND external_id = $3",
    )
    .bind(tenant_id)
    .bind(entity.as_str())
    .bind(external_id)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Lines of a record in their original order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_record_lines<'e, E: PgExecutor<'e>>(
    executor: E,
    record_id: i64,
) -> Result<Vec<RecordLineRow>, DbError> {
    let rows = sqlx::query_as::<_, RecordLineRow>(
        "SELECT id, record_id, line_no, external_id, fields, raw_payload \
         FROM synced_record_lines \
         WHERE record_id = $1 \
         ORDER BY line_no",
    )
    .bind(record_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// History of tracked fields for a record, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_field_changes<'e, E: PgExecutor<'e>>(
    executor: E,
    record_id: i64,
) -> Result<Vec<FieldChangeRow>, DbError> {
    let rows = sqlx::query_as::<_, FieldChangeRow>(
        "SELECT id, record_id, field, old_value, new_value, changed_at \
         FROM record_field_changes \
         WHERE record_id = $1 \
         ORDER BY changed_at, id",
    )
    .bind(record_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Most recent vendor modification time stored for a tenant's entity.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_source_update<'e, E: PgExecutor<'e>>(
    executor: E,
    tenant_id: i64,
    entity: EntityKind,
) -> Result<Option<DateTime<Utc>>, DbError> {
    let latest: Option<DateTime<Utc>> = sqlx::query_scalar(
        "SELECT MAX(source_updated_at) FROM synced_records \
         WHERE tenant_id = $1 AND entity = $2",
    )
    .bind(tenant_id)
    .bind(entity.as_str())
    .fetch_one(executor)
    .await?;

    Ok(latest)
}

/// Number of stored records for a tenant's entity.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_records<'e, E: PgExecutor<'e>>(
    executor: E,
    tenant_id: i64,
    entity: EntityKind,
) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM synced_records WHERE tenant_id = $1 AND entity = $2",
    )
    .bind(tenant_id)
    .bind(entity.as_str())
    .fetch_one(executor)
    .await?;

    Ok(count)
}
