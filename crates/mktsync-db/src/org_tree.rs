//! Parent linking for tree-shaped entities (YonSuite org units).
//!
//! Records arrive with a vendor `parent_external_id`; linking resolves it to
//! the local `parent_id` and rebuilds `tree_path` as `/root/child/...` from
//! external ids. Self-parented records, dangling parents and members of a
//! parent loop end up as roots; records below a loop stay attached to it.

use mktsync_core::EntityKind;
use sqlx::{Connection, PgConnection};

use crate::DbError;

/// Counts from one [`link_parents`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeLinkSummary {
    /// Records attached to a parent.
    pub linked: u64,
    /// Records reached from a root when rebuilding paths.
    pub pathed: u64,
    /// Records cut loose because their ancestry looped.
    pub cycles_broken: u64,
}

/// Resolves parents and recomputes paths for every record of
/// `(tenant_id, entity)` in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing changes then.
pub async fn link_parents(
    conn: &mut PgConnection,
    tenant_id: i64,
    entity: EntityKind,
) -> Result<TreeLinkSummary, DbError> {
    let mut tx = conn.begin().await?;
    let entity = entity.as_str();

    sqlx::query(
        "UPDATE synced_records c \
         SET parent_id = p.id \
         FROM synced_records p \
         WHERE c.tenant_id = $1 AND c.entity = $2 \
           AND p.tenant_id = c.tenant_id AND p.entity = c.entity \
           AND p.external_id = c.parent_external_id \
           AND p.id <> c.id",
    )
    .bind(tenant_id)
    .bind(entity)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE synced_records c \
         SET parent_id = NULL \
         WHERE c.tenant_id = $1 AND c.entity = $2 \
           AND (c.parent_external_id IS NULL \
                OR c.parent_external_id = c.external_id \
                OR NOT EXISTS ( \
                    SELECT 1 FROM synced_records p \
                    WHERE p.tenant_id = c.tenant_id AND p.entity = c.entity \
                      AND p.external_id = c.parent_external_id))",
    )
    .bind(tenant_id)
    .bind(entity)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE synced_records SET tree_path = NULL WHERE tenant_id = $1 AND entity = $2",
    )
    .bind(tenant_id)
    .bind(entity)
    .execute(&mut *tx)
    .await?;

    let mut pathed = write_paths(&mut *tx, tenant_id, entity).await?;

    // Records still without a path sit on a loop or below one. Only the loop
    // members lose their parent; whatever hangs below them keeps its links.
    let cycles_broken = sqlx::query(
        "WITH RECURSIVE walk(start_id, id) AS ( \
             SELECT id, parent_id FROM synced_records \
             WHERE tenant_id = $1 AND entity = $2 \
               AND tree_path IS NULL AND parent_id IS NOT NULL \
           UNION \
             SELECT w.start_id, r.parent_id \
             FROM walk w JOIN synced_records r ON r.id = w.id \
             WHERE r.parent_id IS NOT NULL AND w.id <> w.start_id \
         ) \
         UPDATE synced_records SET parent_id = NULL \
         WHERE id IN (SELECT start_id FROM walk WHERE id = start_id)",
    )
    .bind(tenant_id)
    .bind(entity)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if cycles_broken > 0 {
        pathed = write_paths(&mut *tx, tenant_id, entity).await?;
    }

    let linked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM synced_records \
         WHERE tenant_id = $1 AND entity = $2 AND parent_id IS NOT NULL",
    )
    .bind(tenant_id)
    .bind(entity)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(TreeLinkSummary {
        linked: u64::try_from(linked).unwrap_or(0),
        pathed,
        cycles_broken,
    })
}

/// Rewrites `tree_path` for everything reachable from a root; returns how
/// many records got a path.
async fn write_paths(
    conn: &mut PgConnection,
    tenant_id: i64,
    entity: &str,
) -> Result<u64, DbError> {
    let written = sqlx::query(
        "WITH RECURSIVE tree AS ( \
             SELECT id, '/' || external_id AS path \
             FROM synced_records \
             WHERE tenant_id = $1 AND entity = $2 AND parent_id IS NULL \
           UNION ALL \
             SELECT c.id, t.path || '/' || c.external_id \
             FROM synced_records c \
             JOIN tree t ON c.parent_id = t.id \
         ) \
         UPDATE synced_records r SET tree_path = tree.path \
         FROM tree WHERE r.id = tree.id",
    )
    .bind(tenant_id)
    .bind(entity)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(written)
}
