//! Where normalized records land: Postgres for real runs, memory for tests
//! and `--dry-run`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mktsync_core::{EntityKind, NormalizedRecord, Watermark};
use mktsync_db::{TreeLinkSummary, UpsertOutcome};
use sqlx::{pool::PoolConnection, Postgres};

use crate::SyncError;

/// Storage for one tenant's records and watermarks.
#[async_trait]
pub trait RecordSink: Send {
    async fn load_watermark(&mut self, entity: EntityKind) -> Result<Option<Watermark>, SyncError>;

    async fn save_watermark(
        &mut self,
        entity: EntityKind,
        watermark: &Watermark,
    ) -> Result<(), SyncError>;

    async fn clear_watermark(&mut self, entity: EntityKind) -> Result<(), SyncError>;

    /// Newest `source_updated_at` already stored for `entity`.
    async fn latest_source_update(
        &mut self,
        entity: EntityKind,
    ) -> Result<Option<DateTime<Utc>>, SyncError>;

    async fn upsert(
        &mut self,
        entity: EntityKind,
        record: &NormalizedRecord,
    ) -> Result<UpsertOutcome, SyncError>;

    async fn mark_error(
        &mut self,
        entity: EntityKind,
        external_id: &str,
        message: &str,
    ) -> Result<(), SyncError>;

    /// Called once after the page loop; tree entities relink their parents.
    async fn finish(&mut self, entity: EntityKind) -> Result<Option<TreeLinkSummary>, SyncError>;
}

/// Postgres sink bound to one pooled connection for the tenant's whole run.
pub struct PgSink {
    conn: PoolConnection<Postgres>,
    tenant_id: i64,
}

impl PgSink {
    #[must_use]
    pub fn new(conn: PoolConnection<Postgres>, tenant_id: i64) -> Self {
        Self { conn, tenant_id }
    }
}

#[async_trait]
impl RecordSink for PgSink {
    async fn load_watermark(&mut self, entity: EntityKind) -> Result<Option<Watermark>, SyncError> {
        Ok(mktsync_db::get_watermark(&mut *self.conn, self.tenant_id, entity).await?)
    }

    async fn save_watermark(
        &mut self,
        entity: EntityKind,
        watermark: &Watermark,
    ) -> Result<(), SyncError> {
        Ok(mktsync_db::set_watermark(&mut *self.conn, self.tenant_id, entity, watermark).await?)
    }

    async fn clear_watermark(&mut self, entity: EntityKind) -> Result<(), SyncError> {
        Ok(mktsync_db::clear_watermark(&mut *self.conn, self.tenant_id, entity).await?)
    }

    async fn latest_source_update(
        &mut self,
        entity: EntityKind,
    ) -> Result<Option<DateTime<Utc>>, SyncError> {
        Ok(mktsync_db::latest_source_update(&mut *self.conn, self.tenant_id, entity).await?)
    }

    async fn upsert(
        &mut self,
        entity: EntityKind,
        record: &NormalizedRecord,
    ) -> Result<UpsertOutcome, SyncError> {
        Ok(mktsync_db::upsert_record(&mut self.conn, self.tenant_id, entity, record).await?)
    }

    async fn mark_error(
        &mut self,
        entity: EntityKind,
        external_id: &str,
        message: &str,
    ) -> Result<(), SyncError> {
        mktsync_db::mark_record_error(
            &mut *self.conn,
            self.tenant_id,
            entity,
            external_id,
            message,
        )
        .await?;
        Ok(())
    }

    async fn finish(&mut self, entity: EntityKind) -> Result<Option<TreeLinkSummary>, SyncError> {
        if !entity.is_tree() {
            return Ok(None);
        }
        let summary = mktsync_db::link_parents(&mut self.conn, self.tenant_id, entity).await?;
        tracing::info!(
            tenant_id = self.tenant_id,
            %entity,
            linked = summary.linked,
            cycles_broken = summary.cycles_broken,
            "tree parents linked"
        );
        Ok(Some(summary))
    }
}

/// In-memory sink. Nothing leaves the process.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: HashMap<(EntityKind, String), NormalizedRecord>,
    pub watermarks: HashMap<EntityKind, Watermark>,
    pub errors: Vec<(EntityKind, String, String)>,
    failing: HashSet<String>,
    next_id: i64,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes upserts of these external ids fail.
    #[must_use]
    pub fn failing_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing = ids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn count(&self, entity: EntityKind) -> usize {
        self.records.keys().filter(|(e, _)| *e == entity).count()
    }

    #[must_use]
    pub fn get(&self, entity: EntityKind, external_id: &str) -> Option<&NormalizedRecord> {
        self.records.get(&(entity, external_id.to_owned()))
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn load_watermark(&mut self, entity: EntityKind) -> Result<Option<Watermark>, SyncError> {
        Ok(self.watermarks.get(&entity).cloned())
    }

    async fn save_watermark(
        &mut self,
        entity: EntityKind,
        watermark: &Watermark,
    ) -> Result<(), SyncError> {
        self.watermarks.insert(entity, watermark.clone());
        Ok(())
    }

    async fn clear_watermark(&mut self, entity: EntityKind) -> Result<(), SyncError> {
        self.watermarks.remove(&entity);
        Ok(())
    }

    async fn latest_source_update(
        &mut self,
        entity: EntityKind,
    ) -> Result<Option<DateTime<Utc>>, SyncError> {
        Ok(self
            .records
            .iter()
            .filter(|((e, _), _)| *e == entity)
            .filter_map(|(_, record)| record.source_updated_at)
            .max())
    }

    async fn upsert(
        &mut self,
        entity: EntityKind,
        record: &NormalizedRecord,
    ) -> Result<UpsertOutcome, SyncError> {
        if self.failing.contains(&record.external_id) {
            return Err(SyncError::Db(mktsync_db::DbError::NotFound));
        }
        let created = self
            .records
            .insert((entity, record.external_id.clone()), record.clone())
            .is_none();
        self.next_id += 1;
        Ok(UpsertOutcome {
            id: self.next_id,
            created,
        })
    }

    async fn mark_error(
        &mut self,
        entity: EntityKind,
        external_id: &str,
        message: &str,
    ) -> Result<(), SyncError> {
        self.errors
            .push((entity, external_id.to_owned(), message.to_owned()));
        Ok(())
    }

    async fn finish(&mut self, _entity: EntityKind) -> Result<Option<TreeLinkSummary>, SyncError> {
        Ok(None)
    }
}
