//! Offline unit tests for mktsync-db pool configuration and row types.
//! These run without a database.

use mktsync_db::{DbError, PoolConfig, SyncRunRow, TreeLinkSummary, UpsertOutcome};

#[test]
fn pool_config_default_values() {
    let config = PoolConfig::default();
    assert_eq!(config.max_connections, 10);
    assert_eq!(config.min_connections, 1);
    assert_eq!(config.acquire_timeout_secs, 10);
}

#[test]
fn sync_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = SyncRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        vendor: "lazada".to_string(),
        entity: Some("lazada.order".to_string()),
        trigger_source: "scheduler".to_string(),
        status: "queued".to_string(),
        started_at: None,
        completed_at: None,
        records_processed: 0_i32,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.vendor, "lazada");
    assert_eq!(row.entity.as_deref(), Some("lazada.order"));
    assert!(row.started_at.is_none());
}

#[test]
fn transition_error_names_expected_status() {
    let err = DbError::InvalidSyncRunTransition {
        id: 42,
        expected_status: "running",
    };
    assert_eq!(err.to_string(), "sync run 42 is not in expected status 'running'");
}

#[test]
fn outcome_and_summary_compare_by_value() {
    assert_eq!(
        UpsertOutcome { id: 3, created: true },
        UpsertOutcome { id: 3, created: true }
    );
    assert_eq!(TreeLinkSummary::default().linked, 0);
}
