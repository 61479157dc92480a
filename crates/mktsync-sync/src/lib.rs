//! The fetch → map → upsert → advance-watermark pipeline shared by every
//! vendor, plus the per-tenant fan-out that drives it.
//!
//! A [`RecordSource`] pages vendor data as [`mktsync_core::NormalizedRecord`]s;
//! a [`RecordSink`] stores them. [`run_entity_sync`] connects the two for one
//! tenant and entity, and [`run_fanout`] runs that work across tenants with
//! bounded concurrency.

pub mod clients;
pub mod credentials;
pub mod fanout;
pub mod jobs;
pub mod oauth;
pub mod pipeline;
pub mod runner;
pub mod sink;
pub mod source;
pub mod sources;

use mktsync_connectors::ConnectorError;
use mktsync_core::{CoreError, EntityKind, Vendor};
use mktsync_db::DbError;
use thiserror::Error;

pub use clients::VendorClient;
pub use credentials::{
    ensure_fresh_token, refresh_expiring_tokens, RefreshSummary, CRON_REFRESH_SKEW_SECS,
    SYNC_REFRESH_SKEW_SECS,
};
pub use fanout::{run_fanout, FanoutSummary, TenantOutcome};
pub use jobs::SyncJob;
pub use oauth::{authorization_url, complete_authorization, redirect_uri};
pub use pipeline::{run_entity_sync, EntitySyncReport, SyncOptions, TenantScope};
pub use runner::{run_sync, SyncRequest, SyncRunSummary, TenantSyncReport, TriggerSource};
pub use sink::{MemorySink, PgSink, RecordSink};
pub use source::{RecordSource, SourcePage, SyncWindow, WatermarkMode};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("tenant {tenant} has no {what} configured")]
    MissingCredential { tenant: String, what: &'static str },

    #[error("{entity} cannot be synced with a {vendor} client")]
    UnsupportedEntity { vendor: Vendor, entity: EntityKind },

    #[error("token refresh failed for tenant {tenant}: {source}")]
    TokenRefresh {
        tenant: String,
        #[source]
        source: ConnectorError,
    },

    #[error("no active tenants matched {0}")]
    NoTenants(String),

    #[error("all {0} tenants failed")]
    AllTenantsFailed(usize),

    #[error("no tenant with slug '{0}'")]
    UnknownTenant(String),

    #[error("tenant '{tenant}' is not a {vendor} tenant")]
    WrongVendor { tenant: String, vendor: Vendor },

    #[error("{0} tenants are not authorised through OAuth")]
    OAuthUnsupported(Vendor),
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        SyncError::Db(DbError::Sqlx(err))
    }
}
