use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod entity;
pub mod mapping;
pub mod records;
pub mod tenants;
pub mod watermark;

pub use app_config::{AppConfig, AppCredentials, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use entity::{EntityKind, Vendor};
pub use mapping::{map_fields, Coercion, FieldMap, FieldSpec};
pub use records::{NormalizedLine, NormalizedRecord};
pub use tenants::{load_tenants, slugify, TenantConfig, TenantSecrets, TenantsFile};
pub use watermark::{AuthStatus, ResumePoint, SyncState, Watermark};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown vendor: {0}")]
    UnknownVendor(String),

    #[error("unknown entity '{entity}' for vendor {vendor}")]
    UnknownEntity { vendor: String, entity: String },

    #[error("invalid watermark {kind}={value}: {reason}")]
    InvalidWatermark {
        kind: String,
        value: String,
        reason: String,
    },

    #[error("invalid sync state: {0}")]
    InvalidSyncState(String),

    #[error("invalid auth status: {0}")]
    InvalidAuthStatus(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read tenants file {path}: {source}")]
    TenantsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tenants file: {0}")]
    TenantsFileParse(#[from] serde_yaml::Error),

    #[error("tenants file validation failed: {0}")]
    Validation(String),
}
