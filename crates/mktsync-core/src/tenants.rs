use std::collections::HashSet;
use std::env::VarError;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ConfigError, Vendor};

fn default_active() -> bool {
    true
}

/// One vendor account declared in `config/tenants.yaml`.
///
/// Secrets never live in the file; the `*_env` fields name the environment
/// variables that hold them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub vendor: Vendor,
    pub name: String,
    /// Explicit slug; derived from `name` when omitted.
    pub slug: Option<String>,
    /// Seller id, shop cipher, advertiser owner or company id, per vendor.
    pub external_ref: Option<String>,
    pub app_key_env: Option<String>,
    pub app_secret_env: Option<String>,
    pub access_token_env: Option<String>,
    pub sync_since: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Vendor-specific knobs (region, api url, service id, page sizes).
    #[serde(default)]
    pub settings: Map<String, Value>,
}

/// Secrets resolved from the environment for one tenant.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TenantSecrets {
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
    pub access_token: Option<String>,
}

impl std::fmt::Debug for TenantSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantSecrets")
            .field("app_key", &self.app_key)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl TenantConfig {
    /// The configured slug, or one generated from the tenant name.
    #[must_use]
    pub fn slug(&self) -> String {
        match self.slug.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => explicit.to_lowercase(),
            _ => slugify(&self.name),
        }
    }

    /// Resolve the referenced secrets through `lookup`.
    pub fn resolve_secrets<F>(&self, lookup: F) -> TenantSecrets
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let read = |var: Option<&String>| {
            var.and_then(|name| lookup(name).ok())
                .filter(|v| !v.trim().is_empty())
        };
        TenantSecrets {
            app_key: read(self.app_key_env.as_ref()),
            app_secret: read(self.app_secret_env.as_ref()),
            access_token: read(self.access_token_env.as_ref()),
        }
    }

    /// Resolve the referenced secrets from the process environment.
    #[must_use]
    pub fn secrets_from_env(&self) -> TenantSecrets {
        self.resolve_secrets(|key| std::env::var(key))
    }
}

/// Generate a URL-safe slug.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Deserialize)]
pub struct TenantsFile {
    pub tenants: Vec<TenantConfig>,
}

/// Load and validate the tenant seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_tenants(path: &Path) -> Result<TenantsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TenantsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let tenants_file: TenantsFile = serde_yaml::from_str(&content)?;

    validate_tenants(&tenants_file)?;

    Ok(tenants_file)
}

fn validate_tenants(tenants_file: &TenantsFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();

    for tenant in &tenants_file.tenants {
        if tenant.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "tenant name must be non-empty".to_string(),
            ));
        }

        let slug = tenant.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "tenant '{}' produces an empty slug",
                tenant.name
            )));
        }
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate tenant slug: '{}' (from tenant '{}')",
                slug, tenant.name
            )));
        }

        // Lazada and TikTok Shop issue one app per seller account.
        let needs_app = matches!(tenant.vendor, Vendor::Lazada | Vendor::TiktokShop);
        if needs_app && (tenant.app_key_env.is_none() || tenant.app_secret_env.is_none()) {
            return Err(ConfigError::Validation(format!(
                "tenant '{}' ({}) requires app_key_env and app_secret_env",
                tenant.name, tenant.vendor
            )));
        }

        for var in [
            &tenant.app_key_env,
            &tenant.app_secret_env,
            &tenant.access_token_env,
        ]
        .into_iter()
        .flatten()
        {
            if var.trim().is_empty() || var.contains(char::is_whitespace) {
                return Err(ConfigError::Validation(format!(
                    "tenant '{}' references invalid env var name '{var}'",
                    tenant.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tenants_test.rs"]
mod tests;
