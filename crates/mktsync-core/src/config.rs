use crate::app_config::{AppConfig, AppCredentials, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("MKTSYNC_ENV", "development"))?;

    let bind_addr = parse("MKTSYNC_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("MKTSYNC_LOG_LEVEL", "info");
    let tenants_path = PathBuf::from(or_default("MKTSYNC_TENANTS_PATH", "./config/tenants.yaml"));
    let public_base_url = or_default("MKTSYNC_PUBLIC_BASE_URL", "http://localhost:3000")
        .trim_end_matches('/')
        .to_string();

    let db_max_connections = parse_u32("MKTSYNC_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("MKTSYNC_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("MKTSYNC_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "MKTSYNC_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "{db_min_connections} exceeds MKTSYNC_DB_MAX_CONNECTIONS ({db_max_connections})"
            ),
        });
    }

    let http_timeout_secs = parse_u64("MKTSYNC_HTTP_TIMEOUT_SECS", "30")?;
    let http_user_agent = or_default("MKTSYNC_HTTP_USER_AGENT", "mktsync/0.1 (connector-sync)");
    let max_concurrent_tenants = parse_usize("MKTSYNC_MAX_CONCURRENT_TENANTS", "8")?;
    if max_concurrent_tenants == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MKTSYNC_MAX_CONCURRENT_TENANTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let max_retries = parse_u32("MKTSYNC_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("MKTSYNC_RETRY_BACKOFF_BASE_MS", "1000")?;
    let default_max_pages = parse_u32("MKTSYNC_DEFAULT_MAX_PAGES", "100")?;
    let jst_window_minutes = parse_u32("MKTSYNC_JST_WINDOW_MINUTES", "6")?;
    if jst_window_minutes == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MKTSYNC_JST_WINDOW_MINUTES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let jst = AppCredentials {
        app_key: optional("JST_APP_KEY"),
        app_secret: optional("JST_APP_SECRET"),
    };
    let yonsuite_base_url = optional("YONSUITE_BASE_URL");
    let yonsuite = AppCredentials {
        app_key: optional("YONSUITE_APP_KEY"),
        app_secret: optional("YONSUITE_APP_SECRET"),
    };
    let tiktok_business = AppCredentials {
        app_key: optional("TIKTOK_BUSINESS_APP_ID"),
        app_secret: optional("TIKTOK_BUSINESS_SECRET"),
    };

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        tenants_path,
        public_base_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http_timeout_secs,
        http_user_agent,
        max_concurrent_tenants,
        max_retries,
        retry_backoff_base_ms,
        default_max_pages,
        jst_window_minutes,
        jst,
        yonsuite_base_url,
        yonsuite,
        tiktok_business,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MKTSYNC_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
