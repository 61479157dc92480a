use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Vendor application credentials shared by every tenant of that vendor.
#[derive(Clone, Default)]
pub struct AppCredentials {
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
}

impl AppCredentials {
    /// Both halves, when configured.
    #[must_use]
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (self.app_key.as_deref(), self.app_secret.as_deref()) {
            (Some(key), Some(secret)) => Some((key, secret)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_key", &self.app_key)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub tenants_path: PathBuf,
    /// Externally reachable base URL used to build OAuth redirect URIs.
    pub public_base_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub max_concurrent_tenants: usize,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub default_max_pages: u32,
    pub jst_window_minutes: u32,
    pub jst: AppCredentials,
    pub yonsuite_base_url: Option<String>,
    pub yonsuite: AppCredentials,
    pub tiktok_business: AppCredentials,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("tenants_path", &self.tenants_path)
            .field("public_base_url", &self.public_base_url)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("max_concurrent_tenants", &self.max_concurrent_tenants)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("default_max_pages", &self.default_max_pages)
            .field("jst_window_minutes", &self.jst_window_minutes)
            .field("jst", &self.jst)
            .field("yonsuite_base_url", &self.yonsuite_base_url)
            .field("yonsuite", &self.yonsuite)
            .field("tiktok_business", &self.tiktok_business)
            .finish()
    }
}
