//! Building the vendor client a tenant talks through.

use mktsync_connectors::{
    HttpSettings, JstClient, LazadaClient, TiktokBusinessClient, TiktokShopClient, YonsuiteClient,
};
use mktsync_core::{AppConfig, Vendor};
use mktsync_db::TenantRow;

use crate::SyncError;

/// Tenant setting that points any vendor client at another host.
pub const BASE_URL_SETTING: &str = "base_url";

pub enum VendorClient {
    Jst(JstClient),
    Lazada(LazadaClient),
    TiktokShop(TiktokShopClient),
    TiktokBusiness(TiktokBusinessClient),
    Yonsuite(YonsuiteClient),
}

impl VendorClient {
    /// Builds the client for `tenant`.
    ///
    /// Lazada and TikTok Shop apps are registered per tenant, so their keys
    /// come from the tenant row. JST, TikTok Business and YonSuite fall back
    /// to the app credentials in `config` when the tenant carries none.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingCredential`] when no app key/secret pair is
    /// available, or [`SyncError::Connector`] if the client cannot be built.
    pub fn for_tenant(
        config: &AppConfig,
        http: &HttpSettings,
        tenant: &TenantRow,
    ) -> Result<Self, SyncError> {
        let vendor = tenant.vendor()?;
        let base_url = tenant.setting_str(BASE_URL_SETTING);
        let settings = http.clone();

        let client = match vendor {
            Vendor::Jst => {
                let (key, secret) = app_pair(tenant, config.jst.pair())?;
                VendorClient::Jst(match base_url {
                    Some(url) => JstClient::with_base_url(key, secret, settings, &url)?,
                    None => JstClient::new(key, secret, settings)?,
                })
            }
            Vendor::Lazada => {
                let (key, secret) = app_pair(tenant, None)?;
                VendorClient::Lazada(match base_url {
                    Some(url) => LazadaClient::with_base_url(key, secret, settings, &url)?,
                    None => {
                        let country = tenant
                            .setting_str("country")
                            .unwrap_or_else(|| "VN".to_owned());
                        LazadaClient::new(key, secret, &country, settings)?
                    }
                })
            }
            Vendor::TiktokShop => {
                let (key, secret) = app_pair(tenant, None)?;
                VendorClient::TiktokShop(match base_url {
                    Some(url) => TiktokShopClient::with_base_url(key, secret, settings, &url)?,
                    None => TiktokShopClient::new(key, secret, settings)?,
                })
            }
            Vendor::TiktokBusiness => {
                let (key, secret) = app_pair(tenant, config.tiktok_business.pair())?;
                VendorClient::TiktokBusiness(match base_url {
                    Some(url) => TiktokBusinessClient::with_base_url(key, secret, settings, &url)?,
                    None => TiktokBusinessClient::new(key, secret, settings)?,
                })
            }
            Vendor::Yonsuite => {
                let (key, secret) = app_pair(tenant, config.yonsuite.pair())?;
                let url = base_url
                    .or_else(|| config.yonsuite_base_url.clone())
                    .ok_or_else(|| SyncError::MissingCredential {
                        tenant: tenant.slug.clone(),
                        what: "YonSuite base_url",
                    })?;
                VendorClient::Yonsuite(YonsuiteClient::new(key, secret, settings, &url)?)
            }
        };
        Ok(client)
    }

    #[must_use]
    pub fn vendor(&self) -> Vendor {
        match self {
            VendorClient::Jst(_) => Vendor::Jst,
            VendorClient::Lazada(_) => Vendor::Lazada,
            VendorClient::TiktokShop(_) => Vendor::TiktokShop,
            VendorClient::TiktokBusiness(_) => Vendor::TiktokBusiness,
            VendorClient::Yonsuite(_) => Vendor::Yonsuite,
        }
    }
}

fn app_pair<'a>(
    tenant: &'a TenantRow,
    fallback: Option<(&'a str, &'a str)>,
) -> Result<(&'a str, &'a str), SyncError> {
    match (tenant.app_key.as_deref(), tenant.app_secret.as_deref()) {
        (Some(key), Some(secret)) => Ok((key, secret)),
        _ => fallback.ok_or_else(|| SyncError::MissingCredential {
            tenant: tenant.slug.clone(),
            what: "app key and secret",
        }),
    }
}
