//! Seller authorisation: building the consent URL and storing the tokens
//! returned to the callback.
//!
//! The OAuth `state` parameter carries the tenant slug so the callback knows
//! which tenant the code belongs to.

use mktsync_connectors::{HttpSettings, TiktokShopClient, TokenGrant};
use mktsync_core::{AppConfig, Vendor};
use mktsync_db::TenantRow;
use sqlx::PgPool;

use crate::clients::VendorClient;
use crate::credentials::store_grant;
use crate::SyncError;

/// Path segment of a vendor's callback route, e.g. `tiktok-shop`.
#[must_use]
pub fn callback_segment(vendor: Vendor) -> String {
    vendor.as_str().replace('_', "-")
}

/// Absolute callback URL registered with the vendor.
#[must_use]
pub fn redirect_uri(config: &AppConfig, vendor: Vendor) -> String {
    format!(
        "{}/oauth/{}/callback",
        config.public_base_url.trim_end_matches('/'),
        callback_segment(vendor)
    )
}

/// Consent URL a seller opens to authorise `tenant`.
///
/// TikTok Shop needs the Partner Center `service_id` tenant setting and
/// honours an optional `region` setting (`us` selects the US host).
///
/// # Errors
///
/// - [`SyncError::OAuthUnsupported`] for vendors without seller consent.
/// - [`SyncError::MissingCredential`] when app keys or `service_id` are absent.
pub fn authorization_url(config: &AppConfig, tenant: &TenantRow) -> Result<String, SyncError> {
    let http = HttpSettings::from_app_config(config);
    let client = VendorClient::for_tenant(config, &http, tenant)?;
    let state = tenant.slug.as_str();
    let redirect = redirect_uri(config, client.vendor());

    let url = match &client {
        VendorClient::Jst(jst) => jst.authorization_url(state, &redirect)?,
        VendorClient::Lazada(lazada) => lazada.authorization_url(&redirect, state)?,
        VendorClient::TiktokBusiness(business) => business.authorization_url(&redirect, state)?,
        VendorClient::TiktokShop(_) => {
            let service_id =
                tenant
                    .setting_str("service_id")
                    .ok_or_else(|| SyncError::MissingCredential {
                        tenant: tenant.slug.clone(),
                        what: "TikTok Shop service_id",
                    })?;
            let region = tenant.setting_str("region").unwrap_or_default();
            TiktokShopClient::authorization_url(&service_id, state, &region)?
        }
        VendorClient::Yonsuite(_) => return Err(SyncError::OAuthUnsupported(Vendor::Yonsuite)),
    };
    Ok(url)
}

/// Exchanges an authorisation `code` for tokens and stores them on the tenant
/// named by `state`, returning the updated tenant.
///
/// For TikTok Shop the shop cipher used to scope every call is looked up
/// from the authorised shops: the one matching the `shop_id` setting, or the
/// first one.
///
/// # Errors
///
/// - [`SyncError::UnknownTenant`] / [`SyncError::WrongVendor`] when `state`
///   does not name a tenant of `vendor`.
/// - [`SyncError::Connector`] when the vendor rejects the code.
/// - [`SyncError::Db`] when the tokens cannot be stored.
pub async fn complete_authorization(
    pool: &PgPool,
    config: &AppConfig,
    vendor: Vendor,
    state: &str,
    code: &str,
) -> Result<TenantRow, SyncError> {
    let tenant = mktsync_db::get_tenant_by_slug(pool, state)
        .await?
        .ok_or_else(|| SyncError::UnknownTenant(state.to_owned()))?;
    if tenant.vendor()? != vendor {
        return Err(SyncError::WrongVendor {
            tenant: tenant.slug.clone(),
            vendor,
        });
    }

    let http = HttpSettings::from_app_config(config);
    let client = VendorClient::for_tenant(config, &http, &tenant)?;
    let grant = match &client {
        VendorClient::Jst(jst) => jst.exchange_code(code).await?,
        VendorClient::Lazada(lazada) => lazada.create_token(code).await?,
        VendorClient::TiktokBusiness(business) => business.exchange_code(code).await?,
        VendorClient::TiktokShop(shop) => {
            let grant = shop.get_token(code).await?;
            let cipher = shop_cipher(shop, &tenant, &grant).await?;
            TokenGrant {
                external_ref: Some(cipher),
                ..grant
            }
        }
        VendorClient::Yonsuite(_) => return Err(SyncError::OAuthUnsupported(Vendor::Yonsuite)),
    };

    store_grant(pool, tenant.id, &grant).await?;
    tracing::info!(
        tenant = %tenant.slug,
        %vendor,
        account = grant.account_name.as_deref().unwrap_or("-"),
        "tenant authorised"
    );
    Ok(mktsync_db::get_tenant(pool, tenant.id).await?)
}

async fn shop_cipher(
    shop: &TiktokShopClient,
    tenant: &TenantRow,
    grant: &TokenGrant,
) -> Result<String, SyncError> {
    let shops = shop.get_authorized_shops(&grant.access_token).await?;
    let wanted = tenant.setting_str("shop_id");
    shops
        .iter()
        .find(|s| {
            wanted.as_deref().is_none_or(|id| {
                s.get("id")
                    .and_then(mktsync_core::mapping::value_as_string)
                    .as_deref()
                    == Some(id)
            })
        })
        .and_then(|s| s.get("cipher").and_then(serde_json::Value::as_str))
        .map(str::to_owned)
        .ok_or_else(|| SyncError::MissingCredential {
            tenant: tenant.slug.clone(),
            what: "authorised TikTok shop",
        })
}
