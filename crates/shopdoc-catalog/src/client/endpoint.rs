//! Admin API endpoint resolution for the catalog client.

use reqwest::Url;

use crate::error::CatalogError;

/// Normalizes a configured shop domain to a bare host.
///
/// `"acme"`, `"acme.myshopify.com"`, and `"https://acme.myshopify.com/"` all
/// resolve to `"acme.myshopify.com"`. A value that already contains a dot is
/// taken as a full host.
#[must_use]
pub fn shop_host(shop_domain: &str) -> String {
    let trimmed = shop_domain.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let host = without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme);

    if host.contains('.') {
        host.to_owned()
    } else {
        format!("{host}.myshopify.com")
    }
}

/// Builds `https://<host>/admin/api/<version>/graphql.json`.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidEndpoint`] if the domain is empty or the
/// resulting URL does not parse.
pub fn admin_endpoint(shop_domain: &str, api_version: &str) -> Result<Url, CatalogError> {
    let host = shop_host(shop_domain);
    if host == ".myshopify.com" {
        return Err(CatalogError::InvalidEndpoint {
            domain: shop_domain.to_owned(),
            reason: "shop domain is empty".to_owned(),
        });
    }
    let raw = format!("https://{host}/admin/api/{}/graphql.json", api_version.trim());
    Url::parse(&raw).map_err(|e| CatalogError::InvalidEndpoint {
        domain: shop_domain.to_owned(),
        reason: format!("\"{raw}\" is not a valid URL: {e}"),
    })
}
