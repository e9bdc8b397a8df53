use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::AppConfig;
use crate::ConfigError;

/// Storefront search predicate used when `SHOPDOC_PRODUCT_FILTER` is unset:
/// active, published, purchasable products priced above one unit.
pub const DEFAULT_PRODUCT_FILTER: &str = "(available_for_sale:true) AND (status:ACTIVE) AND (published_status:published) AND (price:>1)";

const DEFAULT_DOCSTORE_URL: &str = "https://llm.t.certainly.io/docstore";

/// Largest `first:` argument the Admin API accepts for a connection.
const MAX_PAGE_SIZE: u32 = 250;

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
///
/// Decoupled from the real environment so tests can drive it from a `HashMap`.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        parse_var(var, &or_default(var, default))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        parse_var(var, &or_default(var, default))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        parse_var(var, &or_default(var, default))
    };

    let shop_domain = require("SHOPIFY_DOMAIN")?.trim().to_string();
    let admin_token = optional("SHOPIFY_ADMIN_TOKEN");
    let metafield_keys = parse_key_list(&or_default("SHOPIFY_METAFIELD_KEYS", ""));

    let api_version = or_default("SHOPDOC_API_VERSION", "unstable");
    let page_size = parse_u32("SHOPDOC_PAGE_SIZE", "100")?;
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::InvalidEnvVar {
            var: "SHOPDOC_PAGE_SIZE".to_string(),
            reason: format!("must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"),
        });
    }
    let start_cursor = optional("SHOPDOC_START_CURSOR");
    let product_filter = or_default("SHOPDOC_PRODUCT_FILTER", DEFAULT_PRODUCT_FILTER);

    let output_shape = parse_var(
        "SHOPDOC_OUTPUT_SHAPE",
        &or_default("SHOPDOC_OUTPUT_SHAPE", "columns"),
    )?;
    let output_path = optional("SHOPDOC_OUTPUT_PATH")
        .map_or_else(|| PathBuf::from(format!("{shop_domain}.csv")), PathBuf::from);
    // Markers are matched verbatim, so leading whitespace is significant.
    let truncate_marker = lookup("SHOPDOC_TRUNCATE_MARKER")
        .ok()
        .filter(|v| !v.is_empty());
    let colours_key =
        Some(or_default("SHOPDOC_COLOURS_KEY", "filters.colours")).filter(|v| v != "-");
    let currency_symbols =
        parse_symbol_table(&or_default("SHOPDOC_CURRENCY_SYMBOLS", "AUD=A$,DKK=DKK"))?;
    let dedup_key = parse_var("SHOPDOC_DEDUP", &or_default("SHOPDOC_DEDUP", "description"))?;
    let malformed_policy = parse_var(
        "SHOPDOC_MALFORMED_POLICY",
        &or_default("SHOPDOC_MALFORMED_POLICY", "skip"),
    )?;

    let request_timeout_secs = parse_u64("SHOPDOC_REQUEST_TIMEOUT_SECS", "30")?;
    let max_retries = parse_u32("SHOPDOC_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("SHOPDOC_RETRY_BACKOFF_BASE_MS", "1000")?;
    let inter_request_delay_ms = parse_u64("SHOPDOC_INTER_REQUEST_DELAY_MS", "0")?;
    let max_pages = parse_usize("SHOPDOC_MAX_PAGES", "1000")?;

    let bulk_poll_interval_secs = parse_u64("SHOPDOC_BULK_POLL_INTERVAL_SECS", "5")?;
    let bulk_max_poll_interval_secs = parse_u64("SHOPDOC_BULK_MAX_POLL_INTERVAL_SECS", "60")?;
    let bulk_max_polls = parse_u32("SHOPDOC_BULK_MAX_POLLS", "60")?;

    let docstore_company_id =
        optional("DOCSTORE_COMPANY_ID").or_else(|| optional("DJANGO_COMPANY_ID"));
    let docstore_url = or_default("SHOPDOC_DOCSTORE_URL", DEFAULT_DOCSTORE_URL);
    let docstore_path_template = or_default("SHOPDOC_DOCSTORE_PATH", "{domain}.myshopify.com");
    let upload_batch_size = parse_usize("SHOPDOC_UPLOAD_BATCH_SIZE", "500")?;
    if upload_batch_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SHOPDOC_UPLOAD_BATCH_SIZE".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    let log_level = or_default("SHOPDOC_LOG_LEVEL", "info");

    Ok(AppConfig {
        shop_domain,
        admin_token,
        api_version,
        metafield_keys,
        page_size,
        start_cursor,
        product_filter,
        output_shape,
        output_path,
        truncate_marker,
        colours_key,
        currency_symbols,
        dedup_key,
        malformed_policy,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
        inter_request_delay_ms,
        max_pages,
        bulk_poll_interval_secs,
        bulk_max_poll_interval_secs,
        bulk_max_polls,
        docstore_company_id,
        docstore_url,
        docstore_path_template,
        upload_batch_size,
        log_level,
    })
}

fn parse_var<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses `CODE=symbol` pairs separated by commas. Codes are upper-cased.
fn parse_symbol_table(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut table = BTreeMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((code, symbol)) = pair.split_once('=') else {
            return Err(ConfigError::InvalidEnvVar {
                var: "SHOPDOC_CURRENCY_SYMBOLS".to_string(),
                reason: format!("expected CODE=symbol, got \"{pair}\""),
            });
        };
        let code = code.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidEnvVar {
                var: "SHOPDOC_CURRENCY_SYMBOLS".to_string(),
                reason: format!("\"{code}\" is not a three-letter currency code"),
            });
        }
        table.insert(code, symbol.trim().to_string());
    }
    Ok(table)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
