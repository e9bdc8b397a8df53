//! Normalization from [`RawProduct`] to [`shopdoc_core::OutputRow`].
//!
//! Markup stripping is delegated to [`crate::html`] and currency rendering to
//! [`crate::price`]; this module owns the heading fallback, the metafield
//! selection, and the description merge policy.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use shopdoc_core::{AppConfig, OutputRow, PLACEHOLDER_TOKENS};

use crate::error::NormalizeError;
use crate::html::strip_html;
use crate::price::format_price_range;
use crate::types::{Metafield, Money, RawProduct};

/// Heading used when the product has no type.
pub const NO_TYPE: &str = "No type present";

/// Description used when neither the product nor its metafields carry text.
pub const NO_DESCRIPTION: &str = "No description present.";

const EXTRA_INFO_SEPARATOR: &str = ". Product Extra Information: ";
const EXTRAS_JOINER: &str = ". ";
const COLOURS_PREFIX: &str = "Colours : ";

/// Static settings the normalizer runs with.
#[derive(Debug, Clone, Default)]
pub struct NormalizationConfig {
    /// Metafields to fold into the description, bare or `namespace.key`.
    pub metafield_keys: Vec<String>,
    /// Metafield whose value is a JSON list of colour names.
    pub colours_key: Option<String>,
    /// When set, metafield text is cut at the first occurrence of this marker.
    pub truncate_marker: Option<String>,
    /// Currency code to symbol overrides.
    pub currency_symbols: BTreeMap<String, String>,
}

impl NormalizationConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            metafield_keys: config.metafield_keys.clone(),
            colours_key: config.colours_key.clone(),
            truncate_marker: config.truncate_marker.clone(),
            currency_symbols: config.currency_symbols.clone(),
        }
    }

    fn wants(&self, metafield: &Metafield) -> bool {
        self.metafield_keys.iter().any(|k| metafield.matches(k))
    }

    fn is_colours(&self, metafield: &Metafield) -> bool {
        self.colours_key
            .as_deref()
            .is_some_and(|k| metafield.matches(k))
    }
}

/// Normalizes one [`RawProduct`] into an [`OutputRow`].
///
/// Pure: the same product and config always produce the same row.
///
/// # Errors
///
/// Returns [`NormalizeError::MalformedRecord`] if the title is empty or the
/// price range is missing or unparsable.
pub fn normalize_product(
    product: &RawProduct,
    config: &NormalizationConfig,
) -> Result<OutputRow, NormalizeError> {
    let title = product.title.trim();
    if title.is_empty() {
        return Err(malformed(product, "product has no title"));
    }

    let price = format_product_price(product, config)?;
    let base = product
        .description
        .as_deref()
        .map(strip_html)
        .unwrap_or_default();
    let extras = metafield_extras(product, config);

    Ok(OutputRow {
        title: title.to_owned(),
        heading: resolve_heading(product.product_type.as_deref()),
        description: merge_description(&base, &extras),
        price,
        tokens: PLACEHOLDER_TOKENS,
    })
}

/// Returns the product type, or [`NO_TYPE`] when it is absent or blank.
#[must_use]
pub fn resolve_heading(product_type: Option<&str>) -> String {
    match product_type {
        Some(t) if !t.trim().is_empty() => t.to_owned(),
        _ => NO_TYPE.to_owned(),
    }
}

/// Merges the base description with metafield extras.
///
/// | base | extras | result |
/// |------|--------|--------|
/// | set  | set    | `base. Product Extra Information: e1. e2` |
/// | empty | set   | `e1. e2` |
/// | set  | empty  | `base` |
/// | empty | empty | [`NO_DESCRIPTION`] |
#[must_use]
pub fn merge_description(base: &str, extras: &[String]) -> String {
    let base = base.trim();
    match (base.is_empty(), extras.is_empty()) {
        (false, false) => format!("{base}{EXTRA_INFO_SEPARATOR}{}", extras.join(EXTRAS_JOINER)),
        (true, false) => extras.join(EXTRAS_JOINER),
        (false, true) => base.to_owned(),
        (true, true) => NO_DESCRIPTION.to_owned(),
    }
}

/// Collects the text of allow-listed metafields, in the order the product
/// lists them. Empty values are skipped.
#[must_use]
pub fn metafield_extras(product: &RawProduct, config: &NormalizationConfig) -> Vec<String> {
    product
        .metafields
        .iter()
        .filter(|mf| config.wants(mf))
        .filter_map(|mf| {
            let value = mf.value.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
            let text = if config.is_colours(mf) {
                format_colours(value).unwrap_or_else(|| {
                    tracing::warn!(
                        title = %product.title,
                        key = %mf.key,
                        "colours metafield is not a JSON string list, using it as text"
                    );
                    metafield_text(value, config)
                })
            } else {
                metafield_text(value, config)
            };
            Some(text).filter(|t| !t.is_empty())
        })
        .collect()
}

fn metafield_text(value: &str, config: &NormalizationConfig) -> String {
    let stripped = strip_html(value);
    match config.truncate_marker.as_deref().filter(|m| !m.is_empty()) {
        Some(marker) => stripped
            .split(marker)
            .next()
            .unwrap_or_default()
            .trim()
            .to_owned(),
        None => stripped,
    }
}

/// `["Red","Navy"]` becomes `Colours : Red, Navy`.
fn format_colours(value: &str) -> Option<String> {
    let colours: Vec<String> = serde_json::from_str(value).ok()?;
    let colours: Vec<&str> = colours
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if colours.is_empty() {
        return None;
    }
    Some(format!("{COLOURS_PREFIX}{}", colours.join(", ")))
}

/// Formats the product's price range.
///
/// # Errors
///
/// Returns [`NormalizeError::MalformedRecord`] if the range is missing or an
/// amount is absent or not a decimal number.
pub fn format_product_price(
    product: &RawProduct,
    config: &NormalizationConfig,
) -> Result<String, NormalizeError> {
    let range = product
        .price_range
        .as_ref()
        .ok_or_else(|| malformed(product, "missing price range"))?;
    let min = parse_amount(product, &range.min, "minVariantPrice")?;
    let max = parse_amount(product, &range.max, "maxVariantPrice")?;

    Ok(format_price_range(
        min,
        max,
        range.currency_code(),
        &config.currency_symbols,
    ))
}

fn parse_amount(product: &RawProduct, money: &Money, field: &str) -> Result<Decimal, NormalizeError> {
    let raw = money
        .amount
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| malformed(product, &format!("{field} has no amount")))?;

    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| malformed(product, &format!("{field} amount \"{raw}\" is not a number")))
}

fn malformed(product: &RawProduct, reason: &str) -> NormalizeError {
    NormalizeError::MalformedRecord {
        title: product.title.clone(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
