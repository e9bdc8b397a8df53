//! Normalize-then-dedup over a fetched batch of products.

use shopdoc_core::{DedupKey, MalformedPolicy, OutputRow};

use crate::dedup::Deduplicator;
use crate::error::NormalizeError;
use crate::normalize::{normalize_product, NormalizationConfig};
use crate::types::RawProduct;

/// Rows ready for the sink plus what was left out on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRows {
    pub rows: Vec<OutputRow>,
    /// Malformed records left out under [`MalformedPolicy::Skip`].
    pub skipped: usize,
    /// Rows dropped as duplicates.
    pub duplicates: usize,
}

/// Normalizes `products` in fetch order and removes duplicates.
///
/// # Errors
///
/// Under [`MalformedPolicy::Abort`], returns the first
/// [`NormalizeError::MalformedRecord`]. Under [`MalformedPolicy::Skip`] the
/// record is logged and counted instead.
pub fn build_rows(
    products: &[RawProduct],
    config: &NormalizationConfig,
    policy: MalformedPolicy,
    dedup_key: DedupKey,
) -> Result<ExportRows, NormalizeError> {
    let mut dedup = Deduplicator::new(dedup_key);
    let mut rows = Vec::with_capacity(products.len());
    let mut skipped = 0;

    for product in products {
        match normalize_product(product, config) {
            Ok(row) => {
                if dedup.admit(&row) {
                    rows.push(row);
                }
            }
            Err(e) if policy == MalformedPolicy::Skip => {
                tracing::warn!(error = %e, "skipping malformed record");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if dedup.dropped() > 0 {
        tracing::info!(
            count = dedup.dropped(),
            key = %dedup_key,
            "dropped duplicate rows"
        );
    }

    Ok(ExportRows {
        rows,
        skipped,
        duplicates: dedup.dropped(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Money, PriceRange};

    fn product(title: &str, description: &str, amount: Option<&str>) -> RawProduct {
        let money = |a: &str| Money {
            amount: Some(a.to_owned()),
            currency_code: Some("EUR".to_owned()),
        };
        RawProduct {
            id: None,
            title: title.to_owned(),
            product_type: None,
            description: Some(description.to_owned()),
            options: Vec::new(),
            metafields: Vec::new(),
            price_range: amount.map(|a| PriceRange {
                min: money(a),
                max: money(a),
            }),
        }
    }

    fn batch() -> Vec<RawProduct> {
        vec![
            product("Lamp", "Brass desk lamp", Some("80")),
            product("Lamp (copy)", "Brass desk lamp", Some("80")),
            product("Broken", "No price", None),
            product("Rug", "Wool rug", Some("150")),
        ]
    }

    #[test]
    fn skip_policy_counts_malformed_and_duplicates() {
        let out = build_rows(
            &batch(),
            &NormalizationConfig::default(),
            MalformedPolicy::Skip,
            DedupKey::Description,
        )
        .unwrap();

        assert_eq!(out.skipped, 1);
        assert_eq!(out.duplicates, 1);
        let titles: Vec<&str> = out.rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Lamp", "Rug"]);
        assert_eq!(out.rows[0].heading, "No type present");
        assert_eq!(out.rows[1].price, "€150.00");
    }

    #[test]
    fn abort_policy_stops_on_first_malformed() {
        let err = build_rows(
            &batch(),
            &NormalizationConfig::default(),
            MalformedPolicy::Abort,
            DedupKey::Description,
        )
        .unwrap_err();

        let NormalizeError::MalformedRecord { title, .. } = err;
        assert_eq!(title, "Broken");
    }

    #[test]
    fn empty_input_gives_empty_rows() {
        let out = build_rows(
            &[],
            &NormalizationConfig::default(),
            MalformedPolicy::Skip,
            DedupKey::Description,
        )
        .unwrap();
        assert_eq!(out, ExportRows::default());
    }
}
