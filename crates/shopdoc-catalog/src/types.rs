//! Admin GraphQL response types and the validated product record built from
//! them.
//!
//! ## Observed shape of the `products` connection
//!
//! ### `productType`
//! A plain string; frequently `""` on stores that never set it, occasionally
//! `null`. Both are treated as absent by the normalizer.
//!
//! ### `description`
//! Plain text rendering of `descriptionHtml`, but merchants paste markup into
//! rich-text editors often enough that the normalizer strips it again.
//!
//! ### `metafields`
//! A connection (`edges { node { ... } }`) when paginating, but flattened
//! into separate JSONL lines carrying `__parentId` in bulk export results.
//! `key` is the bare key; `namespace` is returned separately.
//!
//! ### `priceRangeV2`
//! `amount` is a GraphQL `Decimal`, serialized as a string (`"12.0"`). The
//! `currencyCode` is the shop currency and is identical on min and max.

use serde::{Deserialize, Deserializer};

/// Standard GraphQL envelope. `data` is absent (or `null`) when the request
/// failed as a whole.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<GraphqlErrorExtensions>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlErrorExtensions {
    #[serde(default)]
    pub code: Option<String>,
}

impl GraphqlError {
    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref().and_then(|e| e.code.as_deref())
    }
}

/// Joins GraphQL error messages into one line for error reporting.
pub(crate) fn describe_errors(errors: &[GraphqlError]) -> String {
    if errors.is_empty() {
        return "response contained no data".to_owned();
    }
    errors
        .iter()
        .map(|e| match e.code() {
            Some(code) => format!("{} [{code}]", e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductsData {
    pub products: Option<Connection<ProductNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
    #[serde(default)]
    pub page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    #[serde(default)]
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
}

/// One product as it arrives on the wire, from either a page or a bulk line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductNode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Vec<ProductOption>,
    #[serde(default)]
    pub metafields: Option<Connection<Metafield>>,
    #[serde(default)]
    pub price_range_v2: Option<PriceRangeNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PriceRangeNode {
    #[serde(default)]
    pub min_variant_price: Option<Money>,
    #[serde(default)]
    pub max_variant_price: Option<Money>,
}

/// A product record as fetched from the catalog. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProduct {
    /// Global ID (`gid://shopify/Product/...`); only requested by bulk export.
    pub id: Option<String>,
    pub title: String,
    pub product_type: Option<String>,
    pub description: Option<String>,
    pub options: Vec<ProductOption>,
    pub metafields: Vec<Metafield>,
    /// `None` when the source omitted either bound of the range.
    pub price_range: Option<PriceRange>,
}

impl From<ProductNode> for RawProduct {
    fn from(node: ProductNode) -> Self {
        let price_range = node.price_range_v2.and_then(|range| {
            Some(PriceRange {
                min: range.min_variant_price?,
                max: range.max_variant_price?,
            })
        });
        Self {
            id: node.id,
            title: node.title,
            product_type: node.product_type,
            description: node.description,
            options: node.options,
            metafields: node
                .metafields
                .map(|c| c.edges.into_iter().map(|e| e.node).collect())
                .unwrap_or_default(),
            price_range,
        }
    }
}

/// An option group such as `Size: [S, M, L]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductOption {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Metafield {
    #[serde(default)]
    pub namespace: Option<String>,
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl Metafield {
    /// Returns `true` if `wanted` names this metafield, either as the bare
    /// key (`colours`) or qualified with its namespace (`filters.colours`).
    #[must_use]
    pub fn matches(&self, wanted: &str) -> bool {
        if self.key == wanted {
            return true;
        }
        match (&self.namespace, wanted.split_once('.')) {
            (Some(ns), Some((wanted_ns, wanted_key))) => ns == wanted_ns && self.key == wanted_key,
            (None, Some((_, wanted_key))) => self.key == wanted_key,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRange {
    pub min: Money,
    pub max: Money,
}

impl PriceRange {
    /// Shop currency for the range. Taken from the max bound, falling back
    /// to the min bound.
    #[must_use]
    pub fn currency_code(&self) -> Option<&str> {
        self.max
            .currency_code
            .as_deref()
            .or(self.min.currency_code.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Decimal amount exactly as sent, e.g. `"12.0"`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

/// Accepts either a JSON string or a JSON number, keeping the text.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Amount>::deserialize(deserializer)?.map(|a| match a {
        Amount::Text(s) => s,
        Amount::Number(n) => n.to_string(),
    }))
}

/// One page of products plus the continuation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub products: Vec<RawProduct>,
    pub next_cursor: Option<String>,
    pub has_next_page: bool,
}

impl From<Connection<ProductNode>> for PageResult {
    fn from(connection: Connection<ProductNode>) -> Self {
        let page_info = connection.page_info.unwrap_or(PageInfo {
            end_cursor: None,
            has_next_page: false,
        });
        Self {
            products: connection
                .edges
                .into_iter()
                .map(|e| RawProduct::from(e.node))
                .collect(),
            next_cursor: page_info.end_cursor,
            has_next_page: page_info.has_next_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_result_from_connection_flattens_edges() {
        let body = serde_json::json!({
            "edges": [
                {"node": {
                    "title": "Trail Runner",
                    "productType": "Shoes",
                    "description": "Grippy",
                    "options": [{"name": "Size", "values": ["8", "9"]}],
                    "metafields": {"edges": [{"node": {"namespace": "custom", "key": "material", "value": "Mesh"}}]},
                    "priceRangeV2": {
                        "minVariantPrice": {"amount": "89.0", "currencyCode": "USD"},
                        "maxVariantPrice": {"amount": "99.0", "currencyCode": "USD"}
                    }
                }}
            ],
            "pageInfo": {"endCursor": "abc", "hasNextPage": true}
        });
        let connection: Connection<ProductNode> = serde_json::from_value(body).unwrap();
        let page = PageResult::from(connection);

        assert_eq!(page.products.len(), 1);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
        assert!(page.has_next_page);
        let product = &page.products[0];
        assert_eq!(product.options[0].values, vec!["8", "9"]);
        assert_eq!(product.metafields[0].key, "material");
        let range = product.price_range.as_ref().unwrap();
        assert_eq!(range.min.amount.as_deref(), Some("89.0"));
        assert_eq!(range.currency_code(), Some("USD"));
    }

    #[test]
    fn missing_price_bound_yields_no_range() {
        let node: ProductNode = serde_json::from_value(serde_json::json!({
            "title": "Gift Card",
            "priceRangeV2": {"minVariantPrice": {"amount": "10.0", "currencyCode": "GBP"}}
        }))
        .unwrap();
        assert!(RawProduct::from(node).price_range.is_none());
    }

    #[test]
    fn numeric_amount_is_accepted() {
        let money: Money =
            serde_json::from_value(serde_json::json!({"amount": 12.5, "currencyCode": "EUR"}))
                .unwrap();
        assert_eq!(money.amount.as_deref(), Some("12.5"));
    }

    #[test]
    fn null_product_type_and_missing_metafields_are_tolerated() {
        let node: ProductNode = serde_json::from_value(serde_json::json!({
            "title": "Mug",
            "productType": null
        }))
        .unwrap();
        let product = RawProduct::from(node);
        assert!(product.product_type.is_none());
        assert!(product.metafields.is_empty());
    }

    #[test]
    fn metafield_matches_bare_and_qualified_keys() {
        let mf = Metafield {
            namespace: Some("filters".to_owned()),
            key: "colours".to_owned(),
            value: None,
        };
        assert!(mf.matches("colours"));
        assert!(mf.matches("filters.colours"));
        assert!(!mf.matches("custom.colours"));
        assert!(!mf.matches("material"));
    }

    #[test]
    fn describe_errors_includes_codes() {
        let errors = vec![GraphqlError {
            message: "Throttled".to_owned(),
            extensions: Some(GraphqlErrorExtensions {
                code: Some("THROTTLED".to_owned()),
            }),
        }];
        assert_eq!(describe_errors(&errors), "Throttled [THROTTLED]");
        assert_eq!(describe_errors(&[]), "response contained no data");
    }
}
