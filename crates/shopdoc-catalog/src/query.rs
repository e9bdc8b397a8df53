//! GraphQL documents sent to the Admin API.

use serde_json::{json, Value};

const PRODUCT_FIELDS: &str = "
          title
          productType
          description
          options {
            name
            values
          }";

const PRICE_FIELDS: &str = "
          priceRangeV2 {
            minVariantPrice {
              amount
              currencyCode
            }
            maxVariantPrice {
              amount
              currencyCode
            }
          }";

/// Builds the paginated `products` query. The metafield selection is only
/// included when an allow-list is configured.
pub(crate) fn products_query(with_metafields: bool) -> String {
    let (metafield_vars, metafield_fields) = if with_metafields {
        (
            ", $metafieldCount: Int!, $metafieldKeys: [String!]",
            "
          metafields(first: $metafieldCount, keys: $metafieldKeys) {
            edges {
              node {
                namespace
                key
                value
              }
            }
          }",
        )
    } else {
        ("", "")
    };

    format!(
        "query Products($first: Int!, $after: String, $query: String{metafield_vars}) {{
  products(first: $first, after: $after, query: $query) {{
    edges {{
      node {{{PRODUCT_FIELDS}{metafield_fields}{PRICE_FIELDS}
      }}
    }}
    pageInfo {{
      endCursor
      hasNextPage
    }}
  }}
}}"
    )
}

pub(crate) fn products_variables(
    page_size: u32,
    cursor: Option<&str>,
    filter: Option<&str>,
    metafield_keys: &[String],
) -> Value {
    let mut vars = json!({
        "first": page_size,
        "after": cursor,
        "query": filter,
    });
    if !metafield_keys.is_empty() {
        vars["metafieldCount"] = json!(metafield_keys.len());
        vars["metafieldKeys"] = json!(metafield_keys);
    }
    vars
}

pub(crate) const BULK_RUN_MUTATION: &str = "mutation RunBulkExport($query: String!) {
  bulkOperationRunQuery(query: $query) {
    bulkOperation {
      id
      status
    }
    userErrors {
      field
      message
    }
  }
}";

pub(crate) const BULK_STATUS_QUERY: &str = "query BulkStatus($id: ID!) {
  node(id: $id) {
    ... on BulkOperation {
      id
      status
      errorCode
      objectCount
      url
    }
  }
}";

/// Builds the inner query a bulk operation runs. Bulk queries take no
/// variables, so the filter and keys are embedded as literals. JSON string
/// and list encodings are valid GraphQL literals.
pub(crate) fn bulk_products_query(filter: Option<&str>, metafield_keys: &[String]) -> String {
    let args = filter
        .map(|f| format!("(query: {})", Value::from(f)))
        .unwrap_or_default();
    let metafield_fields = if metafield_keys.is_empty() {
        String::new()
    } else {
        format!(
            "
          metafields(keys: {}) {{
            edges {{
              node {{
                namespace
                key
                value
              }}
            }}
          }}",
            json!(metafield_keys)
        )
    };

    format!(
        "{{
  products{args} {{
    edges {{
      node {{
          id{PRODUCT_FIELDS}{metafield_fields}{PRICE_FIELDS}
      }}
    }}
  }}
}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn products_query_omits_metafields_without_keys() {
        let q = products_query(false);
        assert!(q.contains("products(first: $first, after: $after, query: $query)"));
        assert!(!q.contains("metafields"));
        assert!(q.contains("hasNextPage"));
    }

    #[test]
    fn products_query_selects_metafields_with_keys() {
        let q = products_query(true);
        assert!(q.contains("$metafieldKeys: [String!]"));
        assert!(q.contains("metafields(first: $metafieldCount, keys: $metafieldKeys)"));
    }

    #[test]
    fn variables_carry_cursor_and_filter() {
        let keys = vec!["custom.material".to_owned()];
        let vars = products_variables(75, Some("abc"), Some("status:ACTIVE"), &keys);
        assert_eq!(vars["first"], 75);
        assert_eq!(vars["after"], "abc");
        assert_eq!(vars["query"], "status:ACTIVE");
        assert_eq!(vars["metafieldCount"], 1);
        assert_eq!(vars["metafieldKeys"][0], "custom.material");
    }

    #[test]
    fn first_page_sends_null_cursor() {
        let vars = products_variables(100, None, None, &[]);
        assert!(vars["after"].is_null());
        assert!(vars.get("metafieldKeys").is_none());
    }

    #[test]
    fn bulk_query_escapes_filter_literal() {
        let q = bulk_products_query(Some("title:\"Tee\""), &[]);
        assert!(q.contains(r#"products(query: "title:\"Tee\"")"#));
        assert!(q.contains("id"));
    }

    #[test]
    fn bulk_query_embeds_metafield_keys() {
        let keys = vec!["filters.colours".to_owned()];
        let q = bulk_products_query(None, &keys);
        assert!(q.contains(r#"metafields(keys: ["filters.colours"])"#));
        assert!(q.contains("products {"));
    }
}
