use std::collections::BTreeMap;

use super::*;
use crate::types::{PriceRange, ProductOption};

fn money(amount: &str, code: &str) -> Money {
    Money {
        amount: Some(amount.to_owned()),
        currency_code: Some(code.to_owned()),
    }
}

fn metafield(namespace: &str, key: &str, value: &str) -> Metafield {
    Metafield {
        namespace: Some(namespace.to_owned()),
        key: key.to_owned(),
        value: Some(value.to_owned()),
    }
}

fn product(title: &str) -> RawProduct {
    RawProduct {
        id: None,
        title: title.to_owned(),
        product_type: Some("Jackets".to_owned()),
        description: Some("<p>Waterproof shell.</p>".to_owned()),
        options: vec![ProductOption {
            name: "Size".to_owned(),
            values: vec!["M".to_owned()],
        }],
        metafields: Vec::new(),
        price_range: Some(PriceRange {
            min: money("120.0", "USD"),
            max: money("120.0", "USD"),
        }),
    }
}

fn config() -> NormalizationConfig {
    NormalizationConfig {
        metafield_keys: vec!["custom.material".to_owned(), "filters.colours".to_owned()],
        colours_key: Some("filters.colours".to_owned()),
        truncate_marker: None,
        currency_symbols: BTreeMap::from([("AUD".to_owned(), "A$".to_owned())]),
    }
}

#[test]
fn normalizes_complete_product() {
    let row = normalize_product(&product("Storm Jacket"), &config()).unwrap();

    assert_eq!(row.title, "Storm Jacket");
    assert_eq!(row.heading, "Jackets");
    assert_eq!(row.description, "Waterproof shell.");
    assert_eq!(row.price, "$120.00");
    assert_eq!(row.tokens, PLACEHOLDER_TOKENS);
}

#[test]
fn blank_product_type_uses_placeholder_heading() {
    assert_eq!(resolve_heading(None), NO_TYPE);
    assert_eq!(resolve_heading(Some("  ")), NO_TYPE);
    assert_eq!(resolve_heading(Some("Hats")), "Hats");
}

#[test]
fn merge_covers_all_four_cases() {
    let extras = vec!["Cotton".to_owned(), "Colours : Red".to_owned()];
    assert_eq!(
        merge_description("Soft tee", &extras),
        "Soft tee. Product Extra Information: Cotton. Colours : Red"
    );
    assert_eq!(merge_description("", &extras), "Cotton. Colours : Red");
    assert_eq!(merge_description("Soft tee", &[]), "Soft tee");
    assert_eq!(merge_description("  ", &[]), NO_DESCRIPTION);
}

#[test]
fn allow_listed_metafields_are_appended_in_order() {
    let mut p = product("Storm Jacket");
    p.metafields = vec![
        metafield("custom", "material", "<b>Recycled</b> nylon"),
        metafield("custom", "care", "Hand wash"),
        metafield("filters", "colours", r#"["Red","Navy"]"#),
    ];

    let row = normalize_product(&p, &config()).unwrap();
    assert_eq!(
        row.description,
        "Waterproof shell.. Product Extra Information: Recycled nylon. Colours : Red, Navy"
    );
}

#[test]
fn extras_only_when_base_description_is_empty() {
    let mut p = product("Beanie");
    p.description = Some(String::new());
    p.metafields = vec![metafield("custom", "material", "Merino")];

    let row = normalize_product(&p, &config()).unwrap();
    assert_eq!(row.description, "Merino");
}

#[test]
fn no_text_anywhere_gives_placeholder_description() {
    let mut p = product("Sticker");
    p.description = None;
    p.metafields = vec![metafield("custom", "material", "   ")];

    let row = normalize_product(&p, &config()).unwrap();
    assert_eq!(row.description, NO_DESCRIPTION);
}

#[test]
fn colours_that_are_not_json_fall_back_to_text() {
    let mut p = product("Scarf");
    p.description = None;
    p.metafields = vec![metafield("filters", "colours", "Red and blue")];

    let row = normalize_product(&p, &config()).unwrap();
    assert_eq!(row.description, "Red and blue");
}

#[test]
fn truncate_marker_cuts_metafield_text() {
    let mut cfg = config();
    cfg.truncate_marker = Some(" Designed".to_owned());
    let mut p = product("Parka");
    p.description = None;
    p.metafields = vec![metafield(
        "custom",
        "material",
        "Organic cotton. Designed in Copenhagen",
    )];

    let row = normalize_product(&p, &cfg).unwrap();
    assert_eq!(row.description, "Organic cotton.");
}

#[test]
fn differing_bounds_render_starting_from() {
    let mut p = product("Boots");
    p.price_range = Some(PriceRange {
        min: money("4.5", "GBP"),
        max: money("9.0", "GBP"),
    });

    let row = normalize_product(&p, &config()).unwrap();
    assert_eq!(row.price, "Starting from £4.50");
}

#[test]
fn currency_override_table_is_used() {
    let mut p = product("Thongs");
    p.price_range = Some(PriceRange {
        min: money("25", "AUD"),
        max: money("25", "AUD"),
    });

    assert_eq!(normalize_product(&p, &config()).unwrap().price, "A$25.00");
}

#[test]
fn missing_price_range_is_malformed() {
    let mut p = product("Gift Card");
    p.price_range = None;

    let err = normalize_product(&p, &config()).unwrap_err();
    assert!(matches!(
        err,
        NormalizeError::MalformedRecord { ref title, .. } if title == "Gift Card"
    ));
}

#[test]
fn unparsable_amount_is_malformed() {
    let mut p = product("Mystery Box");
    p.price_range = Some(PriceRange {
        min: money("free", "USD"),
        max: money("10", "USD"),
    });

    let err = normalize_product(&p, &config()).unwrap_err();
    let NormalizeError::MalformedRecord { reason, .. } = err;
    assert!(reason.contains("free"), "got {reason}");
}

#[test]
fn empty_title_is_malformed() {
    let err = normalize_product(&product("  "), &config()).unwrap_err();
    assert!(matches!(err, NormalizeError::MalformedRecord { .. }));
}

#[test]
fn normalization_is_deterministic() {
    let mut p = product("Storm Jacket");
    p.metafields = vec![metafield("filters", "colours", r#"["Black"]"#)];
    let cfg = config();

    assert_eq!(
        normalize_product(&p, &cfg).unwrap(),
        normalize_product(&p, &cfg).unwrap()
    );
}
