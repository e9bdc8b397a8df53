//! Currency-aware price strings.
//!
//! Amounts are rounded half away from zero to the currency's minor-unit
//! exponent (two places when unknown), grouped with `,` thousands
//! separators and prefixed with a symbol, following en-US conventions:
//! `$1,234.50`, `£4.00`, `¥1,200`.
//!
//! Symbol lookup order:
//! 1. the configured override table (e.g. `AUD -> A$`),
//! 2. the built-in en-US table (`CA$`, `NZ$`, `CHF`, `SEK`),
//! 3. ISO 4217 currency data from `iso_currency`, unless the symbol is
//!    shared between currencies or is a bare word,
//! 4. the raw code itself (`XTS 5.00`) for anything else.

use std::collections::BTreeMap;

use iso_currency::Currency;
use rust_decimal::{Decimal, RoundingStrategy};

/// Minor-unit digits used when the currency is unknown.
const DEFAULT_SCALE: u32 = 2;

const STARTING_FROM: &str = "Starting from ";

/// en-US display symbols for currencies whose ISO symbol is shared or local.
const EN_US_SYMBOLS: &[(&str, &str)] = &[
    ("AUD", "A$"),
    ("BRL", "R$"),
    ("CAD", "CA$"),
    ("CHF", "CHF"),
    ("CNY", "CN¥"),
    ("CZK", "CZK"),
    ("DKK", "DKK"),
    ("HKD", "HK$"),
    ("MXN", "MX$"),
    ("NOK", "NOK"),
    ("NZD", "NZ$"),
    ("PLN", "PLN"),
    ("SEK", "SEK"),
    ("SGD", "SGD"),
    ("TWD", "NT$"),
    ("ZAR", "ZAR"),
];

/// Symbols used by several currencies, paired with the one currency allowed
/// to print them bare.
const SHARED_SYMBOLS: &[(&str, Option<&str>)] = &[
    ("$", Some("USD")),
    ("£", Some("GBP")),
    ("¥", Some("JPY")),
    ("₣", None),
];

/// Formats one amount in `currency_code`.
#[must_use]
pub fn format_amount(
    amount: Decimal,
    currency_code: Option<&str>,
    symbols: &BTreeMap<String, String>,
) -> String {
    let code = currency_code
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| !c.is_empty());
    let currency = code.as_deref().and_then(Currency::from_code);
    let scale = currency
        .and_then(|c| c.exponent())
        .map_or(DEFAULT_SCALE, u32::from);

    let rounded = amount.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let number = group_digits(&format!("{:.*}", scale as usize, rounded.abs()));

    let Some(code) = code else {
        return format!("{sign}{number}");
    };

    if let Some(symbol) = symbols.get(&code) {
        return with_symbol(sign, symbol, &number);
    }
    if let Some((_, symbol)) = EN_US_SYMBOLS.iter().find(|(c, _)| *c == code) {
        return with_symbol(sign, symbol, &number);
    }

    let iso = currency.map(|c| c.symbol().symbol);
    match iso.as_deref().and_then(|symbol| iso_symbol(&code, symbol)) {
        Some(symbol) => with_symbol(sign, symbol, &number),
        None => format!("{sign}{code} {number}"),
    }
}

/// Returns the ISO symbol when it identifies `code` on its own. Shared
/// symbols (`$` for anything but USD) and bare words (`kr`) give `None`.
fn iso_symbol<'a>(code: &str, symbol: &'a str) -> Option<&'a str> {
    let symbol = symbol.trim();
    if symbol.is_empty() || symbol.chars().all(char::is_alphabetic) {
        return None;
    }
    match SHARED_SYMBOLS.iter().find(|(s, _)| *s == symbol) {
        Some((_, owner)) => (*owner == Some(code)).then_some(symbol),
        None => Some(symbol),
    }
}

/// Formats a min/max pair: the single price when both render identically,
/// otherwise `"Starting from <min>"`.
#[must_use]
pub fn format_price_range(
    min: Decimal,
    max: Decimal,
    currency_code: Option<&str>,
    symbols: &BTreeMap<String, String>,
) -> String {
    let low = format_amount(min, currency_code, symbols);
    let high = format_amount(max, currency_code, symbols);
    if low == high {
        low
    } else {
        format!("{STARTING_FROM}{low}")
    }
}

/// Alphabetic symbols (`DKK`, `CHF`) are separated from the number by a space.
fn with_symbol(sign: &str, symbol: &str, number: &str) -> String {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return format!("{sign}{number}");
    }
    let separator = if symbol.chars().last().is_some_and(char::is_alphabetic) {
        " "
    } else {
        ""
    };
    format!("{sign}{symbol}{separator}{number}")
}

/// Inserts `,` every three digits in the integer part of `digits`.
fn group_digits(digits: &str) -> String {
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let len = int_part.len();
    let mut out = String::with_capacity(digits.len() + len / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}
