//! Output row shape and the export policies that govern how rows are built,
//! deduplicated, and laid out in the delimited file.

use std::fmt;
use std::str::FromStr;

/// Constant carried in the `tokens` column for the docstore importer. It is
/// never computed.
pub const PLACEHOLDER_TOKENS: u32 = 200;

/// One flattened product, ready for the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub title: String,
    /// Resolved product type, or `"No type present"`.
    pub heading: String,
    /// Synthesized description (base text merged with metafield extras).
    pub description: String,
    /// Formatted price, e.g. `"$12.00"` or `"Starting from £4.50"`.
    pub price: String,
    pub tokens: u32,
}

impl OutputRow {
    /// Single templated blob combining title, price and description, used by
    /// the [`OutputShape::Content`] layout.
    #[must_use]
    pub fn content(&self) -> String {
        format!(
            "Product Title:\"{}\". Product Price: \"{}\". Product Description: \"{}\"",
            self.title, self.price, self.description
        )
    }

    /// Returns the value rows are deduplicated on, or `None` when dedup is off.
    #[must_use]
    pub fn dedup_value(&self, key: DedupKey) -> Option<&str> {
        match key {
            DedupKey::Description => Some(&self.description),
            DedupKey::Title => Some(&self.title),
            DedupKey::None => None,
        }
    }
}

/// Column layout of the exported file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputShape {
    /// `title;product_type;description;price`
    #[default]
    Columns,
    /// `title;heading;content;tokens`, where `content` is [`OutputRow::content`].
    Content,
}

impl OutputShape {
    #[must_use]
    pub fn headers(self) -> [&'static str; 4] {
        match self {
            OutputShape::Columns => ["title", "product_type", "description", "price"],
            OutputShape::Content => ["title", "heading", "content", "tokens"],
        }
    }

    /// Renders `row` into the fields for this layout, in header order.
    #[must_use]
    pub fn record(self, row: &OutputRow) -> [String; 4] {
        match self {
            OutputShape::Columns => [
                row.title.clone(),
                row.heading.clone(),
                row.description.clone(),
                row.price.clone(),
            ],
            OutputShape::Content => [
                row.title.clone(),
                row.heading.clone(),
                row.content(),
                row.tokens.to_string(),
            ],
        }
    }
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputShape::Columns => write!(f, "columns"),
            OutputShape::Content => write!(f, "content"),
        }
    }
}

impl FromStr for OutputShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "columns" => Ok(OutputShape::Columns),
            "content" => Ok(OutputShape::Content),
            other => Err(format!(
                "unknown output shape \"{other}\" (expected \"columns\" or \"content\")"
            )),
        }
    }
}

/// Which field identifies duplicate rows.
///
/// Defaults to the synthesized description: two distinct products that end up
/// with the same description text collapse into the first one seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupKey {
    #[default]
    Description,
    Title,
    None,
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupKey::Description => write!(f, "description"),
            DedupKey::Title => write!(f, "title"),
            DedupKey::None => write!(f, "none"),
        }
    }
}

impl FromStr for DedupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "description" => Ok(DedupKey::Description),
            "title" => Ok(DedupKey::Title),
            "none" | "off" => Ok(DedupKey::None),
            other => Err(format!(
                "unknown dedup key \"{other}\" (expected \"description\", \"title\" or \"none\")"
            )),
        }
    }
}

/// What to do with a record whose required fields cannot be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Log, count, and leave the record out of the export.
    #[default]
    Skip,
    /// Fail the whole run on the first malformed record.
    Abort,
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedPolicy::Skip => write!(f, "skip"),
            MalformedPolicy::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(MalformedPolicy::Skip),
            "abort" => Ok(MalformedPolicy::Abort),
            other => Err(format!(
                "unknown malformed-record policy \"{other}\" (expected \"skip\" or \"abort\")"
            )),
        }
    }
}
