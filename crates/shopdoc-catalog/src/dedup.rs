//! First-seen-wins duplicate removal over normalized rows.

use std::collections::HashSet;

use shopdoc_core::{DedupKey, OutputRow};

/// Streaming deduplicator. Rows are admitted in arrival order; a row whose
/// key value was already seen is rejected and counted.
#[derive(Debug, Default)]
pub struct Deduplicator {
    key: DedupKey,
    seen: HashSet<String>,
    dropped: usize,
}

impl Deduplicator {
    #[must_use]
    pub fn new(key: DedupKey) -> Self {
        Self {
            key,
            seen: HashSet::new(),
            dropped: 0,
        }
    }

    /// Returns `true` if `row` should be kept.
    pub fn admit(&mut self, row: &OutputRow) -> bool {
        let Some(value) = row.dedup_value(self.key) else {
            return true;
        };
        if self.seen.insert(value.to_owned()) {
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(title: &str, description: &str) -> OutputRow {
        OutputRow {
            title: title.to_owned(),
            heading: "Mugs".to_owned(),
            description: description.to_owned(),
            price: "$10.00".to_owned(),
            tokens: 200,
        }
    }

    fn admit_all(rows: Vec<OutputRow>, key: DedupKey) -> (Vec<OutputRow>, usize) {
        let mut dedup = Deduplicator::new(key);
        let kept: Vec<OutputRow> = rows.into_iter().filter(|row| dedup.admit(row)).collect();
        (kept, dedup.dropped())
    }

    #[test]
    fn keeps_first_row_per_description() {
        let rows = vec![
            row("Mug Red", "Ceramic mug"),
            row("Mug Blue", "Ceramic mug"),
            row("Plate", "Stoneware plate"),
        ];
        let (kept, dropped) = admit_all(rows, DedupKey::Description);

        assert_eq!(dropped, 1);
        let titles: Vec<&str> = kept.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Mug Red", "Plate"]);
    }

    #[test]
    fn title_key_ignores_description() {
        let rows = vec![
            row("Mug", "Red ceramic"),
            row("Mug", "Blue ceramic"),
            row("Bowl", "Red ceramic"),
        ];
        let (kept, dropped) = admit_all(rows, DedupKey::Title);

        assert_eq!(dropped, 1);
        assert_eq!(kept[1].title, "Bowl");
    }

    #[test]
    fn none_key_keeps_everything() {
        let rows = vec![row("Mug", "Same"), row("Mug", "Same")];
        let (kept, dropped) = admit_all(rows, DedupKey::None);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn placeholder_descriptions_collapse() {
        let mut dedup = Deduplicator::new(DedupKey::Description);
        assert!(dedup.admit(&row("A", "No description present.")));
        assert!(!dedup.admit(&row("B", "No description present.")));
        assert_eq!(dedup.dropped(), 1);
    }
}
