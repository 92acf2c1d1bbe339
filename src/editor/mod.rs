//! Configuration editor: a working draft of counters, date and interval.
//!
//! The draft is a private copy; nothing reaches the application until
//! [`ConfigDraft::save`] produces a cleaned [`SavedConfiguration`].

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::model::{Article, Counter, TrackedItem, find_article};
use crate::refresh::DEFAULT_INTERVAL_SECS;

static NEXT_COUNTER_SEQ: AtomicU64 = AtomicU64::new(0);

/// A process-unique counter id: `counter_<millis>_<seq>`.
pub fn new_counter_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = NEXT_COUNTER_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("counter_{millis}_{seq}")
}

/// Parse a free-typed interval the way the form does: anything that is not a
/// non-zero integer becomes the default.
pub fn parse_interval_input(text: &str) -> i64 {
    match text.trim().parse::<i64>() {
        Ok(0) | Err(_) => i64::from(DEFAULT_INTERVAL_SECS),
        Ok(n) => n,
    }
}

/// What a save hands back to the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConfiguration {
    pub counters: Vec<Counter>,
    pub date: String,
    /// Unclamped; the application clamps on commit.
    pub interval: i64,
}

/// Editable copy of the current configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDraft {
    pub counters: Vec<Counter>,
    pub date: String,
    pub interval: i64,
}

impl ConfigDraft {
    pub fn new(counters: Vec<Counter>, date: impl Into<String>, interval: u32) -> Self {
        Self {
            counters,
            date: date.into(),
            interval: i64::from(interval),
        }
    }

    /// Append a counter with a fresh id and a default name. Returns its index.
    pub fn add_counter(&mut self) -> usize {
        let name = format!("Contatore {}", self.counters.len() + 1);
        self.counters.push(Counter {
            id: new_counter_id(),
            name,
            tracked_items: Vec::new(),
        });
        self.counters.len() - 1
    }

    pub fn rename_counter(&mut self, index: usize, name: &str) -> bool {
        match self.counters.get_mut(index) {
            Some(counter) => {
                counter.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove_counter(&mut self, index: usize) -> Option<Counter> {
        (index < self.counters.len()).then(|| self.counters.remove(index))
    }

    /// Append an unselected item to a counter. Returns its index.
    pub fn add_item(&mut self, counter: usize) -> Option<usize> {
        let items = &mut self.counters.get_mut(counter)?.tracked_items;
        items.push(TrackedItem::unselected());
        Some(items.len() - 1)
    }

    pub fn remove_item(&mut self, counter: usize, item: usize) -> Option<TrackedItem> {
        let items = &mut self.counters.get_mut(counter)?.tracked_items;
        (item < items.len()).then(|| items.remove(item))
    }

    /// Point an item at an article, re-resolving its description.
    ///
    /// An id that matches no article leaves the description empty.
    pub fn select_article(
        &mut self,
        counter: usize,
        item: usize,
        article_id: &str,
        articles: &[Article],
    ) -> bool {
        let Some(entry) = self.item_mut(counter, item) else {
            return false;
        };
        entry.article_id = article_id.to_string();
        entry.descrizione = find_article(articles, article_id)
            .map(|a| a.descrizione.clone())
            .unwrap_or_default();
        true
    }

    pub fn set_multiplier(&mut self, counter: usize, item: usize, multiplier: i64) -> bool {
        match self.item_mut(counter, item) {
            Some(entry) => {
                entry.moltiplicatore = multiplier;
                true
            }
            None => false,
        }
    }

    pub fn set_date(&mut self, date: &str) {
        self.date = date.to_string();
    }

    pub fn set_interval_input(&mut self, text: &str) {
        self.interval = parse_interval_input(text);
    }

    /// Drop unusable items, then counters left nameless or empty.
    pub fn save(&self) -> SavedConfiguration {
        let counters = self
            .counters
            .iter()
            .map(|counter| Counter {
                tracked_items: counter
                    .tracked_items
                    .iter()
                    .filter(|item| item.is_valid())
                    .cloned()
                    .collect(),
                ..counter.clone()
            })
            .filter(|counter| !counter.name.is_empty() && !counter.tracked_items.is_empty())
            .collect();

        SavedConfiguration {
            counters,
            date: self.date.clone(),
            interval: self.interval,
        }
    }

    fn item_mut(&mut self, counter: usize, item: usize) -> Option<&mut TrackedItem> {
        self.counters.get_mut(counter)?.tracked_items.get_mut(item)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn articles() -> Vec<Article> {
        vec![
            Article {
                id: 10,
                descrizione: "Panino con salamella".to_string(),
            },
            Article {
                id: 11,
                descrizione: "Patatine".to_string(),
            },
        ]
    }

    #[test]
    fn counter_ids_are_unique() {
        let a = new_counter_id();
        let b = new_counter_id();
        assert_ne!(a, b);
        assert!(a.starts_with("counter_"));
    }

    #[test]
    fn add_counter_uses_default_name() {
        let mut draft = ConfigDraft::new(Vec::new(), "2025-08-15", 60);
        draft.add_counter();
        let second = draft.add_counter();
        assert_eq!(draft.counters[second].name, "Contatore 2");
        assert!(draft.counters[second].tracked_items.is_empty());
    }

    #[test]
    fn select_article_resolves_description() {
        let mut draft = ConfigDraft::new(Vec::new(), "2025-08-15", 60);
        let c = draft.add_counter();
        let i = draft.add_item(c).unwrap();
        assert!(draft.select_article(c, i, "11", &articles()));
        assert_eq!(draft.counters[c].tracked_items[i].descrizione, "Patatine");

        assert!(draft.select_article(c, i, "99", &articles()));
        assert_eq!(draft.counters[c].tracked_items[i].article_id, "99");
        assert_eq!(draft.counters[c].tracked_items[i].descrizione, "");
    }

    #[test]
    fn out_of_range_edits_are_ignored() {
        let mut draft = ConfigDraft::new(Vec::new(), "2025-08-15", 60);
        assert!(!draft.rename_counter(0, "x"));
        assert!(draft.remove_counter(3).is_none());
        assert!(draft.add_item(0).is_none());
        assert!(!draft.set_multiplier(0, 0, 2));
    }

    #[test]
    fn save_filters_items_then_counters() {
        let mut draft = ConfigDraft::new(Vec::new(), "2025-08-15", 60);

        let grill = draft.add_counter();
        draft.rename_counter(grill, "Griglia");
        let keep = draft.add_item(grill).unwrap();
        draft.select_article(grill, keep, "10", &articles());
        let zero = draft.add_item(grill).unwrap();
        draft.select_article(grill, zero, "11", &articles());
        draft.set_multiplier(grill, zero, 0);
        draft.add_item(grill);

        let nameless = draft.add_counter();
        draft.rename_counter(nameless, "");
        let item = draft.add_item(nameless).unwrap();
        draft.select_article(nameless, item, "11", &articles());

        draft.add_counter();

        let saved = draft.save();
        assert_eq!(saved.counters.len(), 1);
        assert_eq!(saved.counters[0].name, "Griglia");
        assert_eq!(saved.counters[0].tracked_items.len(), 1);
        assert_eq!(saved.counters[0].tracked_items[0].article_id, "10");

        // The draft itself is untouched.
        assert_eq!(draft.counters.len(), 3);
        assert_eq!(draft.counters[0].tracked_items.len(), 3);
    }

    #[test]
    fn interval_input_parsing() {
        assert_eq!(parse_interval_input("120"), 120);
        assert_eq!(parse_interval_input("5"), 5);
        assert_eq!(parse_interval_input(""), 60);
        assert_eq!(parse_interval_input("abc"), 60);
        assert_eq!(parse_interval_input("0"), 60);
    }
}
