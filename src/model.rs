//! Domain records shared by every part of the dashboard.
//!
//! Field names follow the backend's JSON contract (`articleId`,
//! `moltiplicatore`, `id_ordine`, `quantità`, ...) so the same types are used
//! for the HTTP feed and for the persisted UI state.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

/// A menu item known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub descrizione: String,
}

/// Find the article whose id matches a tracked item's `articleId`.
///
/// `articleId` is stored as a string (it comes from a `<select>` value), so
/// it is parsed before comparing. Unparseable ids never match.
pub fn find_article<'a>(articles: &'a [Article], article_id: &str) -> Option<&'a Article> {
    let id: i64 = article_id.trim().parse().ok()?;
    articles.iter().find(|a| a.id == id)
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// A (menu item, multiplier) pair assigned to a counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    #[serde(rename = "articleId", default)]
    pub article_id: String,
    #[serde(default)]
    pub descrizione: String,
    #[serde(default = "default_multiplier")]
    pub moltiplicatore: i64,
}

fn default_multiplier() -> i64 {
    1
}

impl TrackedItem {
    /// A fresh item with no article selected and multiplier 1.
    pub fn unselected() -> Self {
        Self {
            article_id: String::new(),
            descrizione: String::new(),
            moltiplicatore: default_multiplier(),
        }
    }

    /// Description for this item, derived from `article_id` when possible.
    ///
    /// Falls back to the stored copy when the article list is empty or does
    /// not contain the id (e.g. before articles have loaded).
    pub fn resolve_description<'a>(&'a self, articles: &'a [Article]) -> &'a str {
        find_article(articles, &self.article_id)
            .map(|a| a.descrizione.as_str())
            .unwrap_or(&self.descrizione)
    }

    /// Whether the item survives a configuration save.
    pub fn is_valid(&self) -> bool {
        !self.article_id.is_empty() && self.moltiplicatore > 0
    }

    /// The multiplier as an unsigned weight; non-positive values weigh 0.
    pub fn weight(&self) -> u64 {
        u64::try_from(self.moltiplicatore).unwrap_or(0)
    }
}

/// A preparation station aggregating one or more tracked items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "trackedItems", default)]
    pub tracked_items: Vec<TrackedItem>,
}

impl Counter {
    /// Tracked descriptions in configuration order (duplicates kept).
    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.tracked_items.iter().map(|item| item.descrizione.as_str())
    }

    /// Re-derive every stored `descrizione` from the article list.
    ///
    /// Returns `true` if any description changed.
    pub fn refresh_descriptions(&mut self, articles: &[Article]) -> bool {
        let mut changed = false;
        for item in &mut self.tracked_items {
            if let Some(article) = find_article(articles, &item.article_id)
                && article.descrizione != item.descrizione
            {
                item.descrizione = article.descrizione.clone();
                changed = true;
            }
        }
        changed
    }
}

/// Every description tracked by any counter, in first-seen order.
///
/// Empty descriptions are skipped: they cannot match any order line.
pub fn tracked_descriptions(counters: &[Counter]) -> Vec<String> {
    let mut seen = HashSet::new();
    counters
        .iter()
        .flat_map(|c| c.descriptions())
        .filter(|d| !d.is_empty())
        .filter(|d| seen.insert(*d))
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// A customer order with per-item quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id_ordine: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cliente: String,
    #[serde(default)]
    pub ora: Option<String>,
    #[serde(rename = "quantità", default)]
    pub quantita: BTreeMap<String, u64>,
}

impl Order {
    /// Ordered quantity for a description, 0 when absent.
    pub fn quantity(&self, descrizione: &str) -> u64 {
        self.quantita.get(descrizione).copied().unwrap_or(0)
    }

    /// The order time if present and non-empty.
    pub fn time(&self) -> Option<&str> {
        self.ora.as_deref().filter(|t| !t.is_empty())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Operator-entered cooked units per counter id.
pub type CookedCounts = BTreeMap<String, u64>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn articles() -> Vec<Article> {
        vec![
            Article {
                id: 1,
                descrizione: "Panino".to_string(),
            },
            Article {
                id: 2,
                descrizione: "Patatine".to_string(),
            },
        ]
    }

    #[test]
    fn order_deserializes_backend_shape() {
        let json = r#"{"id_ordine": 7, "cliente": "Rossi", "ora": "12:30:00", "quantità": {"Panino": 2}}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id_ordine, 7);
        assert_eq!(order.time(), Some("12:30:00"));
        assert_eq!(order.quantity("Panino"), 2);
        assert_eq!(order.quantity("Birra"), 0);
    }

    #[test]
    fn order_accepts_null_time_and_client() {
        let json = r#"{"id_ordine": 3, "cliente": null, "ora": null, "quantità": {}}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.cliente, "");
        assert_eq!(order.time(), None);
    }

    #[test]
    fn counter_uses_external_field_names() {
        let json = r#"{"id":"c1","name":"Griglia","trackedItems":[{"articleId":"1","descrizione":"Panino","moltiplicatore":2}]}"#;
        let counter: Counter = serde_json::from_str(json).unwrap();
        assert_eq!(counter.tracked_items[0].article_id, "1");
        let back = serde_json::to_string(&counter).unwrap();
        assert!(back.contains("\"trackedItems\""));
        assert!(back.contains("\"articleId\":\"1\""));
    }

    #[test]
    fn description_is_resolved_from_article_id() {
        let item = TrackedItem {
            article_id: "2".to_string(),
            descrizione: "stale".to_string(),
            moltiplicatore: 1,
        };
        assert_eq!(item.resolve_description(&articles()), "Patatine");
        assert_eq!(item.resolve_description(&[]), "stale");
    }

    #[test]
    fn refresh_descriptions_rewrites_stale_copies() {
        let mut counter = Counter {
            id: "c1".to_string(),
            name: "Griglia".to_string(),
            tracked_items: vec![TrackedItem {
                article_id: "1".to_string(),
                descrizione: "Panino vecchio".to_string(),
                moltiplicatore: 1,
            }],
        };
        assert!(counter.refresh_descriptions(&articles()));
        assert_eq!(counter.tracked_items[0].descrizione, "Panino");
        assert!(!counter.refresh_descriptions(&articles()));
    }

    #[test]
    fn tracked_descriptions_dedups_and_skips_empty() {
        let item = |d: &str| TrackedItem {
            article_id: "1".to_string(),
            descrizione: d.to_string(),
            moltiplicatore: 1,
        };
        let counters = vec![
            Counter {
                id: "a".to_string(),
                name: "A".to_string(),
                tracked_items: vec![item("Panino"), item("")],
            },
            Counter {
                id: "b".to_string(),
                name: "B".to_string(),
                tracked_items: vec![item("Patatine"), item("Panino")],
            },
        ];
        assert_eq!(tracked_descriptions(&counters), vec!["Panino", "Patatine"]);
    }

    #[test]
    fn non_positive_multiplier_weighs_nothing() {
        let mut item = TrackedItem::unselected();
        item.moltiplicatore = -3;
        assert_eq!(item.weight(), 0);
        assert!(!item.is_valid());
    }
}
