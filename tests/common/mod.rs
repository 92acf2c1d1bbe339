//! In-memory order backend shared by the integration tests.
#![allow(dead_code)]

use std::sync::Mutex;

use sagra::client::{OrderFeed, OrdersQuery};
use sagra::error::FetchError;
use sagra::model::{Article, Counter, Order, TrackedItem};

/// Answers like the real backend: orders for the date that contain any of
/// the requested descriptions, strictly after `ora` when given.
#[derive(Default)]
pub struct FakeFeed {
    pub articles: Vec<Article>,
    orders: Mutex<Vec<(String, Order)>>,
    queries: Mutex<Vec<OrdersQuery>>,
    failing: Mutex<bool>,
}

impl FakeFeed {
    pub fn with_articles(articles: &[(i64, &str)]) -> Self {
        Self {
            articles: articles
                .iter()
                .map(|&(id, descrizione)| Article {
                    id,
                    descrizione: descrizione.to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn push(&self, date: &str, order: Order) {
        self.orders.lock().unwrap().push((date.to_string(), order));
    }

    pub fn fail(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn queries(&self) -> Vec<OrdersQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl OrderFeed for FakeFeed {
    fn articles(&self) -> Result<Vec<Article>, FetchError> {
        Ok(self.articles.clone())
    }

    fn orders(&self, query: &OrdersQuery) -> Result<Vec<Order>, FetchError> {
        self.queries.lock().unwrap().push(query.clone());
        if *self.failing.lock().unwrap() {
            return Err(FetchError::Network("connection refused".to_string()));
        }
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|(date, _)| *date == query.data)
            .map(|(_, order)| order)
            .filter(|order| match (&query.ora, order.time()) {
                (Some(since), Some(time)) => time > since.as_str(),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|order| query.descrizioni.iter().any(|d| order.quantity(d) > 0))
            .cloned()
            .collect())
    }
}

pub fn order(id: i64, ora: &str, lines: &[(&str, u64)]) -> Order {
    Order {
        id_ordine: id,
        cliente: format!("Cliente {id}"),
        ora: Some(ora.to_string()),
        quantita: lines.iter().map(|&(d, q)| (d.to_string(), q)).collect(),
    }
}

pub fn counter(id: &str, name: &str, items: &[(&str, &str, i64)]) -> Counter {
    Counter {
        id: id.to_string(),
        name: name.to_string(),
        tracked_items: items
            .iter()
            .map(|&(article_id, descrizione, moltiplicatore)| TrackedItem {
                article_id: article_id.to_string(),
                descrizione: descrizione.to_string(),
                moltiplicatore,
            })
            .collect(),
    }
}
