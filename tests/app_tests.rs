/// Application flow tests against an in-memory backend.
///
/// Exercises the state container end to end: fetch planning, full and
/// incremental loads, error banners, configuration saves, and persistence
/// through the file-backed store.
mod common;

use sagra::app::{App, FetchOutcome, FetchPlan, View};
use sagra::client::OrderFeed;
use sagra::editor::{ConfigDraft, SavedConfiguration};
use sagra::model::Counter;
use sagra::store::{FileKvStore, KvStore, MemoryKvStore, UiStore};

use common::{FakeFeed, counter, order};

const DATE: &str = "2025-08-15";

fn memory_app(counters: Vec<Counter>) -> App<MemoryKvStore> {
    let mut app = App::new(UiStore::load(MemoryKvStore::new(), DATE));
    if !counters.is_empty() {
        app.save_configuration(SavedConfiguration {
            counters,
            date: String::new(),
            interval: 60,
        });
    }
    app
}

fn griglia() -> Counter {
    counter("c1", "Griglia", &[("1", "Panino", 2)])
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

#[test]
fn nothing_tracked_skips_the_network_and_clears_orders() {
    let feed = FakeFeed::default();
    let mut app = memory_app(Vec::new());
    assert_eq!(app.load_orders(&feed, false), None);
    assert!(feed.queries().is_empty());

    let feed = FakeFeed::default();
    feed.push(DATE, order(1, "12:00:00", &[("Panino", 3)]));
    let mut app = memory_app(vec![griglia()]);
    app.load_orders(&feed, false);
    assert_eq!(app.orders().len(), 1);
    assert_eq!(feed.queries().len(), 1);

    app.save_configuration(SavedConfiguration {
        counters: Vec::new(),
        date: String::new(),
        interval: 60,
    });
    assert_eq!(app.plan_fetch(false), FetchPlan::Cleared);
    assert!(app.orders().is_empty());
    assert_eq!(feed.queries().len(), 1);
    assert!(!app.is_loading());
}

#[test]
fn full_then_incremental_load() {
    let feed = FakeFeed::default();
    feed.push(DATE, order(1, "12:00:00", &[("Panino", 3)]));
    feed.push(DATE, order(2, "12:05:00", &[("Panino", 1)]));
    feed.push("2025-08-14", order(3, "20:00:00", &[("Panino", 9)]));
    let mut app = memory_app(vec![griglia()]);

    let outcome = app.load_orders(&feed, false);
    assert_eq!(outcome, Some(FetchOutcome::Replaced { received: 2 }));
    assert_eq!(app.snapshot().cards[0].ordered, 8);

    feed.push(DATE, order(4, "12:10:00", &[("Panino", 2)]));
    let outcome = app.load_orders(&feed, true);
    assert_eq!(outcome, Some(FetchOutcome::Merged { received: 1, added: 1 }));

    let queries = feed.queries();
    assert_eq!(queries[0].ora, None);
    assert_eq!(queries[1].ora.as_deref(), Some("12:05:00"));
    assert_eq!(queries[1].descrizioni, vec!["Panino"]);
    assert_eq!(app.orders().len(), 3);
    assert_eq!(app.snapshot().rows[0].id_ordine, 4);
}

#[test]
fn repeated_incremental_fetch_adds_nothing() {
    let feed = FakeFeed::default();
    feed.push(DATE, order(1, "12:00:00", &[("Panino", 1)]));
    let mut app = memory_app(vec![griglia()]);
    app.load_orders(&feed, false);

    for _ in 0..3 {
        let outcome = app.load_orders(&feed, true);
        assert_eq!(outcome, Some(FetchOutcome::Merged { received: 0, added: 0 }));
    }
    assert_eq!(app.orders().len(), 1);
}

#[test]
fn failed_fetch_shows_banner_and_keeps_orders() {
    let feed = FakeFeed::default();
    feed.push(DATE, order(1, "12:00:00", &[("Panino", 1)]));
    let mut app = memory_app(vec![griglia()]);
    app.load_orders(&feed, false);

    feed.fail(true);
    assert_eq!(app.load_orders(&feed, true), Some(FetchOutcome::Failed));
    assert_eq!(app.orders().len(), 1);
    assert!(!app.is_loading());
    let banner = app.snapshot().error.unwrap();
    assert!(banner.starts_with("Errore di rete o del server nel caricamento degli ordini"));

    // The next successful fetch clears the banner.
    feed.fail(false);
    app.load_orders(&feed, true);
    assert!(app.error().is_none());
}

#[test]
fn response_for_an_old_date_is_ignored() {
    let feed = FakeFeed::default();
    feed.push(DATE, order(1, "12:00:00", &[("Panino", 1)]));
    let mut app = memory_app(vec![griglia()]);

    let FetchPlan::Start(old) = app.plan_fetch(false) else {
        panic!("expected a fetch");
    };
    app.save_configuration(SavedConfiguration {
        counters: vec![griglia()],
        date: "2025-08-16".to_string(),
        interval: 60,
    });
    let FetchPlan::Start(new) = app.plan_fetch(false) else {
        panic!("expected a fetch");
    };
    assert_ne!(old.epoch(), new.epoch());

    assert_eq!(app.finish_fetch(&new, Ok(Vec::new())), FetchOutcome::Replaced { received: 0 });
    let late = feed.orders(&old.query);
    assert_eq!(app.finish_fetch(&old, late), FetchOutcome::Stale);
    assert!(app.orders().is_empty());
}

#[test]
fn article_load_rederives_descriptions() {
    let feed = FakeFeed::with_articles(&[(1, "Panino con porchetta")]);
    let mut app = memory_app(vec![counter("c1", "Griglia", &[("1", "Panino", 1)])]);

    let changed = app.articles_loaded(feed.articles());
    assert!(changed);
    assert_eq!(
        app.state().counters[0].tracked_items[0].descrizione,
        "Panino con porchetta"
    );
    let FetchPlan::Start(job) = app.plan_fetch(false) else {
        panic!("expected a fetch");
    };
    assert_eq!(job.query.descrizioni, vec!["Panino con porchetta"]);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn saving_rederives_descriptions_from_article_ids() {
    let feed = FakeFeed::with_articles(&[(1, "Panino")]);
    let mut app = memory_app(Vec::new());
    app.articles_loaded(feed.articles());

    app.save_configuration(SavedConfiguration {
        counters: vec![counter("c1", "Griglia", &[("1", "Panino vecchio", 1)])],
        date: String::new(),
        interval: 60,
    });
    assert_eq!(app.state().counters[0].tracked_items[0].descrizione, "Panino");

    app.load_orders(&feed, false);
    assert_eq!(feed.queries()[0].descrizioni, vec!["Panino"]);
}

#[test]
fn saving_drops_empty_counter_and_persists_valid_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ui-state.json");

    {
        let mut app = App::new(UiStore::load(FileKvStore::open(&path), DATE));
        let mut draft: ConfigDraft = app.draft();
        draft.add_counter();
        let valid = draft.add_counter();
        let item = draft.add_item(valid).unwrap();
        draft.counters[valid].tracked_items[item].article_id = "1".to_string();
        draft.counters[valid].tracked_items[item].descrizione = "Panino".to_string();
        draft.set_date("2025-08-20");
        app.save_configuration(draft.save());
        let id = app.state().counters[0].id.clone();
        app.set_cooked(&id, 4);
    }

    let reopened = App::new(UiStore::load(FileKvStore::open(&path), "2030-01-01"));
    let counters = &reopened.state().counters;
    assert_eq!(counters.len(), 1);
    assert_eq!(counters[0].name, "Contatore 2");
    assert_eq!(reopened.state().cooked(&counters[0].id), 4);
    assert_eq!(reopened.state().selected_date, "2025-08-20");
}

#[test]
fn interval_is_clamped_on_save() {
    let mut app = memory_app(vec![griglia()]);
    for (input, stored) in [(5, 10), (1000, 600), (45, 45)] {
        app.save_configuration(SavedConfiguration {
            counters: vec![griglia()],
            date: String::new(),
            interval: input,
        });
        assert_eq!(app.state().refresh_interval, stored);
        assert_eq!(app.refresh_schedule(), Some(stored));
        assert_eq!(
            app.store().backend().get("refreshInterval").as_deref(),
            Some(stored.to_string().as_str())
        );
    }
}

#[test]
fn saving_returns_to_dashboard_and_keeps_date_when_empty() {
    let mut app = memory_app(vec![griglia()]);
    app.set_view(View::Config);
    assert_eq!(app.refresh_schedule(), None);

    app.save_configuration(SavedConfiguration {
        counters: vec![griglia()],
        date: String::new(),
        interval: 60,
    });
    assert_eq!(app.view(), View::Dashboard);
    assert_eq!(app.state().selected_date, DATE);
    assert_eq!(app.refresh_schedule(), Some(60));
}

#[test]
fn removing_every_counter_idles_refresh() {
    let mut app = memory_app(vec![griglia()]);
    let mut draft = app.draft();
    draft.remove_counter(0);
    app.save_configuration(draft.save());
    assert!(app.state().counters.is_empty());
    assert_eq!(app.refresh_schedule(), None);
    assert!(app.snapshot().is_empty());
}
