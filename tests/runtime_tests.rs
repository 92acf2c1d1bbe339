/// Event loop tests: background fetches, the ticker, and surface input.
///
/// Each test drives the loop with `Runtime::step` until a condition holds,
/// so nothing here depends on wall-clock timing beyond a generous deadline.
mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use sagra::app::App;
use sagra::editor::SavedConfiguration;
use sagra::journal::{FetchKind, Journal};
use sagra::runtime::{Event, Flow, Runtime, SharedFeed, Surface};
use sagra::store::{KvStore, MemoryKvStore, UiStore};

use common::{FakeFeed, counter, order};

const DATE: &str = "2025-08-15";

/// Records renders and understands two commands: `toggle` and `quit`.
#[derive(Default)]
struct Recorder {
    renders: usize,
}

impl<S: KvStore> Surface<S, String> for Recorder {
    fn handle(&mut self, runtime: &mut Runtime<S, String>, input: String) -> Flow {
        match input.as_str() {
            "toggle" => runtime.app_mut().toggle_auto_refresh(),
            "refresh" => {
                runtime.refresh_now();
            }
            "quit" => return Flow::Quit,
            _ => {}
        }
        Flow::Continue
    }

    fn render(&mut self, _app: &App<S>) {
        self.renders += 1;
    }
}

fn runtime(feed: &Arc<FakeFeed>, journal: Journal) -> Runtime<MemoryKvStore, String> {
    let mut app = App::new(UiStore::load(MemoryKvStore::new(), DATE));
    app.save_configuration(SavedConfiguration {
        counters: vec![counter("c1", "Griglia", &[("1", "Panino", 1)])],
        date: String::new(),
        interval: 10,
    });
    let shared: SharedFeed = feed.clone();
    Runtime::new(app, shared, journal).with_tick_period(Duration::from_millis(2))
}

fn pump_until(
    runtime: &mut Runtime<MemoryKvStore, String>,
    surface: &mut Recorder,
    done: impl Fn(&Runtime<MemoryKvStore, String>) -> bool,
) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done(runtime) {
        assert!(Instant::now() < deadline, "condition not reached in time");
        runtime.step(surface, Duration::from_millis(50));
    }
}

#[test]
fn startup_load_runs_in_background_and_renders() {
    let feed = Arc::new(FakeFeed::with_articles(&[(1, "Panino")]));
    feed.push(DATE, order(1, "12:00:00", &[("Panino", 2)]));
    feed.push(DATE, order(2, "12:01:00", &[("Panino", 1)]));
    let mut runtime = runtime(&feed, Journal::disabled());
    let mut surface = Recorder::default();

    runtime.load_articles();
    runtime.reload();
    pump_until(&mut runtime, &mut surface, |rt| {
        rt.app().orders().len() == 2 && !rt.app().articles().is_empty()
    });

    assert!(surface.renders > 0);
    assert_eq!(runtime.app().snapshot().cards[0].ordered, 3);
}

#[test]
fn countdown_triggers_incremental_fetch() {
    let feed = Arc::new(FakeFeed::default());
    feed.push(DATE, order(1, "12:00:00", &[("Panino", 1)]));
    let mut runtime = runtime(&feed, Journal::disabled());
    let mut surface = Recorder::default();

    runtime.reload();
    pump_until(&mut runtime, &mut surface, |rt| rt.app().orders().len() == 1);

    feed.push(DATE, order(2, "12:30:00", &[("Panino", 4)]));
    pump_until(&mut runtime, &mut surface, |rt| rt.app().orders().len() == 2);

    let incremental = feed
        .queries()
        .into_iter()
        .find(|q| q.ora.is_some())
        .expect("an incremental query");
    assert_eq!(incremental.ora.as_deref(), Some("12:00:00"));
}

#[test]
fn toggling_auto_refresh_replaces_the_ticker() {
    let feed = Arc::new(FakeFeed::default());
    let mut runtime = runtime(&feed, Journal::disabled());
    let mut surface = Recorder::default();
    let tx = runtime.sender();

    runtime.step(&mut surface, Duration::from_millis(1));
    let first = runtime.ticker_generation().expect("ticker running");

    tx.send(Event::External("toggle".to_string())).unwrap();
    pump_until(&mut runtime, &mut surface, |rt| rt.ticker_generation().is_none());
    assert_eq!(runtime.app().refresh_schedule(), None);

    tx.send(Event::External("toggle".to_string())).unwrap();
    pump_until(&mut runtime, &mut surface, |rt| rt.ticker_generation().is_some());
    assert!(runtime.ticker_generation().unwrap() > first);
}

#[test]
fn quit_input_stops_the_loop() {
    let feed = Arc::new(FakeFeed::default());
    let mut runtime = runtime(&feed, Journal::disabled());
    let mut surface = Recorder::default();
    runtime.app_mut().toggle_auto_refresh();

    runtime
        .sender()
        .send(Event::External("quit".to_string()))
        .unwrap();
    runtime.run(&mut surface);
    assert_eq!(runtime.ticker_generation(), None);
}

#[test]
fn fetches_are_journaled() {
    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::at(dir.path().join("fetch-log.jsonl"));
    let feed = Arc::new(FakeFeed::with_articles(&[(1, "Panino")]));
    feed.push(DATE, order(1, "12:00:00", &[("Panino", 1)]));
    let mut runtime = runtime(&feed, journal.clone());
    runtime.app_mut().toggle_auto_refresh();

    runtime.load_blocking();
    feed.fail(true);
    let mut surface = Recorder::default();
    runtime
        .sender()
        .send(Event::External("refresh".to_string()))
        .unwrap();
    pump_until(&mut runtime, &mut surface, |rt| rt.app().error().is_some());

    let entries = journal.tail(10);
    let kinds: Vec<FetchKind> = entries.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![FetchKind::Articles, FetchKind::Full, FetchKind::Incremental]
    );
    assert_eq!(entries[1].received, 1);
    assert_eq!(entries[1].date.as_deref(), Some(DATE));
    assert!(!entries[2].success);
    assert_eq!(entries[2].since.as_deref(), Some("12:00:00"));
}
