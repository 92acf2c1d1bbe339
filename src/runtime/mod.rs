//! Single-threaded event loop around [`App`].
//!
//! One `mpsc` queue carries everything that can change the dashboard:
//! countdown ticks, finished fetches, the startup article load, and
//! surface-specific input (stdin lines for `sagra watch`, HTTP requests for
//! `sagra web`). Only the loop thread touches the [`App`]; fetches run on
//! short-lived worker threads that post their result back to the queue.
//!
//! After every event the loop reconciles the ticker with
//! [`App::refresh_schedule`], cancelling and recreating it when the schedule
//! changed, and re-renders when the app revision moved.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::app::{App, FetchJob, FetchOutcome, FetchPlan};
use crate::client::OrderFeed;
use crate::editor::SavedConfiguration;
use crate::error::FetchError;
use crate::journal::{FetchKind, FetchLogEntry, Journal};
use crate::model::{Article, Order};
use crate::refresh::Ticker;
use crate::store::KvStore;

/// Period of the countdown ticker.
pub const TICK: Duration = Duration::from_secs(1);

/// A feed shareable with worker threads.
pub type SharedFeed = Arc<dyn OrderFeed + Send + Sync>;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Everything the loop reacts to. `X` is the surface's own input type.
pub enum Event<X> {
    Tick(u64),
    ArticlesLoaded {
        result: Result<Vec<Article>, FetchError>,
        latency_ms: u64,
    },
    Fetched {
        job: FetchJob,
        result: Result<Vec<Order>, FetchError>,
        latency_ms: u64,
    },
    External(X),
}

/// Whether the loop keeps going after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// A user-facing front end driven by the loop.
pub trait Surface<S: KvStore, X> {
    /// Handle surface input (a typed command, an HTTP request, ...).
    fn handle(&mut self, runtime: &mut Runtime<S, X>, input: X) -> Flow;

    /// Called after any event that changed the app.
    fn render(&mut self, app: &App<S>);
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

pub struct Runtime<S: KvStore, X> {
    app: App<S>,
    feed: SharedFeed,
    journal: Journal,
    tx: Sender<Event<X>>,
    rx: Receiver<Event<X>>,
    ticker: Option<Ticker>,
    next_generation: u64,
    schedule: Option<u32>,
    tick_period: Duration,
    rendered: Option<u64>,
}

impl<S: KvStore, X: Send + 'static> Runtime<S, X> {
    pub fn new(app: App<S>, feed: SharedFeed, journal: Journal) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            app,
            feed,
            journal,
            tx,
            rx,
            ticker: None,
            next_generation: 0,
            schedule: None,
            tick_period: TICK,
            rendered: None,
        }
    }

    /// Use a different tick period (tests run the countdown faster).
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// A handle for threads that feed surface input into the loop.
    pub fn sender(&self) -> Sender<Event<X>> {
        self.tx.clone()
    }

    pub fn app(&self) -> &App<S> {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App<S> {
        &mut self.app
    }

    /// Generation of the live ticker, if any.
    pub fn ticker_generation(&self) -> Option<u64> {
        self.ticker.as_ref().map(Ticker::generation)
    }

    // -- Actions that involve I/O --

    /// Load the article list in the background.
    pub fn load_articles(&self) {
        let feed = Arc::clone(&self.feed);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let started = Instant::now();
            let result = feed.articles();
            let _ = tx.send(Event::ArticlesLoaded {
                result,
                latency_ms: elapsed_ms(started),
            });
        });
    }

    /// Replace the order set with a full fetch.
    pub fn reload(&mut self) {
        self.request(false);
    }

    /// Manual refresh: incremental fetch, countdown untouched.
    pub fn refresh_now(&mut self) -> bool {
        match self.app.manual_refresh() {
            FetchPlan::Start(job) => {
                self.spawn_fetch(job);
                true
            }
            FetchPlan::Cleared | FetchPlan::Busy => false,
        }
    }

    /// Commit a configuration and reload orders for it.
    pub fn save_configuration(&mut self, saved: SavedConfiguration) {
        self.app.save_configuration(saved);
        self.reload();
    }

    fn request(&mut self, only_new: bool) {
        if let FetchPlan::Start(job) = self.app.plan_fetch(only_new) {
            self.spawn_fetch(job);
        }
    }

    fn spawn_fetch(&self, job: FetchJob) {
        let feed = Arc::clone(&self.feed);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let started = Instant::now();
            let result = feed.orders(&job.query);
            let _ = tx.send(Event::Fetched {
                job,
                result,
                latency_ms: elapsed_ms(started),
            });
        });
    }

    // -- Loop --

    /// Run until the surface asks to quit.
    pub fn run(&mut self, surface: &mut impl Surface<S, X>) {
        self.settle(surface);
        while let Ok(event) = self.rx.recv() {
            if self.dispatch(surface, event) == Flow::Quit {
                break;
            }
        }
        self.stop_ticker();
    }

    /// Handle at most one event, waiting up to `timeout` for it.
    ///
    /// Returns `None` when nothing arrived in time.
    pub fn step(&mut self, surface: &mut impl Surface<S, X>, timeout: Duration) -> Option<Flow> {
        self.settle(surface);
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(self.dispatch(surface, event)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    fn dispatch(&mut self, surface: &mut impl Surface<S, X>, event: Event<X>) -> Flow {
        let flow = match event {
            Event::Tick(generation) => {
                // Ticks queued by a cancelled ticker are dropped.
                if self.ticker_generation() == Some(generation)
                    && let Some(job) = self.app.tick()
                {
                    self.spawn_fetch(job);
                }
                Flow::Continue
            }
            Event::ArticlesLoaded { result, latency_ms } => {
                if self.articles_done(result, latency_ms) {
                    self.reload();
                }
                Flow::Continue
            }
            Event::Fetched {
                job,
                result,
                latency_ms,
            } => {
                self.finish(job, result, latency_ms);
                Flow::Continue
            }
            Event::External(input) => surface.handle(self, input),
        };
        self.settle(surface);
        flow
    }

    /// Load articles and a full order set on the calling thread.
    ///
    /// Used by one-shot commands that print a single snapshot.
    pub fn load_blocking(&mut self) {
        self.load_articles_blocking();
        if let FetchPlan::Start(job) = self.app.plan_fetch(false) {
            let started = Instant::now();
            let result = self.feed.orders(&job.query);
            self.finish(job, result, elapsed_ms(started));
        }
    }

    /// Load the article list on the calling thread.
    pub fn load_articles_blocking(&mut self) {
        let started = Instant::now();
        let result = self.feed.articles();
        self.articles_done(result, elapsed_ms(started));
    }

    fn articles_done(&mut self, result: Result<Vec<Article>, FetchError>, latency_ms: u64) -> bool {
        self.journal.record(&FetchLogEntry {
            received: result.as_ref().map_or(0, Vec::len),
            error: result.as_ref().err().map(ToString::to_string),
            ..FetchLogEntry::now(FetchKind::Articles, result.is_ok(), latency_ms)
        });
        self.app.articles_loaded(result)
    }

    fn finish(&mut self, job: FetchJob, result: Result<Vec<Order>, FetchError>, latency_ms: u64) {
        let error = result.as_ref().err().map(ToString::to_string);
        let outcome = self.app.finish_fetch(&job, result);

        let (received, added) = match outcome {
            FetchOutcome::Replaced { received } => (received, received),
            FetchOutcome::Merged { received, added } => (received, added),
            FetchOutcome::Failed | FetchOutcome::Stale => (0, 0),
        };
        let kind = if job.only_new {
            FetchKind::Incremental
        } else {
            FetchKind::Full
        };
        self.journal.record(&FetchLogEntry {
            date: Some(job.query.data.clone()),
            since: job.query.ora.clone(),
            requested: job.query.descrizioni.len(),
            received,
            added,
            error,
            ..FetchLogEntry::now(kind, outcome != FetchOutcome::Failed, latency_ms)
        });
    }

    /// Reconcile the ticker and render if anything changed.
    fn settle(&mut self, surface: &mut impl Surface<S, X>) {
        let schedule = self.app.refresh_schedule();
        if schedule != self.schedule || (schedule.is_some() && self.ticker.is_none()) {
            self.stop_ticker();
            if schedule.is_some() {
                let generation = self.next_generation;
                self.next_generation += 1;
                self.ticker = Some(Ticker::start(
                    generation,
                    self.tick_period,
                    self.tx.clone(),
                    Event::Tick,
                ));
            }
            self.schedule = schedule;
        }

        let revision = self.app.revision();
        if self.rendered != Some(revision) {
            surface.render(&self.app);
            self.rendered = Some(revision);
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
