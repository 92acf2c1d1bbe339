//! Application state container.
//!
//! [`App`] owns every piece of mutable state: the persisted UI state, the
//! article list, the current order set, the error banner, the active view,
//! the auto-refresh flag and countdown, and the loading flag. All changes go
//! through its action methods; each one bumps [`App::revision`] so a runtime
//! can re-render only when something changed.
//!
//! Network calls are not made here. [`App::plan_fetch`] describes the fetch
//! to perform as a [`FetchJob`]; whoever runs it hands the outcome back to
//! [`App::finish_fetch`]. Each job carries the configuration epoch it was
//! planned under, and results from an older epoch are discarded, so a slow
//! response can never overwrite orders loaded for a newer counter set or
//! date.

use serde::{Deserialize, Serialize};

use crate::aggregator;
use crate::client::{OrderFeed, OrdersQuery};
use crate::dashboard::{self, DashboardView};
use crate::editor::{ConfigDraft, SavedConfiguration};
use crate::error::{FetchError, LoadError};
use crate::model::{Article, Order, tracked_descriptions};
use crate::refresh::{RefreshIndicator, RefreshLoop, latest_order_time, merge_orders};
use crate::store::{KvStore, UiState, UiStore};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which screen is in front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Dashboard,
    Config,
}

/// A fetch the runtime should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub query: OrdersQuery,
    /// Merge into the current orders instead of replacing them.
    pub only_new: bool,
    epoch: u64,
}

impl FetchJob {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Result of asking for a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    /// Nothing is tracked; the order list was cleared without a request.
    Cleared,
    /// An incremental fetch is already in flight.
    Busy,
    Start(FetchJob),
}

/// How a finished fetch was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Replaced { received: usize },
    Merged { received: usize, added: usize },
    Failed,
    /// The configuration changed while the request was in flight.
    Stale,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App<S: KvStore> {
    store: UiStore<S>,
    articles: Vec<Article>,
    orders: Vec<Order>,
    error: Option<String>,
    view: View,
    auto_refresh: bool,
    loading: bool,
    in_flight: usize,
    refresh: RefreshLoop,
    epoch: u64,
    revision: u64,
}

impl<S: KvStore> App<S> {
    pub fn new(store: UiStore<S>) -> Self {
        let interval = store.state().refresh_interval;
        let mut app = Self {
            store,
            articles: Vec::new(),
            orders: Vec::new(),
            error: None,
            view: View::Dashboard,
            auto_refresh: true,
            loading: false,
            in_flight: 0,
            refresh: RefreshLoop::new(interval),
            epoch: 0,
            revision: 0,
        };
        app.sync_refresh();
        app
    }

    // -- Read access --

    pub fn state(&self) -> &UiState {
        self.store.state()
    }

    pub fn store(&self) -> &UiStore<S> {
        &self.store
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn auto_refresh_enabled(&self) -> bool {
        self.auto_refresh
    }

    pub fn refresh_indicator(&self) -> RefreshIndicator {
        self.refresh.indicator()
    }

    /// Increases on every state change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The countdown period while auto-refresh should run, `None` when idle.
    ///
    /// A runtime keeps exactly one ticker alive for the current value and
    /// replaces it whenever this changes.
    pub fn refresh_schedule(&self) -> Option<u32> {
        self.refresh
            .is_active()
            .then_some(self.store.state().refresh_interval)
    }

    /// A configuration draft seeded from the current state.
    pub fn draft(&self) -> ConfigDraft {
        let state = self.store.state();
        ConfigDraft::new(
            state.counters.clone(),
            state.selected_date.clone(),
            state.refresh_interval,
        )
    }

    /// Aggregate and package the current state for display.
    pub fn snapshot(&self) -> DashboardView {
        let state = self.store.state();
        let aggregation = aggregator::aggregate(&state.counters, &self.orders, &state.cooked_counts);
        DashboardView::build(
            &state.counters,
            aggregation,
            &state.selected_date,
            self.refresh.indicator(),
            self.loading,
            self.error.clone(),
        )
    }

    // -- Articles --

    /// Apply the startup article load.
    ///
    /// On success stored descriptions are re-derived from article ids. On
    /// failure the list stays empty and the banner is shown.
    ///
    /// Returns `true` when a stored description changed, in which case the
    /// orders should be reloaded.
    pub fn articles_loaded(&mut self, result: Result<Vec<Article>, FetchError>) -> bool {
        let changed = match result {
            Ok(articles) => {
                let changed = self.store.refresh_descriptions(&articles);
                if changed {
                    self.configuration_changed();
                }
                self.articles = articles;
                changed
            }
            Err(e) => {
                self.error = Some(LoadError::Articles(e).to_string());
                false
            }
        };
        self.touch();
        changed
    }

    // -- Orders --

    /// Plan a full (`only_new = false`) or incremental fetch.
    ///
    /// With nothing tracked the order list is cleared and no request is
    /// made. Incremental fetches are refused while another fetch is in
    /// flight; full reloads always proceed.
    pub fn plan_fetch(&mut self, only_new: bool) -> FetchPlan {
        let state = self.store.state();
        let descrizioni = tracked_descriptions(&state.counters);
        if descrizioni.is_empty() {
            self.orders.clear();
            self.touch();
            return FetchPlan::Cleared;
        }
        if only_new && self.loading {
            return FetchPlan::Busy;
        }

        let ora = if only_new {
            latest_order_time(&self.orders)
        } else {
            None
        };
        let job = FetchJob {
            query: OrdersQuery {
                descrizioni,
                data: state.selected_date.clone(),
                ora,
            },
            only_new,
            epoch: self.epoch,
        };

        self.in_flight += 1;
        self.loading = true;
        self.touch();
        FetchPlan::Start(job)
    }

    /// Apply the outcome of a fetch planned by [`plan_fetch`](Self::plan_fetch).
    pub fn finish_fetch(
        &mut self,
        job: &FetchJob,
        result: Result<Vec<Order>, FetchError>,
    ) -> FetchOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.loading = self.in_flight > 0;
        self.touch();

        if job.epoch != self.epoch {
            return FetchOutcome::Stale;
        }

        match result {
            Ok(fetched) => {
                self.error = None;
                let received = fetched.len();
                if job.only_new {
                    let added = merge_orders(&mut self.orders, fetched);
                    FetchOutcome::Merged { received, added }
                } else {
                    self.orders = fetched;
                    FetchOutcome::Replaced { received }
                }
            }
            Err(e) => {
                self.error = Some(LoadError::Orders(e).to_string());
                FetchOutcome::Failed
            }
        }
    }

    /// Plan and run a fetch synchronously on the calling thread.
    pub fn load_orders(&mut self, feed: &dyn OrderFeed, only_new: bool) -> Option<FetchOutcome> {
        match self.plan_fetch(only_new) {
            FetchPlan::Start(job) => {
                let result = feed.orders(&job.query);
                Some(self.finish_fetch(&job, result))
            }
            FetchPlan::Cleared | FetchPlan::Busy => None,
        }
    }

    /// The refresh button: an incremental fetch that leaves the countdown
    /// alone.
    pub fn manual_refresh(&mut self) -> FetchPlan {
        self.plan_fetch(true)
    }

    /// One second elapsed. Returns the incremental fetch to run when the
    /// countdown reached zero.
    pub fn tick(&mut self) -> Option<FetchJob> {
        if !self.refresh.is_active() {
            return None;
        }
        let due = self.refresh.tick();
        self.touch();
        if !due {
            return None;
        }
        match self.plan_fetch(true) {
            FetchPlan::Start(job) => Some(job),
            FetchPlan::Cleared | FetchPlan::Busy => None,
        }
    }

    // -- Refresh control --

    pub fn toggle_auto_refresh(&mut self) {
        self.auto_refresh = !self.auto_refresh;
        self.sync_refresh();
        self.touch();
    }

    pub fn set_view(&mut self, view: View) {
        if self.view != view {
            self.view = view;
            self.sync_refresh();
            self.touch();
        }
    }

    // -- Configuration --

    /// Commit a saved configuration and return to the dashboard.
    ///
    /// Counters are always replaced, with descriptions re-derived from the
    /// loaded articles; the date only when non-empty. The interval is
    /// clamped. The caller should follow up with a full fetch.
    pub fn save_configuration(&mut self, saved: SavedConfiguration) {
        let mut counters = saved.counters;
        for counter in &mut counters {
            counter.refresh_descriptions(&self.articles);
        }
        self.store.set_counters(counters);
        if !saved.date.is_empty() && saved.date != self.store.state().selected_date {
            self.store.set_date(&saved.date);
        }
        self.store.set_refresh_interval(saved.interval);
        self.configuration_changed();
        self.view = View::Dashboard;
        self.sync_refresh();
        self.touch();
    }

    // -- Cooked counts --

    pub fn set_cooked(&mut self, counter_id: &str, count: u64) {
        self.store.set_cooked(counter_id, count);
        self.touch();
    }

    pub fn step_cooked(&mut self, counter_id: &str, delta: i64) -> u64 {
        let next = dashboard::step_cooked(self.state().cooked(counter_id), delta);
        self.set_cooked(counter_id, next);
        next
    }

    pub fn override_cooked(&mut self, counter_id: &str, text: &str) -> u64 {
        let next = dashboard::parse_cooked_override(text);
        self.set_cooked(counter_id, next);
        next
    }

    /// Apply a signed adjustment; `None` (and no change) for non-numeric
    /// input.
    pub fn adjust_cooked(&mut self, counter_id: &str, text: &str) -> Option<u64> {
        let next = dashboard::apply_adjustment(self.state().cooked(counter_id), text)?;
        self.set_cooked(counter_id, next);
        Some(next)
    }

    // -- Internal --

    /// Counters or date changed: outstanding fetches are now stale.
    fn configuration_changed(&mut self) {
        self.epoch += 1;
    }

    fn sync_refresh(&mut self) {
        let active = self.auto_refresh
            && self.view == View::Dashboard
            && !self.store.state().counters.is_empty();
        self.refresh
            .sync(active, self.store.state().refresh_interval);
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Counter, TrackedItem};
    use crate::store::MemoryKvStore;

    fn app_with_counter() -> App<MemoryKvStore> {
        let mut app = App::new(UiStore::load(MemoryKvStore::new(), "2025-08-15"));
        app.save_configuration(SavedConfiguration {
            counters: vec![Counter {
                id: "c1".to_string(),
                name: "Griglia".to_string(),
                tracked_items: vec![TrackedItem {
                    article_id: "1".to_string(),
                    descrizione: "Panino".to_string(),
                    moltiplicatore: 1,
                }],
            }],
            date: String::new(),
            interval: 10,
        });
        app
    }

    fn order(id: i64, ora: &str) -> Order {
        Order {
            id_ordine: id,
            cliente: String::new(),
            ora: Some(ora.to_string()),
            quantita: [("Panino".to_string(), 1)].into(),
        }
    }

    #[test]
    fn fresh_app_is_idle_without_counters() {
        let app = App::new(UiStore::load(MemoryKvStore::new(), "2025-08-15"));
        assert_eq!(app.refresh_schedule(), None);
        assert_eq!(app.view(), View::Dashboard);
    }

    #[test]
    fn saving_counters_activates_countdown() {
        let app = app_with_counter();
        assert_eq!(app.refresh_schedule(), Some(10));
        assert_eq!(app.state().selected_date, "2025-08-15");
    }

    #[test]
    fn config_view_and_toggle_idle_the_loop() {
        let mut app = app_with_counter();
        app.set_view(View::Config);
        assert_eq!(app.refresh_schedule(), None);
        app.set_view(View::Dashboard);
        app.toggle_auto_refresh();
        assert_eq!(app.refresh_schedule(), None);
        app.toggle_auto_refresh();
        assert_eq!(app.refresh_schedule(), Some(10));
    }

    #[test]
    fn incremental_plan_uses_latest_time() {
        let mut app = app_with_counter();
        let FetchPlan::Start(job) = app.plan_fetch(false) else {
            panic!("expected a fetch");
        };
        app.finish_fetch(&job, Ok(vec![order(1, "12:00:00"), order(2, "12:10:00")]));

        let FetchPlan::Start(job) = app.manual_refresh() else {
            panic!("expected a fetch");
        };
        assert!(job.only_new);
        assert_eq!(job.query.ora.as_deref(), Some("12:10:00"));
        assert_eq!(job.query.descrizioni, vec!["Panino"]);
    }

    #[test]
    fn overlapping_incremental_is_suppressed() {
        let mut app = app_with_counter();
        let FetchPlan::Start(_job) = app.plan_fetch(true) else {
            panic!("expected a fetch");
        };
        assert!(app.is_loading());
        assert_eq!(app.manual_refresh(), FetchPlan::Busy);
    }

    #[test]
    fn stale_full_reload_is_discarded() {
        let mut app = app_with_counter();
        let FetchPlan::Start(old) = app.plan_fetch(false) else {
            panic!("expected a fetch");
        };
        app.save_configuration(SavedConfiguration {
            counters: app.state().counters.clone(),
            date: "2025-08-16".to_string(),
            interval: 60,
        });
        let outcome = app.finish_fetch(&old, Ok(vec![order(1, "12:00:00")]));
        assert_eq!(outcome, FetchOutcome::Stale);
        assert!(app.orders().is_empty());
        assert!(!app.is_loading());
    }

    #[test]
    fn failed_fetch_keeps_orders_and_sets_banner() {
        let mut app = app_with_counter();
        let FetchPlan::Start(job) = app.plan_fetch(false) else {
            panic!("expected a fetch");
        };
        app.finish_fetch(&job, Ok(vec![order(1, "12:00:00")]));

        let FetchPlan::Start(job) = app.plan_fetch(true) else {
            panic!("expected a fetch");
        };
        let outcome = app.finish_fetch(&job, Err(FetchError::Network("refused".to_string())));
        assert_eq!(outcome, FetchOutcome::Failed);
        assert_eq!(app.orders().len(), 1);
        assert!(app.error().unwrap().contains("ordini"));
        assert!(!app.is_loading());
    }

    #[test]
    fn tick_triggers_fetch_after_interval() {
        let mut app = app_with_counter();
        for _ in 0..9 {
            assert!(app.tick().is_none());
        }
        let job = app.tick().expect("fetch due");
        assert!(job.only_new);
        assert_eq!(app.refresh_indicator().time_remaining, 10);
    }

    #[test]
    fn cooked_controls_go_through_store() {
        let mut app = app_with_counter();
        assert_eq!(app.step_cooked("c1", 1), 1);
        assert_eq!(app.step_cooked("c1", -5), 0);
        assert_eq!(app.override_cooked("c1", "9"), 9);
        assert_eq!(app.adjust_cooked("c1", "-4"), Some(5));
        assert_eq!(app.adjust_cooked("c1", "x"), None);
        assert_eq!(app.state().cooked("c1"), 5);
    }

    #[test]
    fn article_failure_sets_banner() {
        let mut app = app_with_counter();
        let before = app.revision();
        app.articles_loaded(Err(FetchError::Server {
            status: 500,
            message: "db down".to_string(),
        }));
        assert!(app.error().unwrap().contains("articoli"));
        assert!(app.articles().is_empty());
        assert!(app.revision() > before);
    }
}
