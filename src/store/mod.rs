//! Persisted UI state.
//!
//! The dashboard keeps four values across sessions, each under a fixed key
//! of a flat string key-value store:
//!
//! | Key               | Value                                   |
//! |-------------------|-----------------------------------------|
//! | `counters`        | JSON array of [`Counter`]               |
//! | `cookedCounts`    | JSON object keyed by counter id         |
//! | `selectedDate`    | ISO date (`YYYY-MM-DD`)                 |
//! | `refreshInterval` | integer seconds as a string, 10–600     |
//!
//! [`UiStore`] is the only writer: every setter mirrors the new value into
//! the backing [`KvStore`] immediately. Missing or undecodable values fall
//! back to their defaults on load.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::model::{Article, CookedCounts, Counter};
use crate::refresh::{DEFAULT_INTERVAL_SECS, clamp_interval};

pub const KEY_COUNTERS: &str = "counters";
pub const KEY_COOKED_COUNTS: &str = "cookedCounts";
pub const KEY_SELECTED_DATE: &str = "selectedDate";
pub const KEY_REFRESH_INTERVAL: &str = "refreshInterval";

// ---------------------------------------------------------------------------
// Key-value backends
// ---------------------------------------------------------------------------

/// A flat string key-value store.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
}

/// JSON-file backed store (`~/.sagra/ui-state.json` by default).
///
/// The whole object is rewritten on every `set`. A missing or malformed file
/// reads as empty.
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileKvStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("failed to create state directory")?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// In-memory store, used by tests and one-shot previews.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: BTreeMap<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing any encoding.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UI state
// ---------------------------------------------------------------------------

/// The persisted part of the application state.
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub counters: Vec<Counter>,
    pub cooked_counts: CookedCounts,
    pub selected_date: String,
    pub refresh_interval: u32,
}

impl UiState {
    /// Defaults for a first run on `today`.
    pub fn defaults(today: &str) -> Self {
        Self {
            counters: Vec::new(),
            cooked_counts: CookedCounts::new(),
            selected_date: today.to_string(),
            refresh_interval: DEFAULT_INTERVAL_SECS,
        }
    }

    /// Read every key from `kv`, falling back per key.
    pub fn load(kv: &dyn KvStore, today: &str) -> Self {
        let defaults = Self::defaults(today);
        Self {
            counters: decode_json(kv, KEY_COUNTERS).unwrap_or(defaults.counters),
            cooked_counts: decode_json(kv, KEY_COOKED_COUNTS).unwrap_or(defaults.cooked_counts),
            selected_date: kv
                .get(KEY_SELECTED_DATE)
                .filter(|d| !d.is_empty())
                .unwrap_or(defaults.selected_date),
            refresh_interval: kv
                .get(KEY_REFRESH_INTERVAL)
                .and_then(|raw| raw.trim().parse::<i64>().ok())
                .map(clamp_interval)
                .unwrap_or(defaults.refresh_interval),
        }
    }

    /// Cooked units for a counter, 0 when never set.
    pub fn cooked(&self, counter_id: &str) -> u64 {
        self.cooked_counts.get(counter_id).copied().unwrap_or(0)
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(kv: &dyn KvStore, key: &str) -> Option<T> {
    let raw = kv.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            eprintln!(
                "{} stored '{key}' is unreadable, using defaults: {e}",
                "warning:".yellow()
            );
            None
        }
    }
}

/// Today's local date as `YYYY-MM-DD`.
pub fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Owner of [`UiState`]; every mutation is written through to the backend.
pub struct UiStore<S: KvStore> {
    state: UiState,
    kv: S,
}

impl<S: KvStore> UiStore<S> {
    /// Load from `kv`, using `today` for a missing date.
    ///
    /// A date picked this way is written back, so later sessions keep it.
    pub fn load(mut kv: S, today: &str) -> Self {
        let state = UiState::load(&kv, today);
        if kv.get(KEY_SELECTED_DATE).is_none_or(|d| d.is_empty()) {
            persist(&mut kv, KEY_SELECTED_DATE, state.selected_date.clone());
        }
        Self { state, kv }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn backend(&self) -> &S {
        &self.kv
    }

    pub fn set_counters(&mut self, counters: Vec<Counter>) {
        self.state.counters = counters;
        persist_json(&mut self.kv, KEY_COUNTERS, &self.state.counters);
    }

    /// Rewrite stored descriptions from a freshly loaded article list.
    pub fn refresh_descriptions(&mut self, articles: &[Article]) -> bool {
        let mut counters = self.state.counters.clone();
        let changed = counters
            .iter_mut()
            .fold(false, |acc, c| c.refresh_descriptions(articles) || acc);
        if changed {
            self.set_counters(counters);
        }
        changed
    }

    pub fn set_cooked(&mut self, counter_id: &str, count: u64) {
        self.state
            .cooked_counts
            .insert(counter_id.to_string(), count);
        persist_json(&mut self.kv, KEY_COOKED_COUNTS, &self.state.cooked_counts);
    }

    pub fn set_date(&mut self, date: &str) {
        self.state.selected_date = date.to_string();
        persist(&mut self.kv, KEY_SELECTED_DATE, date.to_string());
    }

    /// Store a refresh interval, clamped to 10–600 seconds.
    pub fn set_refresh_interval(&mut self, seconds: i64) -> u32 {
        let clamped = clamp_interval(seconds);
        self.state.refresh_interval = clamped;
        persist(&mut self.kv, KEY_REFRESH_INTERVAL, clamped.to_string());
        clamped
    }
}

fn persist_json<T: serde::Serialize>(kv: &mut impl KvStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => persist(kv, key, json),
        Err(e) => eprintln!("{} could not encode '{key}': {e}", "warning:".yellow()),
    }
}

fn persist(kv: &mut impl KvStore, key: &str, value: String) {
    if let Err(e) = kv.set(key, value) {
        eprintln!("{} could not save '{key}': {e:#}", "warning:".yellow());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
