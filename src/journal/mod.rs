//! Fetch journal: one JSONL line per backend call.
//!
//! Every article load and order fetch is appended to
//! `~/.sagra/fetch-log.jsonl` (configurable). Writing is best-effort: a
//! journal failure never affects the dashboard.

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::SagraConfig;

/// What a journal entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchKind {
    Articles,
    Full,
    Incremental,
}

impl std::fmt::Display for FetchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Articles => write!(f, "articles"),
            Self::Full => write!(f, "full"),
            Self::Incremental => write!(f, "incremental"),
        }
    }
}

/// A single entry in the fetch journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchLogEntry {
    pub timestamp: String,
    pub kind: FetchKind,
    /// Selected date for order fetches.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub date: Option<String>,
    /// Lower time bound of an incremental fetch.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub since: Option<String>,
    /// Number of descriptions requested.
    #[serde(default)]
    pub requested: usize,
    /// Records returned by the backend.
    #[serde(default)]
    pub received: usize,
    /// Orders that were new after merging.
    #[serde(default)]
    pub added: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    pub latency_ms: u64,
}

impl FetchLogEntry {
    /// An entry stamped with the current time; fill in the rest with struct
    /// update syntax.
    pub fn now(kind: FetchKind, success: bool, latency_ms: u64) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kind,
            date: None,
            since: None,
            requested: 0,
            received: 0,
            added: 0,
            success,
            error: None,
            latency_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Journal handle
// ---------------------------------------------------------------------------

/// Where (and whether) entries are written.
#[derive(Debug, Clone)]
pub struct Journal {
    path: Option<PathBuf>,
}

impl Journal {
    pub fn from_config(config: &SagraConfig) -> Self {
        let path = if config.logging.enabled {
            config.journal_path()
        } else {
            None
        };
        Self { path }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an entry, ignoring I/O failures.
    pub fn record(&self, entry: &FetchLogEntry) {
        if let Some(path) = &self.path {
            let _ = append_entry(path, entry);
        }
    }

    /// The last `n` entries, oldest first. Malformed lines are skipped.
    pub fn tail(&self, n: usize) -> Vec<FetchLogEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        let entries: Vec<FetchLogEntry> = BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();
        let skip = entries.len().saturating_sub(n);
        entries.into_iter().skip(skip).collect()
    }
}

fn append_entry(path: &Path, entry: &FetchLogEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
