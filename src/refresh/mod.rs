//! Auto-refresh countdown, incremental merge, and the periodic ticker.
//!
//! The refresh loop is a one-second countdown. While active, every tick
//! decrements the remaining time; reaching zero asks for an incremental
//! ("only new") fetch and re-arms the countdown with the configured interval.
//! The loop itself never fetches: it only tells its owner when to.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::aggregator;
use crate::model::Order;

/// Shortest allowed auto-refresh interval (seconds).
pub const MIN_INTERVAL_SECS: u32 = 10;

/// Longest allowed auto-refresh interval (seconds).
pub const MAX_INTERVAL_SECS: u32 = 600;

/// Interval used when nothing has been configured.
pub const DEFAULT_INTERVAL_SECS: u32 = 60;

/// Clamp any requested interval into `[MIN_INTERVAL_SECS, MAX_INTERVAL_SECS]`.
pub fn clamp_interval(seconds: i64) -> u32 {
    let clamped = seconds.clamp(i64::from(MIN_INTERVAL_SECS), i64::from(MAX_INTERVAL_SECS));
    // In range by construction.
    u32::try_from(clamped).unwrap_or(DEFAULT_INTERVAL_SECS)
}

// ---------------------------------------------------------------------------
// Countdown state machine
// ---------------------------------------------------------------------------

/// What the dashboard shows about the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshIndicator {
    pub time_remaining: u32,
    pub total_time: u32,
    pub is_active: bool,
}

/// `Idle` / `Active` countdown driven by one-second ticks.
#[derive(Debug, Clone)]
pub struct RefreshLoop {
    indicator: RefreshIndicator,
}

impl RefreshLoop {
    /// An idle loop primed with `interval`.
    pub fn new(interval: u32) -> Self {
        Self {
            indicator: RefreshIndicator {
                time_remaining: interval,
                total_time: interval,
                is_active: false,
            },
        }
    }

    pub fn indicator(&self) -> RefreshIndicator {
        self.indicator
    }

    pub fn is_active(&self) -> bool {
        self.indicator.is_active
    }

    /// Re-evaluate the loop after a governing condition changed.
    ///
    /// Becoming (or staying) active restarts the countdown from `interval`;
    /// going idle keeps the last values on display.
    pub fn sync(&mut self, active: bool, interval: u32) {
        if active {
            self.indicator = RefreshIndicator {
                time_remaining: interval,
                total_time: interval,
                is_active: true,
            };
        } else {
            self.indicator.is_active = false;
        }
    }

    /// Advance one second. Returns `true` when an incremental fetch is due.
    pub fn tick(&mut self) -> bool {
        if !self.indicator.is_active {
            return false;
        }
        let remaining = self.indicator.time_remaining.saturating_sub(1);
        if remaining == 0 {
            self.indicator.time_remaining = self.indicator.total_time;
            true
        } else {
            self.indicator.time_remaining = remaining;
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Incremental merge
// ---------------------------------------------------------------------------

/// Time of the most recent known order, used as the lower bound of an
/// incremental fetch. `None` when there are no orders or the most recent one
/// has no time.
pub fn latest_order_time(orders: &[Order]) -> Option<String> {
    let newest = *aggregator::newest_first(orders).first()?;
    orders[newest].time().map(str::to_string)
}

/// Append fetched orders whose `id_ordine` is not already known.
///
/// Idempotent: merging the same batch again adds nothing. Returns the number
/// of orders added.
pub fn merge_orders(existing: &mut Vec<Order>, fetched: Vec<Order>) -> usize {
    let mut known: HashSet<i64> = existing.iter().map(|o| o.id_ordine).collect();
    let before = existing.len();
    existing.extend(fetched.into_iter().filter(|o| known.insert(o.id_ordine)));
    existing.len() - before
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// A cancellable periodic task delivering ticks into an event queue.
///
/// Each ticker carries a generation number that is passed to `make_event`.
/// Once cancelled (or dropped) it stops sending; ticks already queued by a
/// cancelled ticker can be recognised by their stale generation.
#[derive(Debug)]
pub struct Ticker {
    generation: u64,
    stop: Arc<AtomicBool>,
}

impl Ticker {
    /// Start a ticker thread sending `make_event(generation)` every `period`.
    pub fn start<E, F>(generation: u64, period: Duration, tx: Sender<E>, make_event: F) -> Self
    where
        E: Send + 'static,
        F: Fn(u64) -> E + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        thread::spawn(move || {
            loop {
                thread::sleep(period);
                if flag.load(Ordering::Acquire) {
                    break;
                }
                if tx.send(make_event(generation)).is_err() {
                    break;
                }
            }
        });
        Self { generation, stop }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
