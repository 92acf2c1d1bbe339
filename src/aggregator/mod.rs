//! Order aggregation and fulfilment colouring.
//!
//! For every counter the aggregator sums each order's weighted quantities of
//! the counter's tracked items, compares the total against the operator's
//! cooked count, and classifies each order cell of the orders table.
//!
//! # FIFO fulfilment
//!
//! Cell colours assume cooked units go to the chronologically earliest
//! orders first. A counter's cooked total is walked across its orders in
//! time order: cells fully covered are green, the one straddling the cooked
//! total is yellow, later ones red. This is an approximation of what the
//! kitchen actually handed out, not a record of it.

use std::cmp::Ordering;

use serde::Serialize;

use crate::model::{CookedCounts, Counter, Order};

// ---------------------------------------------------------------------------
// Contributions and totals
// ---------------------------------------------------------------------------

/// Weighted units an order asks of a counter.
///
/// Each tracked item contributes independently, so an article listed twice in
/// the same counter counts twice.
pub fn contribution(order: &Order, counter: &Counter) -> u64 {
    counter
        .tracked_items
        .iter()
        .map(|item| order.quantity(&item.descrizione).saturating_mul(item.weight()))
        .fold(0, u64::saturating_add)
}

/// Ordered, cooked and remaining units for one counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterTotals {
    pub ordered: u64,
    pub cooked: u64,
    pub remaining: u64,
}

impl CounterTotals {
    pub fn new(ordered: u64, cooked: u64) -> Self {
        Self {
            ordered,
            cooked,
            remaining: ordered.saturating_sub(cooked),
        }
    }
}

/// Totals for a single counter across all orders.
pub fn counter_totals(counter: &Counter, orders: &[Order], cooked: &CookedCounts) -> CounterTotals {
    let ordered = orders
        .iter()
        .map(|o| contribution(o, counter))
        .fold(0, u64::saturating_add);
    let cooked = cooked.get(&counter.id).copied().unwrap_or(0);
    CounterTotals::new(ordered, cooked)
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Indices of `orders` from oldest to newest.
///
/// When every order carries a time the sort is by time (ties by id);
/// otherwise ids alone decide, on the assumption that higher ids are newer.
pub fn chronological(orders: &[Order]) -> Vec<usize> {
    let by_time = orders.iter().all(|o| o.time().is_some());
    let mut indices: Vec<usize> = (0..orders.len()).collect();
    indices.sort_by(|&a, &b| compare_orders(&orders[a], &orders[b], by_time));
    indices
}

/// Indices of `orders` from newest to oldest, for display.
pub fn newest_first(orders: &[Order]) -> Vec<usize> {
    let mut indices = chronological(orders);
    indices.reverse();
    indices
}

fn compare_orders(a: &Order, b: &Order, by_time: bool) -> Ordering {
    if by_time {
        a.time()
            .cmp(&b.time())
            .then_with(|| a.id_ordine.cmp(&b.id_ordine))
    } else {
        a.id_ordine.cmp(&b.id_ordine)
    }
}

// ---------------------------------------------------------------------------
// Cell colouring
// ---------------------------------------------------------------------------

/// Fulfilment state of one (order, counter) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellColor {
    /// The order asks nothing of this counter.
    None,
    /// Fully covered by the cooked total.
    Green,
    /// Partially covered.
    Yellow,
    /// Not covered yet.
    Red,
}

/// Classify a cell from its contribution and the cumulative ordered total up
/// to and including this order.
pub fn classify(contribution: u64, cumulative_up_to_this: u64, cooked: u64) -> CellColor {
    if contribution == 0 {
        return CellColor::None;
    }
    let cumulative_before_this = cumulative_up_to_this.saturating_sub(contribution);
    if cooked >= cumulative_up_to_this {
        CellColor::Green
    } else if cooked > cumulative_before_this {
        CellColor::Yellow
    } else {
        CellColor::Red
    }
}

// ---------------------------------------------------------------------------
// Full aggregation
// ---------------------------------------------------------------------------

/// One cell of the orders table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub contribution: u64,
    pub color: CellColor,
}

/// One row of the orders table; `cells` follow the counter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRow {
    pub id_ordine: i64,
    pub cliente: String,
    pub ora: Option<String>,
    pub cells: Vec<Cell>,
}

/// Aggregator output for the current counters and orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    /// Totals in counter order.
    pub totals: Vec<CounterTotals>,
    /// Rows newest first.
    pub rows: Vec<OrderRow>,
}

/// Aggregate `orders` for every counter.
///
/// Cumulative totals are prefix sums over the chronological order, computed
/// once per counter.
pub fn aggregate(counters: &[Counter], orders: &[Order], cooked: &CookedCounts) -> Aggregation {
    let timeline = chronological(orders);

    // contributions[c][i] and cumulative[c][i] are indexed by order position.
    let mut contributions = vec![vec![0u64; orders.len()]; counters.len()];
    let mut cumulative = vec![vec![0u64; orders.len()]; counters.len()];
    let mut totals = Vec::with_capacity(counters.len());

    for (c, counter) in counters.iter().enumerate() {
        let mut running = 0u64;
        for &i in &timeline {
            let units = contribution(&orders[i], counter);
            running = running.saturating_add(units);
            contributions[c][i] = units;
            cumulative[c][i] = running;
        }
        let cooked = cooked.get(&counter.id).copied().unwrap_or(0);
        totals.push(CounterTotals::new(running, cooked));
    }

    let rows = timeline
        .iter()
        .rev()
        .map(|&i| {
            let order = &orders[i];
            let cells = (0..counters.len())
                .map(|c| Cell {
                    contribution: contributions[c][i],
                    color: classify(contributions[c][i], cumulative[c][i], totals[c].cooked),
                })
                .collect();
            OrderRow {
                id_ordine: order.id_ordine,
                cliente: order.cliente.clone(),
                ora: order.ora.clone(),
                cells,
            }
        })
        .collect();

    Aggregation { totals, rows }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
