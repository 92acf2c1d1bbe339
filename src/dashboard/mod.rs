//! Dashboard view model and terminal rendering.
//!
//! [`DashboardView`] is a plain snapshot of everything the dashboard shows.
//! The browser frontend receives it as JSON; `sagra watch` and `sagra show`
//! render it with [`render_terminal`].

use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::aggregator::{Aggregation, CellColor, CounterTotals, OrderRow};
use crate::model::Counter;
use crate::refresh::RefreshIndicator;

/// Shown instead of the dashboard when nothing is configured.
pub const NO_COUNTERS_MESSAGE: &str =
    "Per favore, imposta almeno un contatore nella configurazione.";

// ---------------------------------------------------------------------------
// Counter cards
// ---------------------------------------------------------------------------

/// Progress bar colour band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// 100 % or more.
    Complete,
    /// 50 % or more.
    Halfway,
    Behind,
}

/// Summary block for one counter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterCard {
    pub id: String,
    pub name: String,
    pub ordered: u64,
    pub cooked: u64,
    pub remaining: u64,
    /// `cooked / ordered × 100`, 0 when nothing is ordered. Not capped.
    pub percentage: f64,
    /// Progress bar fill, capped at 100.
    pub bar_width: f64,
    pub tone: Tone,
}

impl CounterCard {
    pub fn new(counter: &Counter, totals: CounterTotals) -> Self {
        let percentage = progress_percentage(totals.ordered, totals.cooked);
        Self {
            id: counter.id.clone(),
            name: counter.name.clone(),
            ordered: totals.ordered,
            cooked: totals.cooked,
            remaining: totals.remaining,
            percentage,
            bar_width: percentage.min(100.0),
            tone: tone(percentage),
        }
    }

    /// The rounded percentage label, e.g. `63%`.
    pub fn percent_label(&self) -> String {
        format!("{}%", self.percentage.round() as u64)
    }
}

pub fn progress_percentage(ordered: u64, cooked: u64) -> f64 {
    if ordered == 0 {
        0.0
    } else {
        cooked as f64 / ordered as f64 * 100.0
    }
}

fn tone(percentage: f64) -> Tone {
    if percentage >= 100.0 {
        Tone::Complete
    } else if percentage >= 50.0 {
        Tone::Halfway
    } else {
        Tone::Behind
    }
}

// ---------------------------------------------------------------------------
// Cooked-count controls
// ---------------------------------------------------------------------------

/// `-` / `+` buttons. Never goes below 0.
pub fn step_cooked(current: u64, delta: i64) -> u64 {
    offset(current, delta)
}

/// Free-typed cooked count. Non-numeric or negative input counts as 0.
pub fn parse_cooked_override(text: &str) -> u64 {
    text.trim().parse::<i64>().map_or(0, |n| u64::try_from(n).unwrap_or(0))
}

/// Signed adjustment submitted from the `±` box.
///
/// Returns `None` for non-numeric input, in which case nothing changes and
/// the input is kept.
pub fn apply_adjustment(current: u64, text: &str) -> Option<u64> {
    let delta: i64 = text.trim().parse().ok()?;
    Some(offset(current, delta))
}

fn offset(current: u64, delta: i64) -> u64 {
    if delta >= 0 {
        current.saturating_add(delta.unsigned_abs())
    } else {
        current.saturating_sub(delta.unsigned_abs())
    }
}

// ---------------------------------------------------------------------------
// Refresh badge
// ---------------------------------------------------------------------------

/// The countdown as shown next to the refresh buttons.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshBadge {
    pub time_remaining: u32,
    pub total_time: u32,
    pub is_active: bool,
    /// Elapsed share of the interval, 0–100.
    pub progress: f64,
    pub label: String,
}

impl From<RefreshIndicator> for RefreshBadge {
    fn from(indicator: RefreshIndicator) -> Self {
        let RefreshIndicator {
            time_remaining,
            total_time,
            is_active,
        } = indicator;
        let progress = if total_time > 0 {
            f64::from(total_time.saturating_sub(time_remaining)) / f64::from(total_time) * 100.0
        } else {
            0.0
        };
        let label = if is_active {
            format!("Aggiornamento ogni {total_time}s")
        } else {
            "Aggiornamento manuale".to_string()
        };
        Self {
            time_remaining,
            total_time,
            is_active,
            progress,
            label,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything the dashboard shows at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub selected_date: String,
    pub refresh: RefreshBadge,
    pub loading: bool,
    pub error: Option<String>,
    pub cards: Vec<CounterCard>,
    /// Newest first; cells follow `cards`.
    pub rows: Vec<OrderRow>,
}

impl DashboardView {
    pub fn build(
        counters: &[Counter],
        aggregation: Aggregation,
        selected_date: &str,
        refresh: RefreshIndicator,
        loading: bool,
        error: Option<String>,
    ) -> Self {
        let cards = counters
            .iter()
            .zip(aggregation.totals)
            .map(|(counter, totals)| CounterCard::new(counter, totals))
            .collect();
        Self {
            selected_date: selected_date.to_string(),
            refresh: refresh.into(),
            loading,
            error,
            cards,
            rows: aggregation.rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Terminal rendering
// ---------------------------------------------------------------------------

const BAR_CELLS: usize = 20;

/// Render the snapshot as coloured text for a terminal.
pub fn render_terminal(view: &DashboardView) -> String {
    let mut out = String::new();

    if let Some(error) = &view.error {
        out.push_str(&format!("{}\n\n", format!("Errore: {error}").red().bold()));
    }

    if view.is_empty() {
        out.push_str(NO_COUNTERS_MESSAGE);
        out.push('\n');
        return out;
    }

    let badge = &view.refresh;
    let countdown = if badge.is_active {
        format!("{} ({}s rimanenti)", badge.label, badge.time_remaining)
    } else {
        badge.label.clone()
    };
    out.push_str(&format!(
        "{}  {}  {}\n",
        "Dashboard".bold().cyan(),
        format!("Data selezionata: {}", view.selected_date).bold(),
        countdown.dimmed()
    ));
    if view.loading {
        out.push_str(&format!("{}\n", "Caricamento ordini in corso...".blue()));
    }
    out.push_str(&format!("{}\n", "=".repeat(60)));

    for card in &view.cards {
        out.push_str(&format!(
            "  {:<20} Ordinati {:>5}  Fatti {:>5}  Da fare {:>5}  {} {:>4}\n",
            truncate(&card.name, 20).bold(),
            card.ordered,
            card.cooked,
            card.remaining,
            progress_bar(card),
            card.percent_label()
        ));
    }
    out.push('\n');

    out.push_str(&format!("  {:>8} {:<16} {:<9}", "Ordine", "Cliente", "Ora"));
    for card in &view.cards {
        out.push_str(&format!(" {:>10}", truncate(&card.name, 10)));
    }
    out.push('\n');
    out.push_str(&format!("  {}\n", "-".repeat(36 + 11 * view.cards.len())));

    for row in &view.rows {
        out.push_str(&format!(
            "  {:>8} {:<16} {:<9}",
            row.id_ordine,
            truncate(&row.cliente, 16),
            row.ora.as_deref().unwrap_or("")
        ));
        for cell in &row.cells {
            let text = if cell.contribution > 0 {
                format!("{:>10}", cell.contribution)
            } else {
                " ".repeat(10)
            };
            out.push_str(&format!(" {}", paint(text, cell.color)));
        }
        out.push('\n');
    }

    out
}

fn progress_bar(card: &CounterCard) -> ColoredString {
    let filled = ((card.bar_width / 100.0) * BAR_CELLS as f64).round() as usize;
    let bar = format!(
        "[{}{}]",
        "#".repeat(filled),
        ".".repeat(BAR_CELLS - filled.min(BAR_CELLS))
    );
    match card.tone {
        Tone::Complete => bar.green(),
        Tone::Halfway => bar.yellow(),
        Tone::Behind => bar.red(),
    }
}

fn paint(text: String, color: CellColor) -> ColoredString {
    match color {
        CellColor::None => text.normal(),
        CellColor::Green => text.black().on_green(),
        CellColor::Yellow => text.black().on_yellow(),
        CellColor::Red => text.white().on_red(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Cell;

    fn counter() -> Counter {
        Counter {
            id: "c1".to_string(),
            name: "Griglia".to_string(),
            tracked_items: Vec::new(),
        }
    }

    #[test]
    fn card_percentage_and_cap() {
        let card = CounterCard::new(&counter(), CounterTotals::new(8, 12));
        assert_eq!(card.percentage, 150.0);
        assert_eq!(card.bar_width, 100.0);
        assert_eq!(card.tone, Tone::Complete);
        assert_eq!(card.remaining, 0);
        assert_eq!(card.percent_label(), "150%");
    }

    #[test]
    fn card_with_nothing_ordered_is_zero_percent() {
        let card = CounterCard::new(&counter(), CounterTotals::new(0, 3));
        assert_eq!(card.percentage, 0.0);
        assert_eq!(card.tone, Tone::Behind);
    }

    #[test]
    fn tone_bands() {
        assert_eq!(tone(49.9), Tone::Behind);
        assert_eq!(tone(50.0), Tone::Halfway);
        assert_eq!(tone(100.0), Tone::Complete);
    }

    #[test]
    fn stepper_floors_at_zero() {
        assert_eq!(step_cooked(0, -1), 0);
        assert_eq!(step_cooked(4, -1), 3);
        assert_eq!(step_cooked(4, 1), 5);
    }

    #[test]
    fn override_parsing() {
        assert_eq!(parse_cooked_override("12"), 12);
        assert_eq!(parse_cooked_override(" 7 "), 7);
        assert_eq!(parse_cooked_override("-3"), 0);
        assert_eq!(parse_cooked_override("tanti"), 0);
        assert_eq!(parse_cooked_override(""), 0);
    }

    #[test]
    fn adjustment_applies_signed_delta() {
        assert_eq!(apply_adjustment(10, "+5"), Some(15));
        assert_eq!(apply_adjustment(10, "-4"), Some(6));
        assert_eq!(apply_adjustment(3, "-10"), Some(0));
        assert_eq!(apply_adjustment(3, "abc"), None);
        assert_eq!(apply_adjustment(3, ""), None);
    }

    #[test]
    fn refresh_badge_progress_and_label() {
        let badge = RefreshBadge::from(RefreshIndicator {
            time_remaining: 15,
            total_time: 60,
            is_active: true,
        });
        assert_eq!(badge.progress, 75.0);
        assert_eq!(badge.label, "Aggiornamento ogni 60s");

        let idle = RefreshBadge::from(RefreshIndicator {
            time_remaining: 60,
            total_time: 60,
            is_active: false,
        });
        assert_eq!(idle.label, "Aggiornamento manuale");
    }

    #[test]
    fn empty_view_renders_prompt() {
        colored::control::set_override(false);
        let view = DashboardView::build(
            &[],
            Aggregation::default(),
            "2025-08-15",
            RefreshIndicator {
                time_remaining: 60,
                total_time: 60,
                is_active: false,
            },
            false,
            Some("boom".to_string()),
        );
        let text = render_terminal(&view);
        assert!(text.contains("Errore: boom"));
        assert!(text.contains(NO_COUNTERS_MESSAGE));
    }

    #[test]
    fn table_renders_rows_and_totals() {
        colored::control::set_override(false);
        let aggregation = Aggregation {
            totals: vec![CounterTotals::new(8, 5)],
            rows: vec![OrderRow {
                id_ordine: 42,
                cliente: "Bianchi".to_string(),
                ora: Some("19:45:00".to_string()),
                cells: vec![Cell {
                    contribution: 6,
                    color: CellColor::Yellow,
                }],
            }],
        };
        let view = DashboardView::build(
            &[counter()],
            aggregation,
            "2025-08-15",
            RefreshIndicator {
                time_remaining: 12,
                total_time: 30,
                is_active: true,
            },
            true,
            None,
        );
        let text = render_terminal(&view);
        assert!(text.contains("Griglia"));
        assert!(text.contains("Bianchi"));
        assert!(text.contains("19:45:00"));
        assert!(text.contains("12s rimanenti"));
        assert!(text.contains("63%"));
        assert!(text.contains("Caricamento ordini"));
    }
}
