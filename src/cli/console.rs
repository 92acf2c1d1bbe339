//! Line commands understood by `sagra watch`.
//!
//! ```text
//! r              refresh now (new orders only)
//! a              pause / resume automatic refresh
//! + <counter>    one more cooked
//! - <counter>    one less cooked
//! set <counter> <n>     override the cooked count
//! adj <counter> <+/-n>  adjust the cooked count
//! q              quit
//! ```
//!
//! `<counter>` is a 1-based position, a counter id, or a counter name.

use crate::model::Counter;

pub const HELP: &str =
    "r aggiorna | a pausa/riprendi | + N / - N fatti | set N valore | adj N +/-valore | q esci";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Refresh,
    ToggleAuto,
    Step { counter: String, delta: i64 },
    Set { counter: String, value: String },
    Adjust { counter: String, amount: String },
    Help,
    Quit,
}

/// Parse one input line. Blank lines parse as `None`; anything unknown is an
/// error message to show the user.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match (head, rest.as_slice()) {
        ("r" | "refresh", []) => Command::Refresh,
        ("a" | "auto", []) => Command::ToggleAuto,
        ("q" | "quit" | "exit", []) => Command::Quit,
        ("h" | "help" | "?", []) => Command::Help,
        ("+", [counter]) => Command::Step {
            counter: counter.to_string(),
            delta: 1,
        },
        ("-", [counter]) => Command::Step {
            counter: counter.to_string(),
            delta: -1,
        },
        ("set", [counter, value]) => Command::Set {
            counter: counter.to_string(),
            value: value.to_string(),
        },
        ("adj", [counter, amount]) => Command::Adjust {
            counter: counter.to_string(),
            amount: amount.to_string(),
        },
        _ => return Err(format!("comando non riconosciuto: {}", line.trim())),
    };
    Ok(Some(command))
}

/// Find a counter by 1-based position, id, or case-insensitive name.
pub fn resolve_counter<'a>(counters: &'a [Counter], reference: &str) -> Option<&'a Counter> {
    if let Ok(position) = reference.parse::<usize>()
        && position >= 1
        && let Some(counter) = counters.get(position - 1)
    {
        return Some(counter);
    }
    counters
        .iter()
        .find(|c| c.id == reference)
        .or_else(|| {
            counters
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(reference))
        })
}
