//! CLI command implementations for sagra.
//!
//! Provides subcommand handlers for:
//! - `sagra show` / `sagra watch` / `sagra web`: the dashboard, once, live
//!   in the terminal, or in the browser
//! - `sagra articles`: the backend menu, to pick tracked items from
//! - `sagra counters ...`, `sagra date`, `sagra interval`: configuration
//! - `sagra cooked`: read or change a counter's cooked count
//! - `sagra history`: recent backend fetches from the journal
//! - `sagra health`: backend reachability and local files
//! - `sagra settings show|init|set|reset`: configuration file management

pub mod console;

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use colored::Colorize;

use crate::app::App;
use crate::client::HttpOrderFeed;
use crate::config::{self, SagraConfig};
use crate::dashboard::render_terminal;
use crate::editor::{ConfigDraft, parse_interval_input};
use crate::journal::{FetchLogEntry, Journal};
use crate::model::{Article, Counter, find_article};
use crate::runtime::{Event, Flow, Runtime, Surface};
use crate::store::{self, FileKvStore, KvStore, UiStore};
use crate::web;

use console::Command;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// Session setup
// ---------------------------------------------------------------------------

fn open_app(config: &SagraConfig) -> Result<App<FileKvStore>> {
    let path = config
        .state_path()
        .context("could not determine the home directory for the UI state file")?;
    Ok(App::new(UiStore::load(
        FileKvStore::open(path),
        &store::today(),
    )))
}

fn open_runtime<X: Send + 'static>(config: &SagraConfig) -> Result<Runtime<FileKvStore, X>> {
    let feed = HttpOrderFeed::from_config(&config.backend);
    Ok(Runtime::new(
        open_app(config)?,
        Arc::new(feed),
        Journal::from_config(config),
    ))
}

/// Replace the stored configuration with the draft, cleaned the way the
/// editor's save does.
fn commit(app: &mut App<FileKvStore>, draft: &ConfigDraft) {
    app.save_configuration(draft.save());
}

/// Index of the counter named by `reference` (position, id, or name).
fn counter_index(counters: &[Counter], reference: &str) -> Result<usize> {
    let counter = console::resolve_counter(counters, reference)
        .with_context(|| format!("no counter matches '{reference}' (see `sagra counters list`)"))?;
    counters
        .iter()
        .position(|c| c.id == counter.id)
        .context("counter vanished")
}

// ---------------------------------------------------------------------------
// sagra show
// ---------------------------------------------------------------------------

/// Fetch once and print the dashboard.
pub fn run_show(config: &SagraConfig, format: OutputFormat) -> Result<()> {
    let mut runtime = open_runtime::<()>(config)?;
    runtime.load_blocking();
    let view = runtime.app().snapshot();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Table => print!("{}", render_terminal(&view)),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// sagra watch
// ---------------------------------------------------------------------------

/// Live terminal dashboard driven by line commands on stdin.
pub fn run_watch(config: &SagraConfig) -> Result<()> {
    let mut runtime = open_runtime::<String>(config)?;

    let tx = runtime.sender();
    thread::spawn(move || {
        for line in io::stdin().lock().lines().map_while(Result::ok) {
            if tx.send(Event::External(line)).is_err() {
                break;
            }
        }
    });

    runtime.load_articles();
    runtime.reload();
    runtime.run(&mut TerminalSurface::default());
    println!();
    Ok(())
}

/// Redraws the whole screen on every change.
#[derive(Default)]
struct TerminalSurface {
    notice: Option<String>,
}

impl TerminalSurface {
    fn draw<S: KvStore>(&self, app: &App<S>) {
        let mut out = String::from("\x1B[H\x1B[0J");
        out.push_str(&render_terminal(&app.snapshot()));
        out.push('\n');
        if let Some(notice) = &self.notice {
            out.push_str(&format!("{}\n", notice.yellow()));
        }
        out.push_str(&format!("{}\n> ", console::HELP.dimmed()));

        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(out.as_bytes());
        let _ = stdout.flush();
    }
}

impl<S: KvStore> Surface<S, String> for TerminalSurface {
    fn handle(&mut self, runtime: &mut Runtime<S, String>, line: String) -> Flow {
        self.notice = None;
        let command = match console::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => return Flow::Continue,
            Err(message) => {
                self.notice = Some(message);
                self.draw(runtime.app());
                return Flow::Continue;
            }
        };

        match command {
            Command::Quit => return Flow::Quit,
            Command::Help => self.notice = Some(console::HELP.to_string()),
            Command::Refresh => {
                if !runtime.refresh_now() {
                    self.notice = Some("Aggiornamento già in corso".to_string());
                }
            }
            Command::ToggleAuto => runtime.app_mut().toggle_auto_refresh(),
            Command::Step { counter, delta } => {
                if let Some(id) = counter_id(runtime.app(), &counter) {
                    runtime.app_mut().step_cooked(&id, delta);
                } else {
                    self.notice = Some(format!("contatore sconosciuto: {counter}"));
                }
            }
            Command::Set { counter, value } => {
                if let Some(id) = counter_id(runtime.app(), &counter) {
                    runtime.app_mut().override_cooked(&id, &value);
                } else {
                    self.notice = Some(format!("contatore sconosciuto: {counter}"));
                }
            }
            Command::Adjust { counter, amount } => match counter_id(runtime.app(), &counter) {
                Some(id) => {
                    if runtime.app_mut().adjust_cooked(&id, &amount).is_none() {
                        self.notice = Some(format!("valore non valido: {amount}"));
                    }
                }
                None => self.notice = Some(format!("contatore sconosciuto: {counter}")),
            },
        }

        if self.notice.is_some() {
            self.draw(runtime.app());
        }
        Flow::Continue
    }

    fn render(&mut self, app: &App<S>) {
        self.draw(app);
    }
}

fn counter_id<S: KvStore>(app: &App<S>, reference: &str) -> Option<String> {
    console::resolve_counter(&app.state().counters, reference).map(|c| c.id.clone())
}

// ---------------------------------------------------------------------------
// sagra web
// ---------------------------------------------------------------------------

/// Serve the browser dashboard.
pub fn run_web(config: &SagraConfig, addr: Option<&str>, no_open: bool) -> Result<()> {
    let mut runtime = open_runtime(config)?;
    let addr = addr.unwrap_or(&config.web.addr);
    web::serve(&mut runtime, addr, config.web.open_browser && !no_open)
}

// ---------------------------------------------------------------------------
// sagra articles
// ---------------------------------------------------------------------------

/// List the backend's articles.
pub fn run_articles(config: &SagraConfig, format: OutputFormat) -> Result<()> {
    let articles = load_articles(config)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&articles)?),
        OutputFormat::Table => {
            println!("{}", "Articoli".bold().cyan());
            println!("{}", "=".repeat(40));
            println!("  {:>6}  Descrizione", "Id");
            println!("  {}", "-".repeat(38));
            for (i, article) in articles.iter().enumerate() {
                let line = format!("  {:>6}  {}", article.id, article.descrizione);
                if i % 2 == 0 {
                    println!("{line}");
                } else {
                    println!("{}", line.dimmed());
                }
            }
        }
    }
    Ok(())
}

fn load_articles(config: &SagraConfig) -> Result<Vec<Article>> {
    let mut runtime = open_runtime::<()>(config)?;
    runtime.load_articles_blocking();
    if let Some(error) = runtime.app().error() {
        bail!("{error}");
    }
    Ok(runtime.app().articles().to_vec())
}

// ---------------------------------------------------------------------------
// sagra counters ...
// ---------------------------------------------------------------------------

/// Print the configured counters and their tracked items.
pub fn run_counters_list(config: &SagraConfig) -> Result<()> {
    let app = open_app(config)?;
    let counters = &app.state().counters;
    if counters.is_empty() {
        println!("{}", "Nessun contatore configurato.".yellow());
        println!(
            "  {}",
            "Create one with `sagra counters add <name> --item <articleId>`".dimmed()
        );
        return Ok(());
    }

    for (i, counter) in counters.iter().enumerate() {
        println!(
            "{} {} {}",
            format!("{}.", i + 1).bold(),
            counter.name.bold().cyan(),
            format!("({})", counter.id).dimmed()
        );
        for item in &counter.tracked_items {
            println!(
                "     {} x{} {}",
                item.descrizione,
                item.moltiplicatore,
                format!("[article {}]", item.article_id).dimmed()
            );
        }
    }
    Ok(())
}

/// Parse `articleId[:multiplier]`.
pub fn parse_item_spec(spec: &str) -> Result<(String, i64)> {
    let (id, multiplier) = match spec.split_once(':') {
        Some((id, m)) => {
            let m: i64 = m
                .trim()
                .parse()
                .with_context(|| format!("invalid multiplier in '{spec}'"))?;
            (id.trim(), m)
        }
        None => (spec.trim(), 1),
    };
    if id.is_empty() {
        bail!("missing article id in '{spec}'");
    }
    if multiplier < 1 {
        bail!("multiplier must be at least 1 in '{spec}'");
    }
    Ok((id.to_string(), multiplier))
}

/// Append items to a draft counter, checking ids against the menu.
fn add_items(
    draft: &mut ConfigDraft,
    counter: usize,
    specs: &[String],
    articles: &[Article],
) -> Result<()> {
    for spec in specs {
        let (article_id, multiplier) = parse_item_spec(spec)?;
        if find_article(articles, &article_id).is_none() {
            bail!("no article with id {article_id} (see `sagra articles`)");
        }
        let item = draft
            .add_item(counter)
            .context("counter index out of range")?;
        draft.select_article(counter, item, &article_id, articles);
        draft.set_multiplier(counter, item, multiplier);
    }
    Ok(())
}

/// Create a counter tracking the given items.
pub fn run_counters_add(config: &SagraConfig, name: Option<&str>, items: &[String]) -> Result<()> {
    if items.is_empty() {
        bail!("a counter needs at least one --item <articleId[:multiplier]>");
    }
    let articles = load_articles(config)?;
    let mut app = open_app(config)?;
    app.articles_loaded(Ok(articles.clone()));

    let mut draft = app.draft();
    let index = draft.add_counter();
    if let Some(name) = name {
        draft.rename_counter(index, name);
    }
    add_items(&mut draft, index, items, &articles)?;
    let created = draft.counters[index].name.clone();
    commit(&mut app, &draft);

    println!("{} Added counter {}", "✓".green().bold(), created.bold());
    Ok(())
}

pub fn run_counters_rename(config: &SagraConfig, counter: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("counter name cannot be empty");
    }
    let mut app = open_app(config)?;
    let mut draft = app.draft();
    let index = counter_index(&draft.counters, counter)?;
    draft.rename_counter(index, name);
    commit(&mut app, &draft);
    println!("{} Renamed to {}", "✓".green().bold(), name.bold());
    Ok(())
}

pub fn run_counters_remove(config: &SagraConfig, counter: &str) -> Result<()> {
    let mut app = open_app(config)?;
    let mut draft = app.draft();
    let index = counter_index(&draft.counters, counter)?;
    let removed = draft
        .remove_counter(index)
        .context("counter index out of range")?;
    commit(&mut app, &draft);
    println!("{} Removed counter {}", "✓".green().bold(), removed.name.bold());
    Ok(())
}

pub fn run_counters_add_item(config: &SagraConfig, counter: &str, items: &[String]) -> Result<()> {
    let articles = load_articles(config)?;
    let mut app = open_app(config)?;
    app.articles_loaded(Ok(articles.clone()));

    let mut draft = app.draft();
    let index = counter_index(&draft.counters, counter)?;
    add_items(&mut draft, index, items, &articles)?;
    commit(&mut app, &draft);
    println!(
        "{} Counter {} now tracks {} item(s)",
        "✓".green().bold(),
        draft.counters[index].name.bold(),
        draft.counters[index].tracked_items.len()
    );
    Ok(())
}

/// Remove the item tracking `article_id`. A counter left without items is
/// dropped on save, like in the editor.
pub fn run_counters_remove_item(config: &SagraConfig, counter: &str, article_id: &str) -> Result<()> {
    let mut app = open_app(config)?;
    let mut draft = app.draft();
    let index = counter_index(&draft.counters, counter)?;
    let item = draft.counters[index]
        .tracked_items
        .iter()
        .position(|i| i.article_id == article_id)
        .with_context(|| format!("counter does not track article {article_id}"))?;
    draft.remove_item(index, item);
    let emptied = draft.counters[index].tracked_items.is_empty();
    let name = draft.counters[index].name.clone();
    commit(&mut app, &draft);

    if emptied {
        println!(
            "{} Counter {} had no items left and was removed",
            "!".yellow().bold(),
            name.bold()
        );
    } else {
        println!("{} Removed article {article_id} from {}", "✓".green().bold(), name.bold());
    }
    Ok(())
}

pub fn run_counters_set_multiplier(
    config: &SagraConfig,
    counter: &str,
    article_id: &str,
    multiplier: i64,
) -> Result<()> {
    if multiplier < 1 {
        bail!("multiplier must be at least 1");
    }
    let mut app = open_app(config)?;
    let mut draft = app.draft();
    let index = counter_index(&draft.counters, counter)?;
    let item = draft.counters[index]
        .tracked_items
        .iter()
        .position(|i| i.article_id == article_id)
        .with_context(|| format!("counter does not track article {article_id}"))?;
    draft.set_multiplier(index, item, multiplier);
    commit(&mut app, &draft);
    println!("{} Multiplier set to {multiplier}", "✓".green().bold());
    Ok(())
}

// ---------------------------------------------------------------------------
// sagra date / interval
// ---------------------------------------------------------------------------

/// Show or set the selected date (`YYYY-MM-DD`).
pub fn run_date(config: &SagraConfig, date: Option<&str>) -> Result<()> {
    let mut app = open_app(config)?;
    let Some(date) = date else {
        println!("{}", app.state().selected_date);
        return Ok(());
    };

    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{date}', expected YYYY-MM-DD"))?;
    let mut draft = app.draft();
    draft.set_date(date);
    commit(&mut app, &draft);
    println!("{} Selected date {}", "✓".green().bold(), date.bold());
    Ok(())
}

/// Show or set the auto-refresh interval in seconds.
pub fn run_interval(config: &SagraConfig, seconds: Option<&str>) -> Result<()> {
    let mut app = open_app(config)?;
    let Some(seconds) = seconds else {
        println!("{}s", app.state().refresh_interval);
        return Ok(());
    };

    let requested = parse_interval_input(seconds);
    let mut draft = app.draft();
    draft.set_interval_input(seconds);
    commit(&mut app, &draft);
    let applied = app.state().refresh_interval;

    if i64::from(applied) == requested {
        println!("{} Refresh interval {applied}s", "✓".green().bold());
    } else {
        println!(
            "{} Refresh interval {applied}s {}",
            "✓".green().bold(),
            format!("(requested {requested}s, limits 10..600)").dimmed()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// sagra cooked
// ---------------------------------------------------------------------------

/// Show or change a counter's cooked count.
pub fn run_cooked(
    config: &SagraConfig,
    counter: &str,
    set: Option<&str>,
    add: Option<&str>,
) -> Result<()> {
    let mut app = open_app(config)?;
    let id = counter_id(&app, counter)
        .with_context(|| format!("no counter matches '{counter}' (see `sagra counters list`)"))?;

    let cooked = match (set, add) {
        (Some(value), None) => app.override_cooked(&id, value),
        (None, Some(amount)) => app
            .adjust_cooked(&id, amount)
            .with_context(|| format!("'{amount}' is not a number"))?,
        (None, None) => app.state().cooked(&id),
        (Some(_), Some(_)) => bail!("use either --set or --add"),
    };
    println!("{cooked}");
    Ok(())
}

// ---------------------------------------------------------------------------
// sagra history
// ---------------------------------------------------------------------------

/// Print the most recent fetch journal entries.
pub fn run_history(config: &SagraConfig, last: usize, format: OutputFormat) -> Result<()> {
    let journal = Journal::from_config(config);
    let entries = journal.tail(last);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No fetches recorded yet.".yellow());
        return Ok(());
    }

    println!("{}", "Recent backend fetches".bold().cyan());
    println!("{}", "=".repeat(72));
    println!(
        "  {:<20} {:<12} {:<11} {:<9} {:>8} {:>6} {:>8}",
        "Time", "Kind", "Date", "Since", "Received", "Added", "Latency"
    );
    println!("  {}", "-".repeat(70));
    for entry in &entries {
        print_history_line(entry);
    }
    Ok(())
}

fn print_history_line(entry: &FetchLogEntry) {
    let time = chrono::DateTime::parse_from_rfc3339(&entry.timestamp)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| entry.timestamp.clone());
    let line = format!(
        "  {:<20} {:<12} {:<11} {:<9} {:>8} {:>6} {:>6}ms",
        time,
        entry.kind.to_string(),
        entry.date.as_deref().unwrap_or("-"),
        entry.since.as_deref().unwrap_or("-"),
        entry.received,
        entry.added,
        entry.latency_ms
    );
    if entry.success {
        println!("{line}");
    } else {
        println!("{}", line.red());
        if let Some(error) = &entry.error {
            println!("      {}", error.dimmed());
        }
    }
}

// ---------------------------------------------------------------------------
// sagra health
// ---------------------------------------------------------------------------

/// Check backend reachability and local files.
pub fn run_health(config: &SagraConfig) -> Result<()> {
    println!("{}", "sagra Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.sagra/config.toml found"
        } else {
            "not found (run `sagra settings init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".sagra.toml found"
        } else {
            "none (optional)"
        },
    );

    let feed = HttpOrderFeed::from_config(&config.backend);
    let backend_ok = feed.is_healthy();
    let backend_detail = if backend_ok {
        format!("reachable at {}", feed.base_url())
    } else {
        format!("not reachable at {}", feed.base_url())
    };
    print_health_item("Backend", backend_ok, &backend_detail);

    let app = open_app(config)?;
    let counters = app.state().counters.len();
    print_health_item(
        "Counters",
        counters > 0,
        &if counters > 0 {
            format!("{counters} configured, date {}", app.state().selected_date)
        } else {
            "none (run `sagra counters add`)".to_string()
        },
    );
    print_health_item(
        "UI state",
        app.store().backend().path().exists(),
        &app.store().backend().path().display().to_string(),
    );

    let journal = Journal::from_config(config);
    match journal.path() {
        Some(path) => {
            let entries = journal.tail(usize::MAX).len();
            print_health_item(
                "Fetch journal",
                path.exists(),
                &if path.exists() {
                    format!("{entries} entries")
                } else {
                    "no log file yet".to_string()
                },
            );
        }
        None => print_health_item("Fetch journal", true, "disabled"),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<18} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// sagra settings show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_settings_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective sagra Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    if global_exists {
        println!("  {} {}", "✓".green(), "~/.sagra/config.toml".dimmed());
    } else {
        println!(
            "  {} {}",
            "·".dimmed(),
            "~/.sagra/config.toml (not found)".dimmed()
        );
    }
    if project_exists {
        println!("  {} {}", "✓".green(), ".sagra.toml".dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), ".sagra.toml (not found)".dimmed());
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "SAGRA_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.sagra/config.toml`.
pub fn run_settings_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!("  {}", "Edit the file to point sagra at your backend.".dimmed());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_settings_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_settings_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
