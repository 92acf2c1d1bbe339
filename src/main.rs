use anyhow::Result;
use clap::{Parser, Subcommand};

use sagra::cli::{self, OutputFormat};
use sagra::config;

#[derive(Debug, Parser)]
#[command(name = "sagra")]
#[command(about = "Order fulfillment dashboard for food-stand events")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch once and print the dashboard
    Show {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Live dashboard in the terminal, with line commands on stdin
    Watch,
    /// Serve the dashboard in the browser
    Web {
        /// Listen address (default from config: 127.0.0.1:8787)
        #[arg(long)]
        addr: Option<String>,
        /// Do not open a browser window
        #[arg(long)]
        no_open: bool,
    },
    /// List the articles known to the backend
    Articles {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Manage kitchen counters
    Counters {
        #[command(subcommand)]
        action: CounterAction,
    },
    /// Show or set the selected date (YYYY-MM-DD)
    Date { date: Option<String> },
    /// Show or set the auto-refresh interval in seconds (10..600)
    Interval { seconds: Option<String> },
    /// Show or change how many portions a counter has cooked
    Cooked {
        /// Counter position (1-based), id, or name
        counter: String,
        /// Replace the count
        #[arg(long, allow_hyphen_values = true)]
        set: Option<String>,
        /// Add a signed amount, e.g. 5 or -3
        #[arg(long, allow_hyphen_values = true)]
        add: Option<String>,
    },
    /// Show recent backend fetches
    History {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        last: usize,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Check backend reachability and local files
    Health,
    /// Manage sagra configuration files
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
enum CounterAction {
    /// List counters and their tracked items
    List,
    /// Create a counter
    Add {
        /// Display name (default: "Contatore N")
        name: Option<String>,
        /// Tracked article as articleId[:multiplier]; repeatable
        #[arg(long = "item", required = true)]
        items: Vec<String>,
    },
    /// Rename a counter
    Rename { counter: String, name: String },
    /// Delete a counter
    Remove { counter: String },
    /// Track more articles
    AddItem {
        counter: String,
        /// articleId[:multiplier]; repeatable
        #[arg(long = "item", required = true)]
        items: Vec<String>,
    },
    /// Stop tracking an article
    RemoveItem { counter: String, article_id: String },
    /// Change how many portions one unit of an article counts for
    SetMultiplier {
        counter: String,
        article_id: String,
        multiplier: i64,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// Show the effective configuration
    Show,
    /// Write a default ~/.sagra/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a value, e.g. `sagra settings set backend.url http://10.0.0.5:5001`
    Set { key: String, value: String },
    /// Reset ~/.sagra/config.toml to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let config = config::load();

    match app.command {
        Commands::Show { format } => {
            cli::run_show(&config, OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Watch => cli::run_watch(&config),
        Commands::Web { addr, no_open } => cli::run_web(&config, addr.as_deref(), no_open),
        Commands::Articles { format } => {
            cli::run_articles(&config, OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Counters { action } => match action {
            CounterAction::List => cli::run_counters_list(&config),
            CounterAction::Add { name, items } => {
                cli::run_counters_add(&config, name.as_deref(), &items)
            }
            CounterAction::Rename { counter, name } => {
                cli::run_counters_rename(&config, &counter, &name)
            }
            CounterAction::Remove { counter } => cli::run_counters_remove(&config, &counter),
            CounterAction::AddItem { counter, items } => {
                cli::run_counters_add_item(&config, &counter, &items)
            }
            CounterAction::RemoveItem {
                counter,
                article_id,
            } => cli::run_counters_remove_item(&config, &counter, &article_id),
            CounterAction::SetMultiplier {
                counter,
                article_id,
                multiplier,
            } => cli::run_counters_set_multiplier(&config, &counter, &article_id, multiplier),
        },
        Commands::Date { date } => cli::run_date(&config, date.as_deref()),
        Commands::Interval { seconds } => cli::run_interval(&config, seconds.as_deref()),
        Commands::Cooked { counter, set, add } => {
            cli::run_cooked(&config, &counter, set.as_deref(), add.as_deref())
        }
        Commands::History { last, format } => {
            cli::run_history(&config, last, OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Health => cli::run_health(&config),
        Commands::Settings { action } => match action {
            SettingsAction::Show => cli::run_settings_show(),
            SettingsAction::Init { force } => cli::run_settings_init(force),
            SettingsAction::Set { key, value } => cli::run_settings_set(&key, &value),
            SettingsAction::Reset => cli::run_settings_reset(),
        },
    }
}
