/// Configuration system for sagra.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::SagraConfig::default()`]
/// 2. **User global config**: `~/.sagra/config.toml`
/// 3. **Project local config**: `.sagra.toml` in the current working directory
/// 4. **Environment variables**: `SAGRA_*` overrides (highest precedence)
///
/// This file only covers how the binary reaches the backend and where it
/// keeps its files. Counters, cooked counts, the selected date and the
/// refresh interval are UI state and live in [`crate::store`].
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::SagraConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> SagraConfig {
    let mut config = load_layers(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config);
    config
}

/// Merge the given TOML files over the built-in defaults, later files
/// winning key by key. Missing or malformed files are skipped.
pub fn load_layers(paths: &[Option<PathBuf>]) -> SagraConfig {
    let mut merged = toml::Value::Table(toml::Table::new());
    for path in paths {
        if let Some(layer) = load_toml_file(path.clone()) {
            merge_values(&mut merged, layer);
        }
    }
    merged.try_into().unwrap_or_else(|e| {
        eprintln!("warning: ignoring config files: {e}");
        SagraConfig::default()
    })
}

/// Load a TOML config file from the given path (if it exists).
///
/// Malformed files are ignored with a warning: a broken config must not keep
/// the dashboard from starting during service.
fn load_toml_file(path: Option<PathBuf>) -> Option<toml::Value> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    let checked = toml::from_str::<SagraConfig>(&content)
        .and_then(|_| toml::from_str::<toml::Value>(&content));
    match checked {
        Ok(value) => Some(value),
        Err(e) => {
            eprintln!("warning: ignoring malformed {}: {e}", path.display());
            None
        }
    }
}

/// Overlay `layer` onto `base`. Tables merge recursively; any other value
/// replaces what was there.
fn merge_values(base: &mut toml::Value, layer: toml::Value) {
    match (base, layer) {
        (toml::Value::Table(base), toml::Value::Table(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.sagra/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    schema::sagra_home().map(|home| home.join("config.toml"))
}

/// Path to the project local config: `.sagra.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".sagra.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `SAGRA_BACKEND_URL`: backend base URL
/// - `SAGRA_BACKEND_TIMEOUT_MS`: per-request timeout
/// - `SAGRA_WEB_ADDR`: listen address for `sagra web`
/// - `SAGRA_STATE_FILE`: UI state file
/// - `SAGRA_LOGGING`: fetch journal on/off (`1`/`true`/`yes`/`on`)
fn apply_env_overrides(config: &mut SagraConfig) {
    if let Ok(val) = std::env::var("SAGRA_BACKEND_URL")
        && !val.is_empty()
    {
        config.backend.url = val;
    }
    if let Ok(val) = std::env::var("SAGRA_BACKEND_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.backend.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("SAGRA_WEB_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
    if let Ok(val) = std::env::var("SAGRA_STATE_FILE")
        && !val.is_empty()
    {
        config.state.path = Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("SAGRA_LOGGING") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.sagra/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.sagra/ directory")?;
    }

    fs::write(&path, SagraConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Supports dotted keys like `backend.url`. Starts from the defaults when no
/// global file exists yet.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let source = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&SagraConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&source).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Reject edits that would no longer load.
    let rendered = toml::to_string_pretty(&root).context("failed to serialize config")?;
    toml::from_str::<SagraConfig>(&rendered)
        .with_context(|| format!("invalid value for '{key}': {value}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, rendered).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// Missing leaf keys inside an existing section are created as strings,
/// which covers the optional `path` settings.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };
    if leaf.is_empty() {
        anyhow::bail!("empty config key");
    }

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        _ => toml::Value::String(raw_value.to_string()),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
