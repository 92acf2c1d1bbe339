/// Configuration schema and defaults for the sagra dashboard.
///
/// Defines the TOML-serializable configuration structure with the sections
/// `[backend]`, `[web]`, `[state]`, and `[logging]`.
///
/// Every field has a built-in default. Users only need to set the values they
/// want to override.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level sagra configuration.
///
/// Maps directly to the `~/.sagra/config.toml` and `.sagra.toml` file
/// schemas. All sections and fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SagraConfig {
    pub backend: BackendConfig,
    pub web: WebConfig,
    pub state: StateConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

/// Where the order feed lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend exposing `/api/articles` and `/api/orders`.
    pub url: String,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5001".to_string(),
            timeout_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// Embedded browser dashboard settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address for `sagra web`.
    pub addr: String,
    /// Open the dashboard in the default browser on start.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8787".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [state]
// ---------------------------------------------------------------------------

/// Persisted UI state location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Override for the state file. Defaults to `~/.sagra/ui-state.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Fetch journal settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append one JSONL entry per backend fetch.
    pub enabled: bool,
    /// Override for the journal file. Defaults to `~/.sagra/fetch-log.jsonl`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved paths
// ---------------------------------------------------------------------------

impl SagraConfig {
    /// The UI state file, honouring `[state] path`.
    pub fn state_path(&self) -> Option<PathBuf> {
        self.state
            .path
            .clone()
            .or_else(|| sagra_home().map(|home| home.join("ui-state.json")))
    }

    /// The fetch journal, honouring `[logging] path`.
    pub fn journal_path(&self) -> Option<PathBuf> {
        self.logging
            .path
            .clone()
            .or_else(|| sagra_home().map(|home| home.join("fetch-log.jsonl")))
    }

    /// Annotated default config written by `sagra settings init`.
    pub fn default_toml() -> String {
        r#"# sagra Configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (SAGRA_*)
#   2. Project config (.sagra.toml in current directory)
#   3. User global config (~/.sagra/config.toml)
#   4. Built-in defaults

[backend]
url = "http://127.0.0.1:5001"   # or SAGRA_BACKEND_URL
timeout_ms = 10000

[web]
addr = "127.0.0.1:8787"         # or SAGRA_WEB_ADDR
open_browser = true

[state]
# path = "/var/lib/sagra/ui-state.json"

[logging]
enabled = true                  # or SAGRA_LOGGING=0
# path = "/var/log/sagra/fetch-log.jsonl"
"#
        .to_string()
    }
}

/// `~/.sagra`, the home of every file sagra writes by default.
pub fn sagra_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sagra"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = SagraConfig::default();
        assert_eq!(config.backend.url, "http://127.0.0.1:5001");
        assert_eq!(config.backend.timeout_ms, 10_000);
        assert_eq!(config.web.addr, "127.0.0.1:8787");
        assert!(config.web.open_browser);
        assert!(config.state.path.is_none());
        assert!(config.logging.enabled);
    }

    #[test]
    fn deserialize_minimal_toml() {
        let toml_str = r#"
[backend]
url = "http://cassa.local:5001"
"#;
        let config: SagraConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.url, "http://cassa.local:5001");
        assert_eq!(config.backend.timeout_ms, 10_000);
        assert_eq!(config.web, WebConfig::default());
    }

    #[test]
    fn explicit_paths_win_over_home() {
        let toml_str = r#"
[state]
path = "/tmp/sagra-state.json"

[logging]
enabled = false
path = "/tmp/sagra-log.jsonl"
"#;
        let config: SagraConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.state_path(),
            Some(PathBuf::from("/tmp/sagra-state.json"))
        );
        assert_eq!(
            config.journal_path(),
            Some(PathBuf::from("/tmp/sagra-log.jsonl"))
        );
        assert!(!config.logging.enabled);
    }

    #[test]
    fn default_toml_parses_back() {
        let config: SagraConfig = toml::from_str(&SagraConfig::default_toml()).unwrap();
        assert_eq!(config, SagraConfig::default());
    }
}
