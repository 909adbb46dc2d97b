use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanned for rule-set YAML files.
    pub rules_dir: PathBuf,
    /// Fail rule loading when any rule is dropped during normalization.
    pub strict: bool,
    /// `tracing_subscriber::EnvFilter` directive used by binaries.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from("data/rules"),
            strict: false,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    ///
    /// Reads `INNER_RULES_DIR`, `INNER_STRICT` and `INNER_LOG`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset;
    /// unparseable booleans fall back to the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            rules_dir: get("INNER_RULES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.rules_dir),
            strict: get("INNER_STRICT")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.strict),
            log_filter: get("INNER_LOG").unwrap_or(defaults.log_filter),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  rules_dir:   {}", self.rules_dir.display());
        tracing::info!("  strict:      {}", self.strict);
        tracing::info!("  log_filter:  {}", self.log_filter);
    }
}
