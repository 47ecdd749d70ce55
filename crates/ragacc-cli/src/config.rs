//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `--config` flag
//! 2. `$RAGACC_CONFIG` environment variable
//! 3. `<platform config dir>/ragacc/config.toml`
//! 4. Built-in defaults (everything is optional)
//!
//! `API_URL` and `INTEGRATION_TEST_SECRET` override the file; CLI flags
//! override both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use ragacc_core::DEFAULT_IDENTITY_PREFIX;
use ragacc_http::{ClientConfig, RetryPolicy};

pub const CONFIG_ENV: &str = "RAGACC_CONFIG";
pub const URL_ENV: &str = "API_URL";
pub const SECRET_ENV: &str = "INTEGRATION_TEST_SECRET";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
    pub run: RunConfig,
}

/// Where the service lives and how to authenticate.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: Option<String>,
    /// Shared secret for the test side-channel.
    pub secret: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Create and delete calls.
    pub note_secs: u64,
    /// Question calls (retrieval + generation).
    pub ask_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Parallel question workers.
    pub jobs: usize,
    pub identity_prefix: String,
    /// Wait after loading notes before asking, for async indexing.
    pub index_settle_ms: u64,
}

// --- Defaults ---

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            note_secs: 10,
            ask_secs: 30,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay_ms: 300,
            max_delay_ms: 30_000,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            identity_prefix: DEFAULT_IDENTITY_PREFIX.into(),
            index_settle_ms: 0,
        }
    }
}

impl Config {
    /// Apply `API_URL` / `INTEGRATION_TEST_SECRET` from the given lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.service.base_url = Some(url);
        }
        if let Some(secret) = lookup(SECRET_ENV).filter(|v| !v.is_empty()) {
            self.service.secret = Some(secret);
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    /// Build the HTTP client settings. Fails before any network call when
    /// the URL or secret is missing.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let Some(base_url) = self.service.base_url.as_deref().map(str::trim) else {
            bail!("no service URL configured (set {URL_ENV}, [service].base_url or --base-url)");
        };
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!("service URL must start with http:// or https://: {base_url}");
        }
        let Some(secret) = self.service.secret.as_deref() else {
            bail!("no test secret configured (set {SECRET_ENV} or [service].secret)");
        };
        if self.timeouts.note_secs == 0 || self.timeouts.ask_secs == 0 {
            bail!("timeouts must be at least one second");
        }

        Ok(ClientConfig {
            base_url: base_url.to_string(),
            secret: secret.to_string(),
            note_timeout: Duration::from_secs(self.timeouts.note_secs),
            ask_timeout: Duration::from_secs(self.timeouts.ask_secs),
            retry: self.retry_policy(),
        })
    }
}

/// Load config from disk, then apply environment overrides. Returns
/// defaults if no config file exists.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match config_path(explicit) {
        Some(p) if p.exists() => read_config(&p)?,
        Some(p) if explicit.is_some() => bail!("config file not found: {}", p.display()),
        _ => Config::default(),
    };
    config.apply_env(|k| std::env::var(k).ok());
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Resolve the config file path.
fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }

    if let Ok(p) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(p));
    }

    directories::ProjectDirs::from("dev", "ragacc", "ragacc")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Show the active config path (for `ragacc config`).
pub fn show_config_path(explicit: Option<&Path>) -> String {
    match config_path(explicit) {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}

/// Keep the first and last two characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 6 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 4))
}
