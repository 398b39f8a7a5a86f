// src/config.rs
//! Service configuration: an optional TOML file with env overrides.
//! Secrets (bot token, rewrite key) come from the environment only.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

const ENV_CONFIG_PATH: &str = "AUTOPOST_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/feed_autoposter.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Trigger-loop period, seconds.
    pub tick_secs: u64,
    /// HTTP bind address for health/metrics/webhook.
    pub bind_addr: String,
    /// Store snapshot location.
    pub state_path: String,
    /// Rewrite model identifier passed to OpenRouter.
    pub model: String,
    /// Bounded timeout for provider and delivery calls, seconds.
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_secs: 10,
            bind_addr: "0.0.0.0:8000".to_string(),
            state_path: "state/autoposter.json".to_string(),
            model: "arcee-ai/trinity-large-preview:free".to_string(),
            http_timeout_secs: 5,
        }
    }
}

pub fn load_from(path: &Path) -> Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let cfg: AppConfig =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration:
/// 1) $AUTOPOST_CONFIG_PATH, if set (must exist)
/// 2) config/feed_autoposter.toml, if present
/// 3) built-in defaults
/// then apply per-key env overrides.
pub fn load() -> AppConfig {
    let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
        Ok(p) => match load_from(Path::new(&p)) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = ?e, path = %p, "config load failed, using defaults");
                AppConfig::default()
            }
        },
        Err(_) => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_from(default_path).unwrap_or_else(|e| {
                    warn!(error = ?e, "config parse failed, using defaults");
                    AppConfig::default()
                })
            } else {
                AppConfig::default()
            }
        }
    };
    apply_env_overrides(&mut cfg);
    cfg
}

fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Some(v) = env_u64("AUTOPOST_TICK_SECS") {
        cfg.tick_secs = v;
    }
    if let Ok(v) = std::env::var("AUTOPOST_BIND_ADDR") {
        cfg.bind_addr = v;
    }
    if let Ok(v) = std::env::var("AUTOPOST_STATE_PATH") {
        cfg.state_path = v;
    }
    if let Ok(v) = std::env::var("AUTOPOST_MODEL") {
        cfg.model = v;
    }
    if let Some(v) = env_u64("AUTOPOST_HTTP_TIMEOUT_SECS") {
        cfg.http_timeout_secs = v;
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Required at boot; the binary refuses to start without it.
pub fn telegram_token() -> Option<String> {
    std::env::var("TELEGRAM_BOT_TOKEN").ok().filter(|v| !v.is_empty())
}

/// Optional; a missing key disables the rewriter.
pub fn openrouter_key() -> Option<String> {
    std::env::var("OPENROUTER_API_KEY").ok().filter(|v| !v.is_empty())
}
