//! Configuration for servicefixd.
//!
//! Loads settings from a TOML file (SERVICEFIX_CONFIG, then
//! /etc/servicefix/config.toml, then ./servicefix.toml) and applies
//! environment overrides for the secrets. A missing bot token or admin
//! chat id is a startup failure, never a per-request one.

use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// System config file path
pub const CONFIG_PATH: &str = "/etc/servicefix/config.toml";

/// Fallback next to the working directory
pub const LOCAL_CONFIG_PATH: &str = "servicefix.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Telegram bot token (usually supplied via SERVICEFIX_BOT_TOKEN)
    #[serde(default)]
    pub bot_token: String,

    /// The single administrator's chat id
    #[serde(default)]
    pub admin_chat_id: i64,

    /// SQLite database path
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Optional TOML file replacing the built-in reference lists
    #[serde(default)]
    pub refdata_path: Option<PathBuf>,

    /// getUpdates long-poll window in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tickets.db")
}

fn default_poll_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            admin_chat_id: 0,
            db_path: default_db_path(),
            refdata_path: None,
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

impl Config {
    /// Load config from the usual places, or fall back to defaults, then
    /// apply environment overrides.
    pub fn load() -> Self {
        let mut config = if let Ok(path) = std::env::var("SERVICEFIX_CONFIG") {
            Self::load_from_path(&path).unwrap_or_else(|e| {
                warn!("Config at {path} unreadable, using defaults: {e}");
                Config::default()
            })
        } else {
            Self::load_from_path(CONFIG_PATH)
                .or_else(|_| Self::load_from_path(LOCAL_CONFIG_PATH))
                .unwrap_or_else(|e| {
                    warn!("Config not found, using defaults: {e}");
                    Config::default()
                })
        };
        config.apply_env();
        config
    }

    fn load_from_path(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {path}");
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("SERVICEFIX_BOT_TOKEN") {
            self.bot_token = token;
        }
        if let Ok(admin) = std::env::var("SERVICEFIX_ADMIN_CHAT_ID") {
            match admin.parse() {
                Ok(id) => self.admin_chat_id = id,
                Err(_) => warn!("SERVICEFIX_ADMIN_CHAT_ID is not an integer, ignoring"),
            }
        }
        if let Ok(path) = std::env::var("SERVICEFIX_DB_PATH") {
            self.db_path = PathBuf::from(path);
        }
    }

    /// Startup validation: both credentials are required.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.is_empty() {
            bail!("bot token is not set; put it in the config file or SERVICEFIX_BOT_TOKEN");
        }
        if self.admin_chat_id == 0 {
            bail!("admin chat id is not set; put it in the config file or SERVICEFIX_ADMIN_CHAT_ID");
        }
        Ok(())
    }
}
