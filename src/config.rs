use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to do with bare text whose first token is not a known command.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BareUnknownPolicy {
    /// Treat it as ordinary conversation.
    #[default]
    Ignore,
    /// Reply with a reminder to use the prefix.
    Notice,
}

impl std::fmt::Display for BareUnknownPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BareUnknownPolicy::Ignore => write!(f, "ignore"),
            BareUnknownPolicy::Notice => write!(f, "notice"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub admins: HashSet<String>,
    #[serde(default)]
    pub moderators: HashSet<String>,
    #[serde(default)]
    pub bare_unknown: BareUnknownPolicy,
    #[serde(default = "default_language")]
    pub language: String,
    /// Optional JSON table overriding the built-in strings
    #[serde(default)]
    pub language_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_flush_delay_secs")]
    pub flush_delay_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_enabled")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_bind")]
    pub bind: SocketAddr,
    #[serde(default = "default_dashboard_dir")]
    pub directory: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_heartbeat_cron")]
    pub heartbeat_cron: String,
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("cmdbot.db")
}

fn default_flush_delay_secs() -> u64 {
    5
}

fn default_dashboard_enabled() -> bool {
    true
}

fn default_dashboard_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_dashboard_dir() -> PathBuf {
    PathBuf::from("dashboard")
}

fn default_heartbeat_cron() -> String {
    "0 0 * * * *".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            admins: HashSet::new(),
            moderators: HashSet::new(),
            bare_unknown: BareUnknownPolicy::default(),
            language: default_language(),
            language_file: None,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            flush_delay_secs: default_flush_delay_secs(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: default_dashboard_enabled(),
            bind: default_dashboard_bind(),
            directory: default_dashboard_dir(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            heartbeat_cron: default_heartbeat_cron(),
        }
    }
}

impl StatsConfig {
    pub fn flush_delay(&self) -> Duration {
        Duration::from_secs(self.flush_delay_secs)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::parse(&content)?;

        // Hosting platforms hand out the dashboard port through $PORT
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.dashboard.bind.set_port(port);
        }

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.bot.prefix.trim().is_empty() {
            anyhow::bail!("[bot] prefix must not be empty");
        }
        if self.stats.flush_delay_secs == 0 {
            anyhow::bail!("[stats] flush_delay_secs must be at least 1");
        }
        Ok(())
    }

    /// Add the bot's own account to the admin set (owner auto-admin).
    /// Returns true when the set changed.
    pub fn promote_owner(&mut self, own_id: &str) -> bool {
        self.bot.admins.insert(own_id.to_string())
    }
}
