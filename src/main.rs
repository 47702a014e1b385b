mod commands;
mod config;
mod dashboard;
mod dispatch;
mod events;
mod lang;
mod platform;
mod scheduler;
mod stats;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dispatch::Pipeline;
use crate::lang::Lang;
use crate::platform::telegram::{self, TelegramTransport};
use crate::platform::Transport;
use crate::scheduler::Heartbeat;
use crate::stats::store::StatsStore;
use crate::stats::Stats;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cmdbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Prefix: {}", config.bot.prefix);
    info!("  Admins: {}", config.bot.admins.len());
    info!("  Moderators: {}", config.bot.moderators.len());
    info!("  Bare unknown text: {}", config.bot.bare_unknown);

    let lang = Lang::load(&config.bot.language, config.bot.language_file.as_deref())?;
    info!("Language: {}", lang.code());

    // Load persisted counters
    let store = StatsStore::open(&config.stats.database_path)?;
    let initial = store.load_or_create().await?;
    info!("Stats loaded: {} messages so far", initial.total_messages);
    let stats = Arc::new(Stats::new(
        initial,
        Arc::new(store),
        config.stats.flush_delay(),
    ));

    // Log in; the bot's own account always counts as a bot admin
    let transport = Arc::new(TelegramTransport::connect(&config.telegram.bot_token).await?);
    if config.promote_owner(transport.own_id()) {
        info!("Owner {} added as admin", transport.own_id());
    }
    let config = Arc::new(config);

    let registry = commands::builtin_registry();
    let events = events::builtin_events(&lang);
    let bot = transport.bot();
    let pipeline = Arc::new(Pipeline::new(
        transport,
        Arc::clone(&config),
        registry,
        events,
        lang,
        Arc::clone(&stats),
    ));

    dashboard::spawn(&config.dashboard, Arc::clone(&pipeline));

    let heartbeat = Heartbeat::new(&config.scheduler.heartbeat_cron, Arc::clone(&stats)).await?;
    heartbeat.start().await?;

    info!("Bot is starting...");
    telegram::run(pipeline, bot).await?;

    // Ctrl-C: write out anything still waiting on the debounce timer
    info!("Shutting down...");
    stats.flush().await;
    if let Err(e) = heartbeat.stop().await {
        warn!("{:#}", e);
    }

    Ok(())
}
