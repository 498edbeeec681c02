mod bot;
mod commands;
mod config;
mod lock;
mod matcher;
mod store;
mod telegram;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::Bot;
use crate::config::Config;
use crate::telegram::BotApi;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,telebot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("telebot.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Poll interval: {}s", config.bot.interval);
    info!("  Admin id: {}", config.bot.admin_id);
    info!("  Initial offset: {}", config.bot.offset);

    config.ensure_directories()?;

    let transport = Arc::new(BotApi::new(&config.bot.api_url, &config.bot.secret));
    Bot::new(&config, transport).run().await
}
