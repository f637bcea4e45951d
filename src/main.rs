// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Module system and feature modules (platform-agnostic)
// - `infra/` = Implementations of core traits (settings storage)
// - `discord/` = Discord-specific adapters (client, events, presence)
// - `config/` = Environment configuration
//
// This file's job is to:
// 1. Load configuration
// 2. Pick a storage backend
// 3. Build the module hub once Discord reports ready
// 4. Route gateway events into the hub

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "config/bot_config.rs"]
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::config::{BotConfig, StorageBackend};
use crate::core::modules::ModuleHub;
use crate::core::storage::KvStore;
use crate::core::timezones::TimezoneModule;
use crate::discord::client::SerenityChatClient;
use crate::discord::{events, presence, Data, Error};
use crate::infra::storage::{InMemoryKvStore, JsonKvStore, SqliteKvStore};
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

async fn open_store(config: &BotConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data directory {}", config.data_dir.display()))?;

    let store: Arc<dyn KvStore> = match config.storage_backend {
        StorageBackend::Sqlite => {
            let path = config.data_dir.join("settings.db");
            Arc::new(SqliteKvStore::new(&path.to_string_lossy()).await?)
        }
        StorageBackend::Json => Arc::new(JsonKvStore::new(config.data_dir.join("settings.json"))?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory settings storage, nothing will survive a restart");
            Arc::new(InMemoryKvStore::new())
        }
    };

    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BotConfig::from_env()?;
    let store = open_store(&config).await.context("Failed to open settings storage")?;

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT; // Required to read message content

    let setup_config = config.clone();
    let framework = poise::Framework::<Data, Error>::builder()
        .options(poise::FrameworkOptions {
            // Modules parse their own commands from message content
            commands: vec![],
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, _framework| {
            Box::pin(async move {
                tracing::info!(
                    user = %ready.user.name,
                    guilds = ready.guilds.len(),
                    "Connected to Discord"
                );

                // ====================================================================
                // DEPENDENCY INJECTION
                // ====================================================================
                // The composition root: the core module is added by the builder,
                // feature modules follow in dispatch order.
                let client = Arc::new(SerenityChatClient::new(ctx.http.clone()));
                let hub_config = setup_config.hub_config();
                let hub = ModuleHub::builder(client, store, hub_config.clone())
                    .add_module(TimezoneModule::new)?
                    .build();

                hub.ready().await;

                presence::on_ready(
                    ctx,
                    &hub_config.package_name,
                    setup_config.stream_url.as_deref(),
                );

                if let (true, Some(channel_id)) =
                    (setup_config.is_deployed(), setup_config.debug_channel_id)
                {
                    let notice = presence::startup_notice(&hub_config);
                    if let Err(e) = hub.client().send_to_channel(channel_id, &notice).await {
                        tracing::warn!(channel_id, "Failed to post startup notice: {}", e);
                    }
                }

                tracing::info!("Bot is ready");
                Ok(Data { hub })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
