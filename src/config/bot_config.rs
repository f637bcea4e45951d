// Startup configuration, read from the environment once in `main`.
// Nothing below `main` reads environment variables.

use crate::core::modules::HubConfig;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0} environment variable! Create a .env file with your bot token.")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Json,
    /// Nothing persists; for local development.
    Memory,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    /// User allowed to run operator-only diagnostics.
    pub bot_owner_id: Option<u64>,
    /// Channel that receives the startup notice.
    pub debug_channel_id: Option<u64>,
    pub environment: Option<String>,
    pub stream_url: Option<String>,
    pub data_dir: PathBuf,
    pub storage_backend: StorageBackend,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Empty values count as unset, which is what an empty line in .env means
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let storage_backend = match get("STORAGE_BACKEND").as_deref() {
            None | Some("sqlite") => StorageBackend::Sqlite,
            Some("json") => StorageBackend::Json,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            discord_token,
            bot_owner_id: parse_id("BOT_OWNER_ID", get("BOT_OWNER_ID"))?,
            debug_channel_id: parse_id("DEBUG_CHANNEL_ID", get("DEBUG_CHANNEL_ID"))?,
            environment: get("ENVIRONMENT"),
            stream_url: get("STREAM_URL"),
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data")),
            storage_backend,
        })
    }

    /// Deployed anywhere but a developer machine.
    pub fn is_deployed(&self) -> bool {
        matches!(self.environment.as_deref(), Some(env) if env != "development")
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            operator_id: self.bot_owner_id,
            package_name: env!("CARGO_PKG_NAME").to_string(),
            package_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn parse_id(name: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    value
        .map(|v| v.parse().map_err(|_| ConfigError::Invalid { name, value: v }))
        .transpose()
}
