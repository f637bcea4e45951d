// Guild-scoped key/value persistence contract.
//
// The module system only ever stores short strings per guild (the disabled
// module list, the moderator role), so values are opaque text. Concrete
// engines live in `infra/storage`.

use async_trait::async_trait;
use thiserror::Error;

/// Keys the module system persists for every guild.
pub mod keys {
    /// Comma-joined names of the modules disabled in a guild.
    pub const DISABLED_MODULES: &str = "disabled-modules";
    /// Role ID whose holders may run moderator-only commands.
    pub const MOD_ROLE: &str = "mod-role";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Record `{key}` already exists for guild {guild_id}")]
    AlreadyExists { guild_id: u64, key: String },
}

/// Storage adapter consumed by the module hub and by feature modules.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value, `None` if the guild has no record under `key`.
    async fn read(&self, guild_id: u64, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert a new record. Fails with `AlreadyExists` if one is present.
    async fn create(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError>;

    /// Write a record, inserting it when it does not exist yet.
    async fn update(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a record. Removing a missing record is not an error.
    async fn delete(&self, guild_id: u64, key: &str) -> Result<(), StoreError>;
}
