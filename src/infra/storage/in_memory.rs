// In-memory `KvStore`. Nothing survives a restart, so this is for local
// development and tests.

use crate::core::storage::{KvStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;

/// Composite key: values are scoped per guild.
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
struct GuildKey {
    guild_id: u64,
    key: String,
}

impl GuildKey {
    fn new(guild_id: u64, key: &str) -> Self {
        Self {
            guild_id,
            key: key.to_string(),
        }
    }
}

pub struct InMemoryKvStore {
    data: DashMap<GuildKey, String>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self { data: DashMap::new() }
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn read(&self, guild_id: u64, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.data.get(&GuildKey::new(guild_id, key)).map(|v| v.clone()))
    }

    async fn create(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError> {
        use dashmap::mapref::entry::Entry;

        match self.data.entry(GuildKey::new(guild_id, key)) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                guild_id,
                key: key.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                Ok(())
            }
        }
    }

    async fn update(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError> {
        self.data.insert(GuildKey::new(guild_id, key), value.to_string());
        Ok(())
    }

    async fn delete(&self, guild_id: u64, key: &str) -> Result<(), StoreError> {
        self.data.remove(&GuildKey::new(guild_id, key));
        Ok(())
    }
}
