// Per-guild enable/disable state.
//
// The store is the durable source of truth; `disabled` is a lazily hydrated,
// write-through projection of it. Reads prefer the cache unless `force` is
// set. Store reads and mutations for one guild are serialized by a per-guild
// mutex, and mutations always re-read the store before changing it. Cache hits
// never take the lock.

use crate::core::storage::{keys, KvStore, StoreError};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct ModuleStateCache {
    store: Arc<dyn KvStore>,
    // Guild ID -> disabled module names, in the order they were disabled
    disabled: DashMap<u64, Vec<String>>,
    // Guild ID -> mutation lock
    write_locks: DashMap<u64, Arc<Mutex<()>>>,
}

impl ModuleStateCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            disabled: DashMap::new(),
            write_locks: DashMap::new(),
        }
    }

    /// Disabled module names for a guild.
    ///
    /// Served from the cache when present and `force` is false; otherwise the
    /// persisted record is read and the cache entry replaced.
    pub async fn get_disabled_modules(
        &self,
        guild_id: u64,
        force: bool,
    ) -> Result<Vec<String>, StoreError> {
        if !force {
            if let Some(cached) = self.cached(guild_id) {
                return Ok(cached);
            }
        }

        // Hydration takes the mutation lock so a slow read can never land on
        // top of a list a mutation has just written
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        if !force {
            if let Some(cached) = self.cached(guild_id) {
                return Ok(cached);
            }
        }

        self.load(guild_id).await
    }

    /// Append `module_name` to the guild's disabled list.
    ///
    /// No membership check happens here; callers validate first.
    pub async fn disable_module(
        &self,
        guild_id: u64,
        module_name: &str,
    ) -> Result<(), StoreError> {
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        let mut disabled = self.load(guild_id).await?;
        disabled.push(module_name.to_string());

        self.persist(guild_id, disabled).await
    }

    /// Remove `module_name` from the guild's disabled list. Absent names are a no-op.
    pub async fn enable_module(
        &self,
        guild_id: u64,
        module_name: &str,
    ) -> Result<(), StoreError> {
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        let mut disabled = self.load(guild_id).await?;
        if !disabled.iter().any(|name| name == module_name) {
            return Ok(());
        }

        disabled.retain(|name| name != module_name);
        self.persist(guild_id, disabled).await
    }

    fn cached(&self, guild_id: u64) -> Option<Vec<String>> {
        self.disabled.get(&guild_id).map(|entry| entry.clone())
    }

    // Read the persisted list and replace the cache entry. Caller holds the
    // guild lock.
    async fn load(&self, guild_id: u64) -> Result<Vec<String>, StoreError> {
        let raw = self
            .store
            .read(guild_id, keys::DISABLED_MODULES)
            .await?
            .unwrap_or_default();
        let disabled = parse_module_list(&raw);

        self.disabled.insert(guild_id, disabled.clone());
        Ok(disabled)
    }

    // Store first: a failed write leaves the cache at the last persisted value.
    async fn persist(&self, guild_id: u64, disabled: Vec<String>) -> Result<(), StoreError> {
        self.store
            .update(guild_id, keys::DISABLED_MODULES, &disabled.join(","))
            .await?;
        self.disabled.insert(guild_id, disabled);
        Ok(())
    }

    fn guild_lock(&self, guild_id: u64) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }
}

/// Split a persisted comma-joined list. The empty string is the empty list.
fn parse_module_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
