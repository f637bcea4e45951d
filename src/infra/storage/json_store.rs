use crate::core::storage::{KvStore, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// JSON-file `KvStore`. Everything lives in one file shaped as
/// { guild_id: { key: value } } and is rewritten after each change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct JsonStoreData {
    pub guilds: HashMap<u64, HashMap<String, String>>,
}

pub struct JsonKvStore {
    path: PathBuf,
    cache: RwLock<JsonStoreData>,
}

impl JsonKvStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let cache: JsonStoreData = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            serde_json::from_reader(reader)?
        } else {
            JsonStoreData::default()
        };

        tracing::info!(path = %path.display(), "Opened JSON settings store");

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    async fn persist(&self, data: &JsonStoreData) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(data)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Apply `change` to a copy of the data, write the copy, and only then
    /// make it visible. A failed write leaves readers on the last saved state.
    async fn commit<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut JsonStoreData) -> Result<bool, StoreError>,
    {
        // The write lock is held until the file is written so that saves never
        // land out of order
        let mut cache = self.cache.write().await;
        let mut staged = cache.clone();

        if !change(&mut staged)? {
            return Ok(());
        }

        self.persist(&staged).await?;
        *cache = staged;
        Ok(())
    }
}

#[async_trait]
impl KvStore for JsonKvStore {
    async fn read(&self, guild_id: u64, key: &str) -> Result<Option<String>, StoreError> {
        let cache = self.cache.read().await;
        Ok(cache.guilds.get(&guild_id).and_then(|g| g.get(key)).cloned())
    }

    async fn create(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError> {
        self.commit(|data| {
            let guild = data.guilds.entry(guild_id).or_default();
            if guild.contains_key(key) {
                return Err(StoreError::AlreadyExists {
                    guild_id,
                    key: key.to_string(),
                });
            }
            guild.insert(key.to_string(), value.to_string());
            Ok(true)
        })
        .await
    }

    async fn update(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError> {
        self.commit(|data| {
            data.guilds
                .entry(guild_id)
                .or_default()
                .insert(key.to_string(), value.to_string());
            Ok(true)
        })
        .await
    }

    async fn delete(&self, guild_id: u64, key: &str) -> Result<(), StoreError> {
        // Nothing to write when the record is already gone
        self.commit(|data| {
            Ok(data
                .guilds
                .get_mut(&guild_id)
                .and_then(|g| g.remove(key))
                .is_some())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_json_persistence_roundtrip() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_owned();
        drop(tmp);

        let store = JsonKvStore::new(path.clone()).unwrap();
        store.update(7, "disabled-modules", "timezones").await.unwrap();
        store.create(7, "mod-role", "123").await.unwrap();
        store.update(8, "mod-role", "456").await.unwrap();
        store.delete(8, "mod-role").await.unwrap();

        // Reload from file
        let store2 = JsonKvStore::new(path.clone()).unwrap();
        assert_eq!(
            store2.read(7, "disabled-modules").await.unwrap().as_deref(),
            Some("timezones")
        );
        assert_eq!(store2.read(7, "mod-role").await.unwrap().as_deref(), Some("123"));
        assert_eq!(store2.read(8, "mod-role").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_refuses_existing_record() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_owned();
        drop(tmp);

        let store = JsonKvStore::new(path).unwrap();
        store.create(1, "k", "a").await.unwrap();
        assert!(matches!(
            store.create(1, "k", "b").await,
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "not json").unwrap();

        assert!(matches!(
            JsonKvStore::new(tmp.path()),
            Err(StoreError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_is_not_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("settings.json");

        let store = JsonKvStore::new(path).unwrap();

        assert!(matches!(
            store.update(1, "disabled-modules", "a").await,
            Err(StoreError::Io(_))
        ));
        assert_eq!(store.read(1, "disabled-modules").await.unwrap(), None);

        assert!(store.create(1, "mod-role", "123").await.is_err());
        assert_eq!(store.read(1, "mod-role").await.unwrap(), None);
    }
}
