// Test doubles for the module system: an in-memory store with failure
// switches and a chat client that records what it was asked to send.

use super::chat_client::{ChatClient, ClientError};
use super::module_models::InboundMessage;
use crate::core::storage::{KvStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

pub struct MockKvStore {
    records: DashMap<(u64, String), String>,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockKvStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            writes: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn value(&self, guild_id: u64, key: &str) -> Option<String> {
        self.records.get(&(guild_id, key.to_string())).map(|v| v.clone())
    }

    /// Number of successful create/update/delete calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("write refused".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl KvStore for MockKvStore {
    async fn read(&self, guild_id: u64, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database("read refused".to_string()));
        }
        Ok(self.value(guild_id, key))
    }

    async fn create(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError> {
        if self.records.contains_key(&(guild_id, key.to_string())) {
            return Err(StoreError::AlreadyExists {
                guild_id,
                key: key.to_string(),
            });
        }
        self.check_write()?;
        self.records.insert((guild_id, key.to_string()), value.to_string());
        Ok(())
    }

    async fn update(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.records.insert((guild_id, key.to_string()), value.to_string());
        Ok(())
    }

    async fn delete(&self, guild_id: u64, key: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.records.remove(&(guild_id, key.to_string()));
        Ok(())
    }
}

/// Store whose reads suspend once before completing, so concurrent callers
/// interleave at the read.
pub struct YieldingKvStore {
    inner: MockKvStore,
}

impl YieldingKvStore {
    pub fn new() -> Self {
        Self {
            inner: MockKvStore::new(),
        }
    }
}

#[async_trait]
impl KvStore for YieldingKvStore {
    async fn read(&self, guild_id: u64, key: &str) -> Result<Option<String>, StoreError> {
        let value = self.inner.read(guild_id, key).await;
        tokio::task::yield_now().await;
        value
    }

    async fn create(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.create(guild_id, key, value).await
    }

    async fn update(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.update(guild_id, key, value).await
    }

    async fn delete(&self, guild_id: u64, key: &str) -> Result<(), StoreError> {
        self.inner.delete(guild_id, key).await
    }
}

/// Store whose first read takes its snapshot and then waits for
/// `release_read`, so a caller can slip other work in behind a stale read.
pub struct GatedKvStore {
    inner: MockKvStore,
    gate_armed: AtomicBool,
    started: Notify,
    release: Notify,
}

impl GatedKvStore {
    pub fn new() -> Self {
        Self {
            inner: MockKvStore::new(),
            gate_armed: AtomicBool::new(true),
            started: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn inner(&self) -> &MockKvStore {
        &self.inner
    }

    /// Wait until the gated read has taken its snapshot.
    pub async fn read_started(&self) {
        self.started.notified().await;
    }

    pub fn release_read(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl KvStore for GatedKvStore {
    async fn read(&self, guild_id: u64, key: &str) -> Result<Option<String>, StoreError> {
        let snapshot = self.inner.read(guild_id, key).await;
        if self.gate_armed.swap(false, Ordering::SeqCst) {
            self.started.notify_one();
            self.release.notified().await;
        }
        snapshot
    }

    async fn create(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.create(guild_id, key, value).await
    }

    async fn update(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.update(guild_id, key, value).await
    }

    async fn delete(&self, guild_id: u64, key: &str) -> Result<(), StoreError> {
        self.inner.delete(guild_id, key).await
    }
}

pub struct MockChatClient {
    pub replies: Mutex<Vec<String>>,
    pub channel_messages: Mutex<Vec<(u64, String)>>,
    // Guild ID -> role IDs
    pub roles: DashMap<u64, Vec<u64>>,
    // Guild ID -> owner user ID
    pub owners: DashMap<u64, u64>,
    pub guild_count: AtomicUsize,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            channel_messages: Mutex::new(Vec::new()),
            roles: DashMap::new(),
            owners: DashMap::new(),
            guild_count: AtomicUsize::new(0),
        }
    }

    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }

    pub fn last_reply(&self) -> Option<String> {
        self.replies.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn reply(&self, _message: &InboundMessage, content: &str) -> Result<(), ClientError> {
        self.replies.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn send_to_channel(&self, channel_id: u64, content: &str) -> Result<(), ClientError> {
        self.channel_messages
            .lock()
            .unwrap()
            .push((channel_id, content.to_string()));
        Ok(())
    }

    async fn guild_roles(&self, guild_id: u64) -> Result<Vec<u64>, ClientError> {
        Ok(self.roles.get(&guild_id).map(|r| r.clone()).unwrap_or_default())
    }

    async fn guild_owner(&self, guild_id: u64) -> Result<u64, ClientError> {
        self.owners
            .get(&guild_id)
            .map(|o| *o)
            .ok_or_else(|| ClientError::Api(format!("Unknown guild {}", guild_id)))
    }

    async fn guild_count(&self) -> Result<usize, ClientError> {
        Ok(self.guild_count.load(Ordering::SeqCst))
    }
}

pub const GUILD: u64 = 1000;
pub const MOD_ROLE: u64 = 123;
pub const MODERATOR: u64 = 7;
pub const MEMBER: u64 = 8;
pub const OPERATOR: u64 = 9;

/// Guild message from a user holding `roles`.
pub fn guild_message(author_id: u64, roles: &[u64], content: &str) -> InboundMessage {
    InboundMessage {
        id: 1,
        channel_id: 2,
        guild_id: Some(GUILD),
        author_id,
        author_roles: roles.to_vec(),
        content: content.to_string(),
        created_at: Utc::now(),
    }
}

/// Guild message from a moderator.
pub fn mod_message(content: &str) -> InboundMessage {
    guild_message(MODERATOR, &[MOD_ROLE], content)
}
