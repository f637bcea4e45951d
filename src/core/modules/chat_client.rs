// The narrow slice of the chat platform the module system depends on.
//
// Implemented over serenity in `discord/client/serenity_client.rs` and by mocks in
// tests.

use super::module_models::InboundMessage;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Discord API error: {0}")]
    Api(String),
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Reply to a message in its channel.
    async fn reply(&self, message: &InboundMessage, content: &str) -> Result<(), ClientError>;

    /// Post a message to an arbitrary channel.
    async fn send_to_channel(&self, channel_id: u64, content: &str) -> Result<(), ClientError>;

    /// IDs of every role in a guild.
    async fn guild_roles(&self, guild_id: u64) -> Result<Vec<u64>, ClientError>;

    /// User ID of the guild owner.
    async fn guild_owner(&self, guild_id: u64) -> Result<u64, ClientError>;

    /// Number of guilds the bot is a member of.
    async fn guild_count(&self) -> Result<usize, ClientError>;
}
