// `ChatClient` over serenity's HTTP client.

use crate::core::modules::{ChatClient, ClientError, InboundMessage};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Guilds fetched per page when counting; the API maximum.
const GUILD_PAGE_SIZE: u64 = 200;

pub struct SerenityChatClient {
    http: Arc<serenity::Http>,
}

impl SerenityChatClient {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

fn api_error(e: serenity::Error) -> ClientError {
    ClientError::Api(e.to_string())
}

#[async_trait]
impl ChatClient for SerenityChatClient {
    async fn reply(&self, message: &InboundMessage, content: &str) -> Result<(), ClientError> {
        let channel_id = serenity::ChannelId::new(message.channel_id);
        let builder = serenity::CreateMessage::new()
            .content(content)
            .reference_message((channel_id, serenity::MessageId::new(message.id)));

        channel_id
            .send_message(&self.http, builder)
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn send_to_channel(&self, channel_id: u64, content: &str) -> Result<(), ClientError> {
        serenity::ChannelId::new(channel_id)
            .say(&self.http, content)
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn guild_roles(&self, guild_id: u64) -> Result<Vec<u64>, ClientError> {
        let roles = serenity::GuildId::new(guild_id)
            .roles(&self.http)
            .await
            .map_err(api_error)?;

        Ok(roles.keys().map(|id| id.get()).collect())
    }

    async fn guild_owner(&self, guild_id: u64) -> Result<u64, ClientError> {
        let guild = serenity::GuildId::new(guild_id)
            .to_partial_guild(&self.http)
            .await
            .map_err(api_error)?;

        Ok(guild.owner_id.get())
    }

    async fn guild_count(&self) -> Result<usize, ClientError> {
        let mut count = 0;
        let mut after = None;

        loop {
            let page = self
                .http
                .get_guilds(after.map(serenity::GuildPagination::After), Some(GUILD_PAGE_SIZE))
                .await
                .map_err(api_error)?;

            count += page.len();
            match page.last() {
                Some(last) if page.len() as u64 == GUILD_PAGE_SIZE => after = Some(last.id),
                _ => break,
            }
        }

        Ok(count)
    }
}
