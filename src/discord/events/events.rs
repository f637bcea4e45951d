// Gateway events in, hub calls out.
//
// Serenity types stop here: messages and component interactions are turned
// into the platform-neutral types the module system works with.

use super::{Data, Error};
use crate::core::modules::{InboundInteraction, InboundMessage};
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;

/// Milliseconds between the Unix epoch and the Discord epoch (2015-01-01).
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Creation time encoded in a Discord snowflake.
pub fn snowflake_created_at(id: u64) -> DateTime<Utc> {
    let millis = (id >> 22) + DISCORD_EPOCH_MS;
    DateTime::from_timestamp_millis(millis as i64).unwrap_or_else(Utc::now)
}

pub fn to_inbound_message(message: &serenity::Message) -> InboundMessage {
    InboundMessage {
        id: message.id.get(),
        channel_id: message.channel_id.get(),
        guild_id: message.guild_id.map(|id| id.get()),
        author_id: message.author.id.get(),
        author_roles: message
            .member
            .as_ref()
            .map(|member| member.roles.iter().map(|role| role.get()).collect())
            .unwrap_or_default(),
        content: message.content.clone(),
        created_at: snowflake_created_at(message.id.get()),
    }
}

pub fn to_inbound_interaction(component: &serenity::ComponentInteraction) -> InboundInteraction {
    InboundInteraction {
        guild_id: component.guild_id.map(|id| id.get()),
        channel_id: component.channel_id.get(),
        user_id: component.user.id.get(),
        custom_id: component.data.custom_id.clone(),
    }
}

/// Event handler for non-command Discord events.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            // Ignore bot messages (including our own)
            if new_message.author.bot {
                return Ok(());
            }

            let message = to_inbound_message(new_message);
            if data.hub.handle(&message).await.is_none() {
                tracing::trace!(message_id = message.id, "No module handled message");
            }
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component),
        } => {
            let interaction = to_inbound_interaction(component);
            if data.hub.handle_interaction(&interaction).await.is_some() {
                // Acknowledge so the client doesn't show "interaction failed"
                if let Err(e) = component.defer(&ctx.http).await {
                    tracing::warn!(
                        custom_id = %interaction.custom_id,
                        "Failed to acknowledge interaction: {}",
                        e
                    );
                }
            }
        }
        _ => {}
    }

    Ok(())
}
