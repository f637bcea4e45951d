// The contract every feature module satisfies.
//
// A module is built once at registration from `ModuleDeps`, initialised once
// after the platform reports ready, and then offered every inbound message in
// registration order until one of them returns `Dispatch::Handled`.

use super::chat_client::{ChatClient, ClientError};
use super::command::{CommandContext, CommandTable};
use super::module_hub::ModuleHub;
use super::module_models::{Dispatch, InboundInteraction, InboundMessage, ModuleDescriptor};
use crate::core::storage::{KvStore, StoreError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Reply sent when a claimed command fails for a reason the user cannot fix.
pub const GENERIC_FAILURE_REPLY: &str =
    "Something went wrong while running that command. Please try again later.";

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Module error: {0}")]
    Other(String),
}

pub type ModuleResult<T = ()> = Result<T, ModuleError>;

/// Collaborators handed to a module when it is constructed.
#[derive(Clone)]
pub struct ModuleDeps {
    pub client: Arc<dyn ChatClient>,
    pub store: Arc<dyn KvStore>,
}

#[async_trait]
pub trait Module: Send + Sync {
    fn descriptor(&self) -> &ModuleDescriptor;

    fn commands(&self) -> &CommandTable;

    /// One-time setup after the platform is ready. Long work should be spawned
    /// rather than awaited here, since modules are initialised in sequence.
    async fn init(&self, _hub: &Arc<ModuleHub>) -> ModuleResult {
        Ok(())
    }

    /// Decide whether this module owns `message`.
    async fn dispatch(
        &self,
        hub: &Arc<ModuleHub>,
        message: &InboundMessage,
    ) -> ModuleResult<Dispatch> {
        dispatch_command(self.descriptor(), self.commands(), hub, message).await
    }

    async fn handle_interaction(
        &self,
        _hub: &Arc<ModuleHub>,
        _interaction: &InboundInteraction,
    ) -> ModuleResult<Dispatch> {
        Ok(Dispatch::Pass)
    }
}

/// Command-table dispatch used by `Module::dispatch` unless a module overrides it.
pub async fn dispatch_command(
    descriptor: &ModuleDescriptor,
    commands: &CommandTable,
    hub: &Arc<ModuleHub>,
    message: &InboundMessage,
) -> ModuleResult<Dispatch> {
    let Some(name) = message
        .command_token()
        .and_then(|token| descriptor.command_name(token))
    else {
        return Ok(Dispatch::Pass);
    };

    let Some(command) = commands.get(name) else {
        return Ok(Dispatch::Pass);
    };

    if !descriptor.always_activated {
        if let Some(guild_id) = message.guild_id {
            if hub.is_module_disabled(guild_id, descriptor.name).await? {
                tracing::debug!(
                    guild_id,
                    module = descriptor.name,
                    command = name,
                    "Module disabled, passing"
                );
                return Ok(Dispatch::Pass);
            }
        }
    }

    if command.is_mod_only() && !hub.is_moderator(message).await? {
        tracing::debug!(
            user_id = message.author_id,
            module = descriptor.name,
            command = name,
            "Sender is not a moderator, passing"
        );
        return Ok(Dispatch::Pass);
    }

    let ctx = CommandContext {
        hub: Arc::clone(hub),
        message: message.clone(),
        command: name.to_string(),
    };

    if let Err(e) = command.run(ctx).await {
        tracing::error!(module = descriptor.name, command = name, "Command failed: {}", e);
        if let Err(e) = hub.client().reply(message, GENERIC_FAILURE_REPLY).await {
            tracing::warn!("Failed to send failure reply: {}", e);
        }
    }

    Ok(Dispatch::Handled)
}
