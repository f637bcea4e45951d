// Command tables.
//
// Every module builds its table once at construction. Handlers are async and
// receive an owned `CommandContext`, so they can hold the hub across awaits.

use super::module_base::{ModuleError, ModuleResult};
use super::module_hub::ModuleHub;
use super::module_models::InboundMessage;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased async command handler.
pub type CommandHandler =
    Arc<dyn Fn(CommandContext) -> BoxFuture<'static, ModuleResult> + Send + Sync>;

/// Everything a handler gets to work with for one invocation.
pub struct CommandContext {
    pub hub: Arc<ModuleHub>,
    pub message: InboundMessage,
    /// Command name with any module prefix already stripped.
    pub command: String,
}

impl CommandContext {
    pub fn guild_id(&self) -> Option<u64> {
        self.message.guild_id
    }

    /// Positional argument after the command token (0-based).
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.message.arg(index)
    }

    /// Reply in the channel the command was issued in.
    pub async fn reply(&self, content: impl AsRef<str>) -> ModuleResult {
        self.hub
            .client()
            .reply(&self.message, content.as_ref())
            .await
            .map_err(ModuleError::from)
    }
}

pub struct Command {
    only_mods: bool,
    handler: CommandHandler,
}

impl Command {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ModuleResult> + Send + 'static,
    {
        Self {
            only_mods: false,
            handler: Arc::new(move |ctx: CommandContext| -> BoxFuture<'static, ModuleResult> {
                Box::pin(handler(ctx))
            }),
        }
    }

    /// Restrict the command to guild moderators.
    pub fn only_mods(mut self) -> Self {
        self.only_mods = true;
        self
    }

    pub fn is_mod_only(&self) -> bool {
        self.only_mods
    }

    pub fn run(&self, ctx: CommandContext) -> BoxFuture<'static, ModuleResult> {
        (self.handler)(ctx)
    }
}

/// Name-keyed commands of one module.
#[derive(Default)]
pub struct CommandTable {
    commands: HashMap<String, Command>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `register`.
    pub fn with(mut self, name: impl Into<String>, command: Command) -> Self {
        self.register(name, command);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, command: Command) {
        let name = name.into();
        if self.commands.insert(name.clone(), command).is_some() {
            tracing::warn!(command = %name, "Command registered twice, keeping the last one");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }
}
