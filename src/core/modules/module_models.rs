// Module system domain models.
//
// These are pure domain types with no Discord dependencies. The Discord layer
// converts serenity events into `InboundMessage` / `InboundInteraction`.

use chrono::{DateTime, Utc};

/// Static metadata attached to a module type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// Unique module name, used as the enable/disable key.
    pub name: &'static str,
    /// Always-activated modules can never be disabled.
    pub always_activated: bool,
    /// Prefix glued in front of every command of this module (`tz:list`).
    pub command_prefix: Option<&'static str>,
}

impl ModuleDescriptor {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            always_activated: false,
            command_prefix: None,
        }
    }

    pub const fn always_activated(mut self) -> Self {
        self.always_activated = true;
        self
    }

    pub const fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.command_prefix = Some(prefix);
        self
    }

    /// Name as shown in module listings: `name` or `name (prefix)`.
    pub fn display_name(&self) -> String {
        match self.command_prefix {
            Some(prefix) => format!("{} ({})", self.name, prefix),
            None => self.name.to_string(),
        }
    }

    /// Resolve the command name a token refers to for this module.
    ///
    /// Without a prefix the token is the command name. With a prefix the token
    /// must start with it and the rest is the command name.
    pub fn command_name<'a>(&self, token: &'a str) -> Option<&'a str> {
        match self.command_prefix {
            Some(prefix) => token.strip_prefix(prefix).filter(|rest| !rest.is_empty()),
            None => Some(token),
        }
    }
}

/// Outcome of offering a message to one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The module consumed the message; the chain stops.
    Handled,
    /// The module did not claim the message; the next module gets it.
    Pass,
}

/// A chat message as seen by the module system.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: u64,
    pub channel_id: u64,
    /// `None` for direct messages.
    pub guild_id: Option<u64>,
    pub author_id: u64,
    /// Role IDs the author holds in the guild.
    pub author_roles: Vec<u64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl InboundMessage {
    /// First whitespace-delimited token of the content.
    pub fn command_token(&self) -> Option<&str> {
        self.content.split_whitespace().next()
    }

    /// Positional argument after the command token (0-based).
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.content.split_whitespace().nth(index + 1)
    }
}

/// A component interaction (button press, select menu) routed to modules.
#[derive(Debug, Clone)]
pub struct InboundInteraction {
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub user_id: u64,
    pub custom_id: String,
}
