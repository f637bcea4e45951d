// Discord layer - serenity adapters for the module system.

#[path = "client/serenity_client.rs"]
pub mod client;

#[path = "events/events.rs"]
pub mod events;

#[path = "presence.rs"]
pub mod presence;

use crate::core::modules::ModuleHub;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Data shared with every framework callback.
pub struct Data {
    pub hub: Arc<ModuleHub>,
}
