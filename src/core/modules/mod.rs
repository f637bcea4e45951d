// Module system: the hub, the module contract and the built-in core module.

pub mod chat_client;
pub mod command;
pub mod core_module;
pub mod module_base;
pub mod module_hub;
pub mod module_models;
pub mod module_state;

#[cfg(test)]
pub mod test_support;

pub use chat_client::{ChatClient, ClientError};
pub use command::{Command, CommandContext, CommandTable};
pub use module_base::{Module, ModuleDeps, ModuleError, ModuleResult};
pub use module_hub::{HubConfig, ModuleHub};
pub use module_models::{InboundInteraction, InboundMessage, ModuleDescriptor};
