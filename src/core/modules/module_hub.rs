// Module hub - owns the registered modules and the per-guild module state,
// and walks every inbound event through the modules in registration order.
//
// Modules never hold a reference back to the hub. The hub hands itself to
// each hook call instead, which keeps ownership a simple tree.

use super::chat_client::ChatClient;
use super::core_module::CoreModule;
use super::module_base::{Module, ModuleDeps, ModuleResult};
use super::module_models::{Dispatch, InboundInteraction, InboundMessage, ModuleDescriptor};
use super::module_state::ModuleStateCache;
use crate::core::storage::{keys, KvStore, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Module `{0}` is registered more than once")]
    DuplicateModule(String),
}

/// Settings the hub and its built-in commands need, handed over at bootstrap.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// The only user allowed to run operator diagnostics such as `server-count`.
    pub operator_id: Option<u64>,
    pub package_name: String,
    pub package_version: String,
}

pub struct ModuleHubBuilder {
    deps: ModuleDeps,
    config: HubConfig,
    modules: Vec<Box<dyn Module>>,
}

impl ModuleHubBuilder {
    /// Construct a module and append it to the dispatch order.
    pub fn add_module<M, F>(mut self, build: F) -> Result<Self, HubError>
    where
        M: Module + 'static,
        F: FnOnce(&ModuleDeps) -> M,
    {
        let module = build(&self.deps);
        let name = module.descriptor().name;

        if self.modules.iter().any(|m| m.descriptor().name == name) {
            return Err(HubError::DuplicateModule(name.to_string()));
        }

        tracing::info!(module = name, "Registering module");
        self.modules.push(Box::new(module));
        Ok(self)
    }

    pub fn build(self) -> Arc<ModuleHub> {
        Arc::new(ModuleHub {
            module_state: ModuleStateCache::new(Arc::clone(&self.deps.store)),
            deps: self.deps,
            config: self.config,
            modules: self.modules,
            ready: AtomicBool::new(false),
        })
    }
}

pub struct ModuleHub {
    deps: ModuleDeps,
    config: HubConfig,
    modules: Vec<Box<dyn Module>>,
    module_state: ModuleStateCache,
    ready: AtomicBool,
}

impl ModuleHub {
    /// Start a hub. The core module is always registered first so that its
    /// administrative commands cannot be shadowed.
    pub fn builder(
        client: Arc<dyn ChatClient>,
        store: Arc<dyn KvStore>,
        config: HubConfig,
    ) -> ModuleHubBuilder {
        let deps = ModuleDeps { client, store };
        let core = CoreModule::new(&deps);

        ModuleHubBuilder {
            deps,
            config,
            modules: vec![Box::new(core)],
        }
    }

    pub fn client(&self) -> &dyn ChatClient {
        self.deps.client.as_ref()
    }

    pub fn store(&self) -> &dyn KvStore {
        self.deps.store.as_ref()
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Registered modules in dispatch order.
    pub fn modules(&self) -> impl Iterator<Item = &dyn Module> {
        self.modules.iter().map(|m| m.as_ref())
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.iter().map(|m| m.descriptor())
    }

    pub fn find_module(&self, name: &str) -> Option<&dyn Module> {
        self.modules().find(|m| m.descriptor().name == name)
    }

    /// Run every module's `init` once, in registration order.
    pub async fn ready(self: &Arc<Self>) {
        if self.ready.swap(true, Ordering::SeqCst) {
            tracing::debug!("Module hub already initialised, ignoring repeated ready signal");
            return;
        }

        for module in &self.modules {
            let name = module.descriptor().name;
            if let Err(e) = module.init(self).await {
                tracing::error!(module = name, "Module init failed: {}", e);
            }
        }

        tracing::info!(modules = self.modules.len(), "Module hub ready");
    }

    /// Offer a message to each module until one handles it.
    ///
    /// Returns the name of the module that handled the message, or `None` when
    /// no module claimed it.
    pub async fn handle(self: &Arc<Self>, message: &InboundMessage) -> Option<&'static str> {
        for module in &self.modules {
            let name = module.descriptor().name;
            match module.dispatch(self, message).await {
                Ok(Dispatch::Handled) => {
                    tracing::debug!(module = name, message_id = message.id, "Message handled");
                    return Some(name);
                }
                Ok(Dispatch::Pass) => {}
                Err(e) => {
                    // One faulty module must not starve the rest of the chain
                    tracing::error!(
                        module = name,
                        message_id = message.id,
                        "Dispatch failed: {}",
                        e
                    );
                }
            }
        }

        None
    }

    /// Offer an interaction to each active module until one handles it.
    pub async fn handle_interaction(
        self: &Arc<Self>,
        interaction: &InboundInteraction,
    ) -> Option<&'static str> {
        tracing::debug!(
            user_id = interaction.user_id,
            channel_id = interaction.channel_id,
            custom_id = %interaction.custom_id,
            "Routing interaction"
        );

        for module in &self.modules {
            let descriptor = module.descriptor();

            if let (Some(guild_id), false) = (interaction.guild_id, descriptor.always_activated) {
                match self.is_module_disabled(guild_id, descriptor.name).await {
                    Ok(true) => continue,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(
                            module = descriptor.name,
                            "Failed to read module state: {}",
                            e
                        );
                        continue;
                    }
                }
            }

            match module.handle_interaction(self, interaction).await {
                Ok(Dispatch::Handled) => return Some(descriptor.name),
                Ok(Dispatch::Pass) => {}
                Err(e) => {
                    tracing::error!(module = descriptor.name, "Interaction dispatch failed: {}", e);
                }
            }
        }

        None
    }

    pub async fn get_disabled_modules(
        &self,
        guild_id: u64,
        force: bool,
    ) -> Result<Vec<String>, StoreError> {
        self.module_state.get_disabled_modules(guild_id, force).await
    }

    pub async fn disable_module(&self, guild_id: u64, module_name: &str) -> Result<(), StoreError> {
        self.module_state.disable_module(guild_id, module_name).await?;
        tracing::info!(guild_id, module = module_name, "Module disabled");
        Ok(())
    }

    pub async fn enable_module(&self, guild_id: u64, module_name: &str) -> Result<(), StoreError> {
        self.module_state.enable_module(guild_id, module_name).await?;
        tracing::info!(guild_id, module = module_name, "Module enabled");
        Ok(())
    }

    pub async fn is_module_disabled(
        &self,
        guild_id: u64,
        module_name: &str,
    ) -> Result<bool, StoreError> {
        Ok(self
            .get_disabled_modules(guild_id, false)
            .await?
            .iter()
            .any(|name| name == module_name))
    }

    pub async fn moderator_role(&self, guild_id: u64) -> Result<Option<u64>, StoreError> {
        let role = self.store().read(guild_id, keys::MOD_ROLE).await?;
        Ok(role.and_then(|id| id.parse().ok()))
    }

    pub async fn set_moderator_role(&self, guild_id: u64, role_id: u64) -> Result<(), StoreError> {
        self.store()
            .update(guild_id, keys::MOD_ROLE, &role_id.to_string())
            .await?;
        tracing::info!(guild_id, role_id, "Moderator role set");
        Ok(())
    }

    /// Whether the author may run moderator-only commands: they hold the
    /// guild's moderator role or own the guild. Never true outside a guild.
    pub async fn is_moderator(&self, message: &InboundMessage) -> ModuleResult<bool> {
        let Some(guild_id) = message.guild_id else {
            return Ok(false);
        };

        if let Some(role_id) = self.moderator_role(guild_id).await? {
            if message.author_roles.contains(&role_id) {
                return Ok(true);
            }
        }

        match self.client().guild_owner(guild_id).await {
            Ok(owner_id) => Ok(owner_id == message.author_id),
            Err(e) => {
                tracing::warn!(guild_id, "Failed to look up guild owner: {}", e);
                Ok(false)
            }
        }
    }
}
