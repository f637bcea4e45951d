// Built-in administrative module.
//
// Always registered first and always active. Every command works by calling
// back into the hub that dispatched it.

use super::command::{Command, CommandContext, CommandTable};
use super::module_base::{Module, ModuleDeps, ModuleResult};
use super::module_hub::ModuleHub;
use super::module_models::ModuleDescriptor;
use crate::core::storage::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const CORE_MODULE_NAME: &str = "core";

const DESCRIPTOR: ModuleDescriptor = ModuleDescriptor::new(CORE_MODULE_NAME).always_activated();

fn guild_only_reply(command: &str) -> String {
    format!("`{}` can only be used in a server.", command)
}

/// Why an enable/disable request was refused. The message is shown to the user.
#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("Please name a module, for example `disable-module timezones`.")]
    MissingName,

    #[error("Module not found.")]
    NotFound,

    #[error("`{0}` is already enabled.")]
    AlreadyEnabled(String),

    #[error("`{0}` is already disabled.")]
    AlreadyDisabled(String),

    #[error("`{0}` cannot be disabled.")]
    AlwaysActive(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ModRoleError {
    #[error("Invalid value. Mention a role, for example `set-mod-role @Moderators`.")]
    InvalidMention,

    #[error("Unknown role.")]
    UnknownRole,
}

pub struct CoreModule {
    commands: CommandTable,
}

impl CoreModule {
    pub fn new(_deps: &ModuleDeps) -> Self {
        let commands = CommandTable::new()
            .with("set-mod-role", Command::new(set_mod_role).only_mods())
            .with("get-all-modules", Command::new(get_all_modules).only_mods())
            .with("get-disabled-modules", Command::new(get_disabled_modules).only_mods())
            .with("get-enabled-modules", Command::new(get_enabled_modules).only_mods())
            .with("enable-module", Command::new(enable_module).only_mods())
            .with("disable-module", Command::new(disable_module).only_mods())
            .with("server-count", Command::new(server_count).only_mods())
            .with("ping", Command::new(ping))
            .with("now", Command::new(now))
            .with("version", Command::new(version).only_mods());

        Self { commands }
    }
}

#[async_trait]
impl Module for CoreModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &DESCRIPTOR
    }

    fn commands(&self) -> &CommandTable {
        &self.commands
    }
}

/// Names of every registered module except this one, as listed to users.
pub fn listed_modules(hub: &ModuleHub) -> Vec<String> {
    hub.descriptors()
        .filter(|d| d.name != CORE_MODULE_NAME)
        .map(|d| d.display_name())
        .collect()
}

/// Modules that are not disabled in the guild, core excluded.
pub async fn enabled_modules(hub: &ModuleHub, guild_id: u64) -> Result<Vec<String>, StoreError> {
    let disabled = hub.get_disabled_modules(guild_id, false).await?;

    Ok(hub
        .descriptors()
        .filter(|d| d.name != CORE_MODULE_NAME)
        .filter(|d| !disabled.iter().any(|name| name == d.name))
        .map(|d| d.display_name())
        .collect())
}

/// Enable `module_name` in a guild, or explain why not.
pub async fn try_enable_module(
    hub: &ModuleHub,
    guild_id: u64,
    module_name: &str,
) -> Result<(), ToggleError> {
    if hub.find_module(module_name).is_none() {
        return Err(ToggleError::NotFound);
    }

    let disabled = hub.get_disabled_modules(guild_id, true).await?;
    if !disabled.iter().any(|name| name == module_name) {
        return Err(ToggleError::AlreadyEnabled(module_name.to_string()));
    }

    hub.enable_module(guild_id, module_name).await?;
    Ok(())
}

/// Disable `module_name` in a guild, or explain why not.
pub async fn try_disable_module(
    hub: &ModuleHub,
    guild_id: u64,
    module_name: &str,
) -> Result<(), ToggleError> {
    let module = hub.find_module(module_name).ok_or(ToggleError::NotFound)?;

    if module.descriptor().always_activated {
        return Err(ToggleError::AlwaysActive(module_name.to_string()));
    }

    let disabled = hub.get_disabled_modules(guild_id, false).await?;
    if disabled.iter().any(|name| name == module_name) {
        return Err(ToggleError::AlreadyDisabled(module_name.to_string()));
    }

    hub.disable_module(guild_id, module_name).await?;
    Ok(())
}

/// Role ID from a strict `<@&digits>` mention.
pub fn parse_role_mention(value: &str) -> Result<u64, ModRoleError> {
    static ROLE_MENTION: OnceLock<Regex> = OnceLock::new();
    let regex = ROLE_MENTION
        .get_or_init(|| Regex::new(r"^<@&(\d+)>$").expect("role mention pattern is valid"));

    regex
        .captures(value)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or(ModRoleError::InvalidMention)
}

async fn set_mod_role(ctx: CommandContext) -> ModuleResult {
    let Some(guild_id) = ctx.guild_id() else {
        return ctx.reply(guild_only_reply(&ctx.command)).await;
    };

    let role_id = match ctx.arg(0).map(parse_role_mention) {
        Some(Ok(role_id)) => role_id,
        Some(Err(e)) => return ctx.reply(e.to_string()).await,
        None => return ctx.reply(ModRoleError::InvalidMention.to_string()).await,
    };

    let roles = ctx.hub.client().guild_roles(guild_id).await?;
    if !roles.contains(&role_id) {
        return ctx.reply(ModRoleError::UnknownRole.to_string()).await;
    }

    ctx.hub.set_moderator_role(guild_id, role_id).await?;
    ctx.reply(format!("Ok, <@&{}> is now the moderator role.", role_id)).await
}

async fn get_all_modules(ctx: CommandContext) -> ModuleResult {
    let modules = listed_modules(&ctx.hub);

    if modules.is_empty() {
        return ctx.reply("No modules are registered.").await;
    }
    ctx.reply(format!("Supported modules: `{}`", modules.join(", "))).await
}

async fn get_disabled_modules(ctx: CommandContext) -> ModuleResult {
    let Some(guild_id) = ctx.guild_id() else {
        return ctx.reply(guild_only_reply(&ctx.command)).await;
    };

    let disabled = ctx.hub.get_disabled_modules(guild_id, false).await?;

    if disabled.is_empty() {
        return ctx.reply("No modules are disabled.").await;
    }
    ctx.reply(format!("Disabled modules: `{}`", disabled.join(", "))).await
}

async fn get_enabled_modules(ctx: CommandContext) -> ModuleResult {
    let Some(guild_id) = ctx.guild_id() else {
        return ctx.reply(guild_only_reply(&ctx.command)).await;
    };

    let enabled = enabled_modules(&ctx.hub, guild_id).await?;

    if enabled.is_empty() {
        return ctx.reply("No modules are currently enabled.").await;
    }
    ctx.reply(format!("Enabled modules: `{}`", enabled.join(", "))).await
}

async fn enable_module(ctx: CommandContext) -> ModuleResult {
    let Some(guild_id) = ctx.guild_id() else {
        return ctx.reply(guild_only_reply(&ctx.command)).await;
    };
    let Some(module_name) = ctx.arg(0).map(str::to_string) else {
        return ctx.reply(ToggleError::MissingName.to_string()).await;
    };

    match try_enable_module(&ctx.hub, guild_id, &module_name).await {
        Ok(()) => ctx.reply(format!("`{}` has been enabled.", module_name)).await,
        Err(ToggleError::Store(e)) => Err(e.into()),
        Err(refused) => ctx.reply(refused.to_string()).await,
    }
}

async fn disable_module(ctx: CommandContext) -> ModuleResult {
    let Some(guild_id) = ctx.guild_id() else {
        return ctx.reply(guild_only_reply(&ctx.command)).await;
    };
    let Some(module_name) = ctx.arg(0).map(str::to_string) else {
        return ctx.reply(ToggleError::MissingName.to_string()).await;
    };

    match try_disable_module(&ctx.hub, guild_id, &module_name).await {
        Ok(()) => ctx.reply(format!("Okay, `{}` is now disabled.", module_name)).await,
        Err(ToggleError::Store(e)) => Err(e.into()),
        Err(refused) => ctx.reply(refused.to_string()).await,
    }
}

async fn server_count(ctx: CommandContext) -> ModuleResult {
    if ctx.hub.config().operator_id != Some(ctx.message.author_id) {
        tracing::debug!(
            user_id = ctx.message.author_id,
            "server-count requested by non-operator, ignoring"
        );
        return Ok(());
    }

    let count = ctx.hub.client().guild_count().await?;
    ctx.reply(format!("I am currently running on {} servers.", count)).await
}

async fn ping(ctx: CommandContext) -> ModuleResult {
    let latency = (Utc::now() - ctx.message.created_at).num_milliseconds().max(0);
    ctx.reply(format!("{}ms", latency)).await
}

async fn now(ctx: CommandContext) -> ModuleResult {
    ctx.reply(format!("<t:{}:T>", Utc::now().timestamp())).await
}

async fn version(ctx: CommandContext) -> ModuleResult {
    let config = ctx.hub.config();
    ctx.reply(format!("`{}@{}`", config.package_name, config.package_version))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::modules::module_hub::HubConfig;
    use crate::core::modules::module_models::InboundMessage;
    use crate::core::modules::test_support::*;
    use crate::core::storage::{keys, KvStore};
    use std::sync::Arc;

    struct Plain(ModuleDescriptor, CommandTable);

    #[async_trait]
    impl Module for Plain {
        fn descriptor(&self) -> &ModuleDescriptor {
            &self.0
        }

        fn commands(&self) -> &CommandTable {
            &self.1
        }
    }

    fn plain(name: &'static str) -> Plain {
        Plain(ModuleDescriptor::new(name), CommandTable::new())
    }

    async fn setup() -> (Arc<MockChatClient>, Arc<MockKvStore>, Arc<ModuleHub>) {
        let client = Arc::new(MockChatClient::new());
        let store = Arc::new(MockKvStore::new());
        client.owners.insert(GUILD, 1);
        client.roles.insert(GUILD, vec![MOD_ROLE, 456]);
        client.guild_count.store(42, std::sync::atomic::Ordering::SeqCst);

        let config = HubConfig {
            operator_id: Some(OPERATOR),
            package_name: "modular_discord_bot".to_string(),
            package_version: "0.1.0".to_string(),
        };

        let hub = ModuleHub::builder(client.clone(), store.clone(), config)
            .add_module(|_| plain("a"))
            .unwrap()
            .add_module(|_| {
                Plain(ModuleDescriptor::new("tz").with_prefix("tz:"), CommandTable::new())
            })
            .unwrap()
            .add_module(|_| {
                Plain(ModuleDescriptor::new("sticky").always_activated(), CommandTable::new())
            })
            .unwrap()
            .build();

        store.update(GUILD, keys::MOD_ROLE, &MOD_ROLE.to_string()).await.unwrap();

        (client, store, hub)
    }

    async fn run(hub: &Arc<ModuleHub>, client: &MockChatClient, content: &str) -> Option<String> {
        assert_eq!(hub.handle(&mod_message(content)).await, Some(CORE_MODULE_NAME));
        client.last_reply()
    }

    #[test]
    fn test_parse_role_mention() {
        assert_eq!(parse_role_mention("<@&123>").unwrap(), 123);
        assert!(parse_role_mention("<@123>").is_err());
        assert!(parse_role_mention("@&123").is_err());
        assert!(parse_role_mention("<@&123>x").is_err());
        assert!(parse_role_mention("<@&>").is_err());
        assert!(parse_role_mention("123").is_err());
    }

    #[tokio::test]
    async fn test_disable_then_enable_round_trip() {
        let (client, store, hub) = setup().await;

        let reply = run(&hub, &client, "disable-module a").await;
        assert_eq!(reply.as_deref(), Some("Okay, `a` is now disabled."));
        assert_eq!(hub.get_disabled_modules(GUILD, true).await.unwrap(), vec!["a"]);
        assert_eq!(store.value(GUILD, keys::DISABLED_MODULES).as_deref(), Some("a"));

        let reply = run(&hub, &client, "disable-module a").await;
        assert_eq!(reply.as_deref(), Some("`a` is already disabled."));

        let reply = run(&hub, &client, "enable-module a").await;
        assert_eq!(reply.as_deref(), Some("`a` has been enabled."));
        assert!(hub.get_disabled_modules(GUILD, true).await.unwrap().is_empty());
        assert_eq!(store.value(GUILD, keys::DISABLED_MODULES).as_deref(), Some(""));

        let reply = run(&hub, &client, "enable-module a").await;
        assert_eq!(reply.as_deref(), Some("`a` is already enabled."));
    }

    #[tokio::test]
    async fn test_always_active_module_cannot_be_disabled() {
        let (client, store, hub) = setup().await;
        let writes = store.writes();

        let reply = run(&hub, &client, "disable-module core").await;
        assert_eq!(reply.as_deref(), Some("`core` cannot be disabled."));

        let reply = run(&hub, &client, "disable-module sticky").await;
        assert_eq!(reply.as_deref(), Some("`sticky` cannot be disabled."));

        assert_eq!(store.writes(), writes);
        assert!(hub.get_disabled_modules(GUILD, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggling_unknown_module_is_refused() {
        let (client, store, hub) = setup().await;
        let writes = store.writes();

        assert_eq!(
            run(&hub, &client, "disable-module nope").await.as_deref(),
            Some("Module not found.")
        );
        assert_eq!(
            run(&hub, &client, "enable-module nope").await.as_deref(),
            Some("Module not found.")
        );
        assert_eq!(
            run(&hub, &client, "enable-module").await,
            Some(ToggleError::MissingName.to_string())
        );
        assert_eq!(store.writes(), writes);
    }

    #[tokio::test]
    async fn test_set_mod_role_validation() {
        let (client, store, hub) = setup().await;
        let writes = store.writes();

        let reply = run(&hub, &client, "set-mod-role <@123>").await;
        assert_eq!(reply, Some(ModRoleError::InvalidMention.to_string()));

        let reply = run(&hub, &client, "set-mod-role").await;
        assert_eq!(reply, Some(ModRoleError::InvalidMention.to_string()));

        let reply = run(&hub, &client, "set-mod-role <@&999>").await;
        assert_eq!(reply, Some(ModRoleError::UnknownRole.to_string()));

        assert_eq!(store.writes(), writes);
        assert_eq!(store.value(GUILD, keys::MOD_ROLE).as_deref(), Some("123"));

        let reply = run(&hub, &client, "set-mod-role <@&456>").await;
        assert_eq!(reply.as_deref(), Some("Ok, <@&456> is now the moderator role."));
        assert_eq!(store.value(GUILD, keys::MOD_ROLE).as_deref(), Some("456"));
    }

    #[tokio::test]
    async fn test_module_listings() {
        let (client, _store, hub) = setup().await;

        let reply = run(&hub, &client, "get-all-modules").await;
        assert_eq!(reply.as_deref(), Some("Supported modules: `a, tz (tz:), sticky`"));

        let reply = run(&hub, &client, "get-disabled-modules").await;
        assert_eq!(reply.as_deref(), Some("No modules are disabled."));

        run(&hub, &client, "disable-module tz").await;

        let reply = run(&hub, &client, "get-disabled-modules").await;
        assert_eq!(reply.as_deref(), Some("Disabled modules: `tz`"));

        let reply = run(&hub, &client, "get-enabled-modules").await;
        assert_eq!(reply.as_deref(), Some("Enabled modules: `a, sticky`"));
    }

    #[tokio::test]
    async fn test_enabled_is_all_minus_disabled() {
        let client = Arc::new(MockChatClient::new());
        let store = Arc::new(MockKvStore::new());
        let config = HubConfig {
            operator_id: None,
            package_name: "bot".to_string(),
            package_version: "1.0.0".to_string(),
        };
        let hub = ModuleHub::builder(client, store, config)
            .add_module(|_| plain("A"))
            .unwrap()
            .add_module(|_| plain("B"))
            .unwrap()
            .build();

        hub.disable_module(GUILD, "B").await.unwrap();

        assert_eq!(enabled_modules(&hub, GUILD).await.unwrap(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_admin_commands_require_moderator() {
        let (client, _store, hub) = setup().await;

        let message = guild_message(MEMBER, &[], "disable-module a");
        assert_eq!(hub.handle(&message).await, None);
        assert!(client.replies().is_empty());
        assert!(hub.get_disabled_modules(GUILD, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_direct_messages_reach_only_public_commands() {
        let (client, _store, hub) = setup().await;

        // Nobody is a moderator in a direct message
        let mut dm = mod_message("get-disabled-modules");
        dm.guild_id = None;
        assert_eq!(hub.handle(&dm).await, None);

        let mut dm_ping = mod_message("ping");
        dm_ping.guild_id = None;
        assert_eq!(hub.handle(&dm_ping).await, Some(CORE_MODULE_NAME));
        assert!(client.last_reply().unwrap().ends_with("ms"));
    }

    #[tokio::test]
    async fn test_server_count_only_for_operator() {
        let (client, _store, hub) = setup().await;

        run(&hub, &client, "server-count").await;
        assert!(client.replies().is_empty());

        let message: InboundMessage = guild_message(OPERATOR, &[MOD_ROLE], "server-count");
        assert_eq!(hub.handle(&message).await, Some(CORE_MODULE_NAME));
        assert_eq!(client.last_reply().as_deref(), Some("I am currently running on 42 servers."));
    }

    #[tokio::test]
    async fn test_public_commands() {
        let (client, _store, hub) = setup().await;

        let mut message = guild_message(MEMBER, &[], "ping");
        message.created_at = Utc::now() - chrono::Duration::milliseconds(250);
        hub.handle(&message).await;
        let latency: i64 = client.last_reply().unwrap().trim_end_matches("ms").parse().unwrap();
        assert!(latency >= 250);

        hub.handle(&guild_message(MEMBER, &[], "now")).await;
        let reply = client.last_reply().unwrap();
        assert!(reply.starts_with("<t:") && reply.ends_with(":T>"));

        // version is moderator-only
        assert_eq!(hub.handle(&guild_message(MEMBER, &[], "version")).await, None);
        let reply = run(&hub, &client, "version").await;
        assert_eq!(reply.as_deref(), Some("`modular_discord_bot@0.1.0`"));
    }

    #[tokio::test]
    async fn test_store_failure_gets_generic_reply() {
        let (client, store, hub) = setup().await;
        store.fail_writes(true);

        let reply = run(&hub, &client, "disable-module a").await;
        assert_eq!(
            reply.as_deref(),
            Some(crate::core::modules::module_base::GENERIC_FAILURE_REPLY)
        );
        assert!(hub.get_disabled_modules(GUILD, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guild_only_handlers_refuse_direct_messages() {
        let (client, store, hub) = setup().await;
        let writes = store.writes();

        let mut message = mod_message("disable-module a");
        message.guild_id = None;
        let ctx = CommandContext {
            hub: Arc::clone(&hub),
            message,
            command: "disable-module".to_string(),
        };

        disable_module(ctx).await.unwrap();

        assert_eq!(
            client.last_reply().as_deref(),
            Some("`disable-module` can only be used in a server.")
        );
        assert_eq!(store.writes(), writes);
    }
}
