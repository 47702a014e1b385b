pub mod help;
pub mod info;
pub mod uid;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::lang::Lang;
use crate::platform::{InboundEvent, Transport};
use crate::stats::Stats;

/// Whether a command must, must not, or may be invoked with the prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrefixMode {
    #[default]
    RequiresPrefix,
    ForbidsPrefix,
    Either,
}

/// Minimum privilege needed to run a command.
///
/// | level | who                                  |
/// |-------|--------------------------------------|
/// | 1     | everyone                             |
/// | 2     | bot-admin, moderator or group-admin  |
/// | 3     | bot-admin or group-admin             |
/// | 4     | bot-admin or moderator               |
/// | 5     | bot-admin                            |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionLevel {
    #[default]
    Everyone = 1,
    Staff = 2,
    GroupAdmin = 3,
    Moderator = 4,
    BotAdmin = 5,
}

impl PermissionLevel {
    #[cfg(test)]
    pub const ALL: [PermissionLevel; 5] = [
        PermissionLevel::Everyone,
        PermissionLevel::Staff,
        PermissionLevel::GroupAdmin,
        PermissionLevel::Moderator,
        PermissionLevel::BotAdmin,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Everything a command handler gets to work with for one invocation
pub struct CommandContext<'a> {
    pub transport: &'a dyn Transport,
    pub event: &'a InboundEvent,
    pub args: &'a [String],
    pub config: &'a Config,
    pub lang: &'a Lang,
    pub start_time: DateTime<Utc>,
    pub stats: &'a Stats,
    pub registry: &'a CommandRegistry,
}

impl CommandContext<'_> {
    /// Reply to the conversation the invocation came from
    pub async fn reply(&self, text: &str) -> Result<()> {
        self.transport
            .send_message(text, &self.event.thread_id)
            .await
    }
}

/// The body of a command. May fail or panic; the dispatcher contains both.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<()>;
}

/// Registered metadata plus handler for one command
pub struct CommandDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub prefix_mode: PrefixMode,
    pub permission: PermissionLevel,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDescriptor {
    /// A level-1 command that requires the prefix
    pub fn new(name: &str, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name: name.to_lowercase(),
            aliases: Vec::new(),
            prefix_mode: PrefixMode::default(),
            permission: PermissionLevel::default(),
            handler: Arc::new(handler),
        }
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_lowercase()).collect();
        self
    }

    pub fn prefix_mode(mut self, mode: PrefixMode) -> Self {
        self.prefix_mode = mode;
        self
    }

    pub fn permission(mut self, level: PermissionLevel) -> Self {
        self.permission = level;
        self
    }
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("prefix_mode", &self.prefix_mode)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// Commands keyed by lowercase name and alias. Read-only once built.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<CommandDescriptor>>,
    primary_names: Vec<String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under its name and every alias.
    /// A name that is already taken is overwritten (last registration wins).
    pub fn register(&mut self, descriptor: CommandDescriptor) {
        let descriptor = Arc::new(descriptor);
        let keys = std::iter::once(&descriptor.name).chain(descriptor.aliases.iter());
        for key in keys {
            if let Some(previous) = self.commands.insert(key.clone(), Arc::clone(&descriptor)) {
                warn!(
                    "Command key '{}' of '{}' overrides '{}'",
                    key, descriptor.name, previous.name
                );
            }
        }
        self.primary_names.push(descriptor.name.clone());
    }

    /// Case-insensitive lookup by name or alias
    pub fn lookup(&self, token: &str) -> Option<Arc<CommandDescriptor>> {
        self.commands.get(&token.to_lowercase()).cloned()
    }

    /// Every registered key (names and aliases), in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Each command once, sorted by name
    pub fn list(&self) -> Vec<Arc<CommandDescriptor>> {
        let mut result: Vec<Arc<CommandDescriptor>> = Vec::new();
        for name in &self.primary_names {
            let Some(cmd) = self.commands.get(name) else {
                continue;
            };
            if !result.iter().any(|c| Arc::ptr_eq(c, cmd)) {
                result.push(Arc::clone(cmd));
            }
        }
        result.sort_by(|a, b| a.name.cmp(&b.name));
        result
    }

    /// Number of registered keys (names plus aliases)
    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

/// The bundled command set
pub fn builtin_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(
        CommandDescriptor::new("info", info::InfoCommand)
            .aliases(&["about", "stats"])
            .prefix_mode(PrefixMode::Either),
    );
    registry.register(CommandDescriptor::new("uid", uid::UidCommand).aliases(&["id"]));
    registry.register(CommandDescriptor::new("help", help::HelpCommand).aliases(&["commands"]));

    info!("Loaded {} command aliases", registry.len());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn run(&self, _ctx: &CommandContext<'_>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_descriptor_defaults() {
        let cmd = CommandDescriptor::new("Ping", Noop);
        assert_eq!(cmd.name, "ping");
        assert_eq!(cmd.prefix_mode, PrefixMode::RequiresPrefix);
        assert_eq!(cmd.permission, PermissionLevel::Everyone);
    }

    #[test]
    fn test_lookup_by_name_and_alias_is_case_insensitive() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandDescriptor::new("ping", Noop).aliases(&["P", "pong"]));

        assert_eq!(registry.lookup("PING").unwrap().name, "ping");
        assert_eq!(registry.lookup("p").unwrap().name, "ping");
        assert_eq!(registry.lookup("Pong").unwrap().name, "ping");
        assert!(registry.lookup("pingg").is_none());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_last_registered_alias_wins() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandDescriptor::new("first", Noop).aliases(&["x"]));
        registry.register(CommandDescriptor::new("second", Noop).aliases(&["x"]));

        assert_eq!(registry.lookup("x").unwrap().name, "second");
        assert_eq!(registry.lookup("first").unwrap().name, "first");
    }

    #[test]
    fn test_list_dedupes_aliases_and_sorts() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandDescriptor::new("zeta", Noop).aliases(&["z"]));
        registry.register(CommandDescriptor::new("alpha", Noop).aliases(&["a", "al"]));

        let names: Vec<String> = registry.list().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_permission_level_numbers() {
        let numbers: Vec<u8> = PermissionLevel::ALL.iter().map(|l| l.as_u8()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(PermissionLevel::default(), PermissionLevel::Everyone);
    }

    #[test]
    fn test_builtin_registry() {
        let registry = builtin_registry();
        assert_eq!(registry.lookup("about").unwrap().name, "info");
        assert_eq!(registry.lookup("id").unwrap().name, "uid");
        assert_eq!(registry.lookup("commands").unwrap().name, "help");
        assert_eq!(registry.list().len(), 3);
    }
}
