//! The message pipeline: classify an inbound event, parse it into a command
//! invocation, resolve and authorize the command, then run it inside a
//! failure boundary.

pub mod classify;
pub mod parse;
pub mod permission;
pub mod suggest;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::commands::{CommandContext, CommandDescriptor, CommandRegistry, PrefixMode};
use crate::config::{BareUnknownPolicy, Config};
use crate::events::EventTable;
use crate::lang::Lang;
use crate::platform::{InboundEvent, Transport};
use crate::stats::Stats;

use self::classify::{classify, Classification};
use self::parse::{parse, InvocationMode, ParseOutcome, ParsedInvocation};
use self::permission::PermissionResolver;

/// How the pipeline disposed of one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The transport reported an error instead of an event
    DeliveryError,
    /// The bot's own message
    SelfEcho,
    /// Not a text message; only event handlers saw it
    NotText,
    /// Prefix with nothing after it
    EmptyInvocation,
    /// Bare text that is not a command
    Conversation,
    /// Prefixed token that matches no command
    NotFound { suggestion: Option<String> },
    /// Command used with the wrong prefix mode
    WrongMode,
    Denied,
    Executed,
    Failed,
}

pub struct Pipeline {
    transport: Arc<dyn Transport>,
    config: Arc<Config>,
    registry: CommandRegistry,
    events: EventTable,
    permissions: PermissionResolver,
    lang: Lang,
    stats: Arc<Stats>,
    start_time: DateTime<Utc>,
}

impl Pipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        config: Arc<Config>,
        registry: CommandRegistry,
        events: EventTable,
        lang: Lang,
        stats: Arc<Stats>,
    ) -> Self {
        let permissions = PermissionResolver::from_config(&config.bot);
        Self {
            transport,
            config,
            registry,
            events,
            permissions,
            lang,
            stats,
            start_time: Utc::now(),
        }
    }

    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Entry point for the transport's subscription callback.
    pub async fn handle_delivery(&self, delivery: Result<InboundEvent>) -> Outcome {
        match delivery {
            Ok(event) => self.handle_event(&event).await,
            Err(e) => {
                error!("Transport delivery error: {:#}", e);
                Outcome::DeliveryError
            }
        }
    }

    pub async fn handle_event(&self, event: &InboundEvent) -> Outcome {
        let body = match classify(event, self.transport.own_id()) {
            Classification::SelfEcho => return Outcome::SelfEcho,
            classification => {
                self.events.fire(&self.transport, event);
                match classification {
                    Classification::Accept(body) => body,
                    _ => return Outcome::NotText,
                }
            }
        };

        self.stats.record_message();

        let prefix = self.config.bot.prefix.as_str();
        let invocation = match parse(body, prefix) {
            ParseOutcome::Empty => {
                let notice = self.lang.t("empty_invocation", &[("prefix", prefix)]);
                self.reply(&notice, event).await;
                return Outcome::EmptyInvocation;
            }
            ParseOutcome::Invocation(invocation) => invocation,
        };

        let Some(command) = self.registry.lookup(&invocation.command) else {
            return self.not_found(&invocation, event).await;
        };

        if !mode_allowed(command.prefix_mode, invocation.mode) {
            debug!(
                "Dropping '{}': prefix mode {:?} does not allow {:?}",
                command.name, command.prefix_mode, invocation.mode
            );
            return Outcome::WrongMode;
        }

        let allowed = self
            .permissions
            .authorize(self.transport.as_ref(), event, command.permission)
            .await;
        if !allowed {
            info!(
                "Denied '{}' (level {}) to {} in {}",
                command.name,
                command.permission.as_u8(),
                event.sender_id,
                event.thread_id
            );
            self.reply(&self.lang.t("no_permission", &[]), event).await;
            return Outcome::Denied;
        }

        self.execute(&command, event, &invocation.args).await
    }

    async fn not_found(&self, invocation: &ParsedInvocation, event: &InboundEvent) -> Outcome {
        let prefix = self.config.bot.prefix.as_str();

        if invocation.mode == InvocationMode::Bare {
            if self.config.bot.bare_unknown == BareUnknownPolicy::Notice {
                self.reply(&self.lang.t("use_prefix", &[("prefix", prefix)]), event)
                    .await;
            }
            return Outcome::Conversation;
        }

        let suggestion =
            suggest::nearest(&invocation.command, self.registry.keys()).map(str::to_string);
        debug!(
            "Unknown command '{}' (suggestion: {:?})",
            invocation.command, suggestion
        );
        let notice = match &suggestion {
            Some(name) => self.lang.t(
                "not_found_suggest",
                &[("suggestion", &format!("{}{}", prefix, name))],
            ),
            None => self.lang.t("not_found", &[]),
        };
        self.reply(&notice, event).await;
        Outcome::NotFound { suggestion }
    }

    /// Run the handler, containing both returned errors and panics.
    async fn execute(
        &self,
        command: &CommandDescriptor,
        event: &InboundEvent,
        args: &[String],
    ) -> Outcome {
        let ctx = CommandContext {
            transport: self.transport.as_ref(),
            event,
            args,
            config: &self.config,
            lang: &self.lang,
            start_time: self.start_time,
            stats: &self.stats,
            registry: &self.registry,
        };

        debug!(
            "Running '{}' for {} (message {})",
            command.name, event.sender_id, event.message_id
        );
        let failure = match AssertUnwindSafe(command.handler.run(&ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => return Outcome::Executed,
            Ok(Err(e)) => format!("{:#}", e),
            Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
        };

        error!(command = %command.name, thread = %event.thread_id, "Command error: {}", failure);
        self.reply(&self.lang.t("command_failed", &[]), event).await;
        Outcome::Failed
    }

    /// Best-effort send to the event's conversation
    async fn reply(&self, text: &str, event: &InboundEvent) {
        if let Err(e) = self.transport.send_message(text, &event.thread_id).await {
            warn!("Failed to send reply to {}: {:#}", event.thread_id, e);
        }
    }
}

fn mode_allowed(required: PrefixMode, used: InvocationMode) -> bool {
    match required {
        PrefixMode::Either => true,
        PrefixMode::RequiresPrefix => used == InvocationMode::Prefixed,
        PrefixMode::ForbidsPrefix => used == InvocationMode::Bare,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
