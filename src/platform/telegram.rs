use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageEntityKind};
use tracing::{debug, info};

use crate::dispatch::Pipeline;
use crate::platform::{EventKind, InboundEvent, Member, Transport};

/// Telegram Bot API transport
pub struct TelegramTransport {
    bot: Bot,
    own_id: String,
}

impl TelegramTransport {
    /// Create the bot client and learn our own account id.
    /// Failing here is fatal: without a session there is nothing to run.
    pub async fn connect(token: &str) -> Result<Self> {
        let bot = Bot::new(token);
        let me = bot
            .get_me()
            .await
            .context("Failed to log in to Telegram (getMe)")?;
        let own_id = me.user.id.0.to_string();
        info!(
            "Logged in as @{} ({})",
            me.user.username.as_deref().unwrap_or("?"),
            own_id
        );
        Ok(Self { bot, own_id })
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }
}

fn chat_id(thread_id: &str) -> Result<ChatId> {
    thread_id
        .parse::<i64>()
        .map(ChatId)
        .with_context(|| format!("Invalid Telegram chat id: {}", thread_id))
}

#[async_trait]
impl Transport for TelegramTransport {
    fn own_id(&self) -> &str {
        &self.own_id
    }

    async fn send_message(&self, text: &str, thread_id: &str) -> Result<()> {
        self.bot
            .send_message(chat_id(thread_id)?, text)
            .await
            .with_context(|| format!("Failed to send message to {}", thread_id))?;
        Ok(())
    }

    async fn thread_admins(&self, thread_id: &str) -> Result<Vec<String>> {
        let members = self
            .bot
            .get_chat_administrators(chat_id(thread_id)?)
            .await
            .with_context(|| format!("Failed to fetch administrators of {}", thread_id))?;
        Ok(members
            .iter()
            .map(|member| member.user.id.0.to_string())
            .collect())
    }
}

/// Convert a Telegram message into a platform-agnostic event
pub fn to_inbound(msg: &Message) -> Result<InboundEvent> {
    let from = msg.from.as_ref().with_context(|| {
        format!(
            "Message {} in chat {} has no sender",
            msg.id.0, msg.chat.id.0
        )
    })?;

    let kind = if msg.text().is_some() {
        EventKind::Message
    } else if msg.new_chat_members().is_some() {
        EventKind::MemberJoined
    } else if msg.left_chat_member().is_some() {
        EventKind::MemberLeft
    } else {
        EventKind::Other
    };

    let mentions: HashSet<String> = msg
        .entities()
        .unwrap_or_default()
        .iter()
        .filter_map(|entity| match &entity.kind {
            MessageEntityKind::TextMention { user } => Some(user.id.0.to_string()),
            _ => None,
        })
        .collect();

    let joined = msg
        .new_chat_members()
        .unwrap_or_default()
        .iter()
        .map(|user| Member {
            id: user.id.0.to_string(),
            name: user.full_name(),
        })
        .collect();

    Ok(InboundEvent {
        kind,
        message_id: msg.id.0.to_string(),
        sender_id: from.id.0.to_string(),
        sender_name: from.full_name(),
        thread_id: msg.chat.id.0.to_string(),
        is_group: msg.chat.is_group() || msg.chat.is_supergroup(),
        body: msg.text().map(str::to_string),
        reply_to_sender: msg
            .reply_to_message()
            .and_then(|reply| reply.from.as_ref())
            .map(|user| user.id.0.to_string()),
        mentions,
        joined,
    })
}

/// Feed Telegram updates into the pipeline until ctrl-c
pub async fn run(pipeline: Arc<Pipeline>, bot: Bot) -> Result<()> {
    info!("Starting Telegram listener...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![pipeline])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(msg: Message, pipeline: Arc<Pipeline>) -> ResponseResult<()> {
    let outcome = pipeline.handle_delivery(to_inbound(&msg)).await;
    debug!("Message {} in {}: {:?}", msg.id.0, msg.chat.id.0, outcome);
    Ok(())
}
