use anyhow::Result;
use async_trait::async_trait;

use super::{CommandContext, CommandHandler};
use crate::platform::InboundEvent;

/// Replies with a user identifier: a mentioned user, else the author of the
/// replied-to message, else the sender
pub struct UidCommand;

#[async_trait]
impl CommandHandler for UidCommand {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<()> {
        let text = ctx.lang.t("uid", &[("uid", target_id(ctx.event))]);
        ctx.reply(&text).await
    }
}

fn target_id(event: &InboundEvent) -> &str {
    // Mentions are a set; pick the smallest so the answer is stable
    if let Some(mentioned) = event.mentions.iter().min() {
        return mentioned;
    }
    event
        .reply_to_sender
        .as_deref()
        .unwrap_or(&event.sender_id)
}
