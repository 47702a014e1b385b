use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use super::{CommandContext, CommandHandler};

/// Message count and uptime
pub struct InfoCommand;

#[async_trait]
impl CommandHandler for InfoCommand {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<()> {
        let uptime = format_uptime((Utc::now() - ctx.start_time).num_seconds());
        let text = ctx.lang.t(
            "info",
            &[
                ("messages", &ctx.stats.total_messages().to_string()),
                ("uptime", &uptime),
            ],
        );
        ctx.reply(&text).await
    }
}

/// `1d 2h 3m 4s`, dropping leading zero units
pub fn format_uptime(total_secs: i64) -> String {
    let secs = total_secs.max(0);
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        secs % 86_400 / 3_600,
        secs % 3_600 / 60,
        secs % 60,
    );
    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
