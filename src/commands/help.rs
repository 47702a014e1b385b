use anyhow::Result;
use async_trait::async_trait;

use super::{CommandContext, CommandHandler, CommandRegistry, PrefixMode};

/// Lists every registered command
pub struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<()> {
        let header = ctx.lang.t("help_header", &[]);
        let text = render(&header, ctx.registry, &ctx.config.bot.prefix);
        ctx.reply(&text).await
    }
}

fn render(header: &str, registry: &CommandRegistry, prefix: &str) -> String {
    let mut text = format!("{}\n", header);
    for cmd in registry.list() {
        let shown_prefix = match cmd.prefix_mode {
            PrefixMode::ForbidsPrefix => "",
            PrefixMode::RequiresPrefix | PrefixMode::Either => prefix,
        };
        text.push_str(&format!("  {}{}", shown_prefix, cmd.name));
        if !cmd.aliases.is_empty() {
            text.push_str(&format!(" ({})", cmd.aliases.join(", ")));
        }
        text.push_str(&format!(" [level {}]\n", cmd.permission.as_u8()));
    }
    text.trim_end().to_string()
}
