use anyhow::Result;
use async_trait::async_trait;

use super::EventHandler;
use crate::lang::Lang;
use crate::platform::{EventKind, InboundEvent, Transport};

/// Greets each member joining a group, except the bot itself
pub struct WelcomeHandler {
    lang: Lang,
}

impl WelcomeHandler {
    pub fn new(lang: Lang) -> Self {
        Self { lang }
    }
}

#[async_trait]
impl EventHandler for WelcomeHandler {
    fn kind(&self) -> EventKind {
        EventKind::MemberJoined
    }

    async fn run(&self, transport: &dyn Transport, event: &InboundEvent) -> Result<()> {
        for member in &event.joined {
            if member.id == transport.own_id() {
                continue;
            }
            let text = self.lang.t("welcome", &[("name", &member.name)]);
            transport.send_message(&text, &event.thread_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::{text_event, MockTransport};
    use crate::platform::Member;

    fn joined_event(adder: &str, joined: &[(&str, &str)]) -> InboundEvent {
        let mut event = text_event(adder, "g7", true, "");
        event.kind = EventKind::MemberJoined;
        event.body = None;
        event.sender_name = "Ann".to_string();
        event.joined = joined
            .iter()
            .map(|(id, name)| Member {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect();
        event
    }

    #[tokio::test]
    async fn test_greets_joiner_not_adder() {
        let transport = MockTransport::new("bot");
        let event = joined_event("5", &[("9", "Bob")]);

        WelcomeHandler::new(Lang::builtin())
            .run(&transport, &event)
            .await
            .unwrap();

        assert_eq!(
            transport.sent(),
            vec![("Welcome, Bob!".to_string(), "g7".to_string())]
        );
    }

    #[tokio::test]
    async fn test_greets_every_joiner_but_the_bot() {
        let transport = MockTransport::new("bot");
        let event = joined_event("5", &[("bot", "cmdbot"), ("9", "Bob"), ("11", "Dee")]);

        WelcomeHandler::new(Lang::builtin())
            .run(&transport, &event)
            .await
            .unwrap();

        assert_eq!(transport.sent_texts(), vec!["Welcome, Bob!", "Welcome, Dee!"]);
    }

    #[tokio::test]
    async fn test_bot_added_alone_sends_nothing() {
        let transport = MockTransport::new("bot");
        let event = joined_event("5", &[("bot", "cmdbot")]);

        WelcomeHandler::new(Lang::builtin())
            .run(&transport, &event)
            .await
            .unwrap();

        assert!(transport.sent().is_empty());
    }
}
