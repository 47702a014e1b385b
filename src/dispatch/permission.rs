use std::collections::HashSet;

use tracing::debug;

use crate::commands::PermissionLevel;
use crate::config::BotConfig;
use crate::platform::{InboundEvent, Transport};

/// Decides whether a sender may run a command of a given level.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    admins: HashSet<String>,
    moderators: HashSet<String>,
}

impl PermissionResolver {
    pub fn new(admins: HashSet<String>, moderators: HashSet<String>) -> Self {
        Self { admins, moderators }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.admins.clone(), config.moderators.clone())
    }

    pub fn is_bot_admin(&self, sender_id: &str) -> bool {
        self.admins.contains(sender_id)
    }

    pub fn is_moderator(&self, sender_id: &str) -> bool {
        self.moderators.contains(sender_id)
    }

    /// Never fails: a group-admin lookup error counts as "not a group admin".
    pub async fn authorize(
        &self,
        transport: &dyn Transport,
        event: &InboundEvent,
        level: PermissionLevel,
    ) -> bool {
        let sender = event.sender_id.as_str();
        let is_bot_admin = self.is_bot_admin(sender);
        let is_moderator = self.is_moderator(sender);

        match level {
            PermissionLevel::Everyone => true,
            PermissionLevel::BotAdmin => is_bot_admin,
            PermissionLevel::Moderator => is_bot_admin || is_moderator,
            PermissionLevel::GroupAdmin => {
                is_bot_admin || is_group_admin(transport, event).await
            }
            PermissionLevel::Staff => {
                is_bot_admin || is_moderator || is_group_admin(transport, event).await
            }
        }
    }
}

async fn is_group_admin(transport: &dyn Transport, event: &InboundEvent) -> bool {
    if !event.is_group {
        return false;
    }
    match transport.thread_admins(&event.thread_id).await {
        Ok(admins) => admins.iter().any(|id| *id == event.sender_id),
        Err(e) => {
            debug!(
                "Group admin lookup for thread {} failed, treating sender as non-admin: {:#}",
                event.thread_id, e
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::{text_event, MockTransport};

    fn resolver() -> PermissionResolver {
        PermissionResolver::new(
            HashSet::from(["admin".to_string()]),
            HashSet::from(["mod".to_string()]),
        )
    }

    async fn allowed_levels(transport: &MockTransport, sender: &str, is_group: bool) -> Vec<u8> {
        let event = text_event(sender, "g1", is_group, "!x");
        let mut allowed = Vec::new();
        for level in PermissionLevel::ALL {
            if resolver().authorize(transport, &event, level).await {
                allowed.push(level.as_u8());
            }
        }
        allowed
    }

    #[tokio::test]
    async fn test_bot_admin_passes_every_level() {
        let transport = MockTransport::new("bot");
        assert_eq!(allowed_levels(&transport, "admin", true).await, vec![1, 2, 3, 4, 5]);
        assert_eq!(allowed_levels(&transport, "admin", false).await, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_moderator_levels() {
        let transport = MockTransport::new("bot");
        assert_eq!(allowed_levels(&transport, "mod", true).await, vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn test_group_admin_levels() {
        let transport = MockTransport::new("bot").with_admins(&["ga"]);
        assert_eq!(allowed_levels(&transport, "ga", true).await, vec![1, 2, 3]);
        // Group admin status means nothing outside a group
        assert_eq!(allowed_levels(&transport, "ga", false).await, vec![1]);
    }

    #[tokio::test]
    async fn test_moderator_who_is_also_group_admin() {
        let transport = MockTransport::new("bot").with_admins(&["mod"]);
        assert_eq!(allowed_levels(&transport, "mod", true).await, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_plain_user_only_level_one() {
        let transport = MockTransport::new("bot").with_admins(&["someone-else"]);
        assert_eq!(allowed_levels(&transport, "user", true).await, vec![1]);
    }

    #[tokio::test]
    async fn test_failed_lookup_degrades_to_not_admin() {
        let transport = MockTransport::new("bot").with_failing_lookup();
        let event = text_event("ga", "g1", true, "!x");

        assert!(!resolver().authorize(&transport, &event, PermissionLevel::GroupAdmin).await);
        assert!(!resolver().authorize(&transport, &event, PermissionLevel::Staff).await);
        assert_eq!(transport.admin_lookups(), 2);
    }

    #[tokio::test]
    async fn test_lookup_only_for_group_levels_in_groups() {
        let transport = MockTransport::new("bot").with_admins(&["ga"]);

        let group = text_event("user", "g1", true, "!x");
        for level in [
            PermissionLevel::Everyone,
            PermissionLevel::Moderator,
            PermissionLevel::BotAdmin,
        ] {
            resolver().authorize(&transport, &group, level).await;
        }
        assert_eq!(transport.admin_lookups(), 0);

        let private = text_event("user", "p1", false, "!x");
        resolver()
            .authorize(&transport, &private, PermissionLevel::GroupAdmin)
            .await;
        assert_eq!(transport.admin_lookups(), 0);

        resolver()
            .authorize(&transport, &group, PermissionLevel::GroupAdmin)
            .await;
        assert_eq!(transport.admin_lookups(), 1);
    }

    #[tokio::test]
    async fn test_level_five_implies_all_lower_levels() {
        let transport = MockTransport::new("bot").with_failing_lookup();
        for sender in ["admin", "mod", "user"] {
            for is_group in [true, false] {
                let event = text_event(sender, "g1", is_group, "!x");
                let r = resolver();
                if r.authorize(&transport, &event, PermissionLevel::BotAdmin).await {
                    for level in PermissionLevel::ALL {
                        assert!(r.authorize(&transport, &event, level).await);
                    }
                }
            }
        }
    }
}
