pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// Event categories that type-keyed handlers can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    MemberJoined,
    MemberLeft,
    Other,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Message => write!(f, "message"),
            EventKind::MemberJoined => write!(f, "member_joined"),
            EventKind::MemberLeft => write!(f, "member_left"),
            EventKind::Other => write!(f, "other"),
        }
    }
}

/// A participant named by an event, e.g. someone who just joined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub name: String,
}

/// An event received from the chat platform, already converted to a
/// platform-agnostic shape
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub message_id: String,
    pub sender_id: String,
    /// Display name of the sender, when the platform provides one
    pub sender_name: String,
    pub thread_id: String,
    pub is_group: bool,
    /// Text body; `None` for non-text events
    pub body: Option<String>,
    /// Sender of the message this one replies to
    pub reply_to_sender: Option<String>,
    pub mentions: HashSet<String>,
    /// Members added to the conversation; empty unless `kind` is `MemberJoined`
    pub joined: Vec<Member>,
}

/// Operations the pipeline and handlers need from the chat platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The bot's own account identifier
    fn own_id(&self) -> &str;

    /// Send a text message to a conversation
    async fn send_message(&self, text: &str, thread_id: &str) -> Result<()>;

    /// Fetch the administrator identifiers of a group conversation
    async fn thread_admins(&self, thread_id: &str) -> Result<Vec<String>>;
}

#[cfg(test)]
pub mod testing {
    //! In-memory transport used by the pipeline, command and event tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub struct MockTransport {
        own_id: String,
        /// `None` makes every admin lookup fail
        admins: Option<Vec<String>>,
        sent: Mutex<Vec<(String, String)>>,
        admin_lookups: AtomicUsize,
    }

    impl MockTransport {
        pub fn new(own_id: &str) -> Self {
            Self {
                own_id: own_id.to_string(),
                admins: Some(Vec::new()),
                sent: Mutex::new(Vec::new()),
                admin_lookups: AtomicUsize::new(0),
            }
        }

        pub fn with_admins(mut self, admins: &[&str]) -> Self {
            self.admins = Some(admins.iter().map(|a| a.to_string()).collect());
            self
        }

        pub fn with_failing_lookup(mut self) -> Self {
            self.admins = None;
            self
        }

        /// Texts sent so far, in order
        pub fn sent_texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(text, _)| text.clone())
                .collect()
        }

        pub fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn admin_lookups(&self) -> usize {
            self.admin_lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        fn own_id(&self) -> &str {
            &self.own_id
        }

        async fn send_message(&self, text: &str, thread_id: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((text.to_string(), thread_id.to_string()));
            Ok(())
        }

        async fn thread_admins(&self, _thread_id: &str) -> Result<Vec<String>> {
            self.admin_lookups.fetch_add(1, Ordering::SeqCst);
            match &self.admins {
                Some(admins) => Ok(admins.clone()),
                None => anyhow::bail!("thread info unavailable"),
            }
        }
    }

    /// A text message from `sender` in `thread`
    pub fn text_event(sender: &str, thread: &str, is_group: bool, body: &str) -> InboundEvent {
        InboundEvent {
            kind: EventKind::Message,
            message_id: "m1".to_string(),
            sender_id: sender.to_string(),
            sender_name: format!("user-{}", sender),
            thread_id: thread.to_string(),
            is_group,
            body: Some(body.to_string()),
            reply_to_sender: None,
            mentions: HashSet::new(),
            joined: Vec::new(),
        }
    }
}
