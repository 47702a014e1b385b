use crate::platform::{EventKind, InboundEvent};

/// Outcome of looking at a raw event before any command handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<'a> {
    /// Sent by the bot itself; ignored entirely
    SelfEcho,
    /// Not a text message, or the text is blank
    NotText,
    /// A text message worth parsing, with its body trimmed
    Accept(&'a str),
}

pub fn classify<'a>(event: &'a InboundEvent, own_id: &str) -> Classification<'a> {
    if event.sender_id == own_id {
        return Classification::SelfEcho;
    }
    if event.kind != EventKind::Message {
        return Classification::NotText;
    }
    match event.body.as_deref().map(str::trim) {
        Some(body) if !body.is_empty() => Classification::Accept(body),
        _ => Classification::NotText,
    }
}
