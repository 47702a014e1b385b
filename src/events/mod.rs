pub mod welcome;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::lang::Lang;
use crate::platform::{EventKind, InboundEvent, Transport};

/// Reacts to every non-self event of one kind, independently of commands.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn kind(&self) -> EventKind;

    async fn run(&self, transport: &dyn Transport, event: &InboundEvent) -> Result<()>;
}

/// Event handlers keyed by the kind they react to
#[derive(Default)]
pub struct EventTable {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; a later handler for the same kind replaces the earlier one
    pub fn register(&mut self, handler: impl EventHandler + 'static) {
        let kind = handler.kind();
        if self.handlers.insert(kind, Arc::new(handler)).is_some() {
            warn!("Event handler for '{}' replaced", kind);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Start the handler for the event's kind in the background, if there is one.
    /// The pipeline does not wait for it; failures are only logged.
    pub fn fire(&self, transport: &Arc<dyn Transport>, event: &InboundEvent) {
        let Some(handler) = self.handlers.get(&event.kind) else {
            return;
        };
        let handler = Arc::clone(handler);
        let transport = Arc::clone(transport);
        let event = event.clone();
        tokio::spawn(async move {
            if let Err(e) = handler.run(transport.as_ref(), &event).await {
                warn!(
                    "Event handler for '{}' failed in thread {}: {:#}",
                    event.kind, event.thread_id, e
                );
            }
        });
    }
}

/// The bundled event handlers
pub fn builtin_events(lang: &Lang) -> EventTable {
    let mut table = EventTable::new();
    table.register(welcome::WelcomeHandler::new(lang.clone()));

    info!("Loaded {} events", table.len());
    table
}
