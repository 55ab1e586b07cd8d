use std::sync::Arc;

use super::events::ServerMessage;

/// Pushes an event to every session currently joined to `room`.
///
/// Implementations must not block and must not fail the caller: delivery is
/// best effort, and the persisted state stays the source of truth.
pub trait EventPublisher: Send + Sync {
    fn emit_to_room(&self, room: &str, message: ServerMessage);
}

/// Optional realtime transport handed to services at construction.
///
/// `None` is the normal state when no websocket hub is attached (tests, CLI
/// tools); emits are then dropped.
#[derive(Clone, Default)]
pub struct Broadcaster {
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl Broadcaster {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            publisher: Some(publisher),
        }
    }

    pub fn disabled() -> Self {
        Self { publisher: None }
    }

    pub fn emit(&self, room: &str, message: ServerMessage) {
        match &self.publisher {
            Some(publisher) => publisher.emit_to_room(room, message),
            None => tracing::trace!(room, "No realtime transport attached, event dropped"),
        }
    }
}
