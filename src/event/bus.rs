use crate::event::{EditorEvent, EventHandler};
use std::collections::VecDeque;

/// Event queue plus broadcast to registered handlers.
///
/// Handlers see every event as it is emitted; the queue keeps them until the
/// UI drains it once per frame.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<Box<dyn EventHandler>>,
    queue: VecDeque<EditorEvent>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &format!("<{} handlers>", self.handlers.len()))
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler to receive events
    pub fn subscribe(&mut self, handler: Box<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Broadcast an event and queue it for the UI
    pub fn emit(&mut self, event: EditorEvent) {
        for handler in &mut self.handlers {
            handler.handle_event(&event);
        }
        // coalesce repeated redraw requests
        if event == EditorEvent::RedrawRequested && self.queue.back() == Some(&EditorEvent::RedrawRequested) {
            return;
        }
        self.queue.push_back(event);
    }

    /// Take every queued event, oldest first
    pub fn drain(&mut self) -> Vec<EditorEvent> {
        self.queue.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
