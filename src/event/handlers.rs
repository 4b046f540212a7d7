use crate::event::{EditorEvent, EventHandler};

/// Logs every editor event at debug level
#[derive(Debug, Default)]
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn handle_event(&mut self, event: &EditorEvent) {
        match event {
            EditorEvent::RedrawRequested => {}
            EditorEvent::HistoryChanged { can_undo, can_redo } => {
                log::debug!("history changed (undo: {}, redo: {})", can_undo, can_redo);
            }
            other => log::debug!("event: {:?}", other),
        }
    }
}
