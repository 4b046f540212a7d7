mod bus;
mod events;
mod handlers;

pub use bus::EventBus;
pub use events::{EditorEvent, LayerEvent, SelectionEvent};
pub use handlers::LoggingEventHandler;

pub trait EventHandler: Send {
    fn handle_event(&mut self, event: &EditorEvent);
}
