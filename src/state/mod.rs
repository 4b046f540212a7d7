mod editor_state;
mod session;

pub use editor_state::{EditorState, ResizeHandle, TransitionError};
pub use session::{EditorSession, ViewState, MAX_ZOOM, MIN_ZOOM};
