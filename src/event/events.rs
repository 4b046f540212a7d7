use crate::command::ToolKind;
use crate::layer::{FolderId, LayerRef};

/// Notifications emitted by the editor session. The UI drains them each frame.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Something visible changed; repaint the canvas
    RedrawRequested,
    FrameChanged { old: u32, new: u32 },
    /// An edit was committed, undone or redone
    HistoryChanged { can_undo: bool, can_redo: bool },
    LayerChanged(LayerEvent),
    SelectionChanged(SelectionEvent),
    ToolChanged { old: ToolKind, new: ToolKind },
    StrokeCompleted { layer: LayerRef },
    /// A raster asset finished loading (or failed) in the image cache
    ImageLoaded { url: String, ok: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    Added(LayerRef),
    Removed(LayerRef),
    Reordered(LayerRef),
    PropsChanged(LayerRef),
    Selected(Option<LayerRef>),
    FolderAdded(FolderId),
    FolderRemoved(FolderId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    Created { strokes: usize },
    Cleared,
    Modified,
}
