use crate::layer::{FolderId, LayerDirection, LayerRef, RowId};
use crate::stroke::DrawingTool;
use crate::tools::EraserMode;
use egui::Color32;

/// The tool picked in the tools panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Pencil,
    Brush,
    Eraser,
    /// Lasso select / move / resize
    Move,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [ToolKind::Pencil, ToolKind::Brush, ToolKind::Eraser, ToolKind::Move];

    pub fn label(&self) -> &'static str {
        match self {
            ToolKind::Pencil => "Pencil",
            ToolKind::Brush => "Brush",
            ToolKind::Eraser => "Eraser",
            ToolKind::Move => "Move",
        }
    }

    pub fn drawing_tool(&self) -> Option<DrawingTool> {
        match self {
            ToolKind::Pencil => Some(DrawingTool::Pencil),
            ToolKind::Brush => Some(DrawingTool::Brush),
            _ => None,
        }
    }
}

/// Commands that can be applied to an editor session
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Rows
    AddRow { name: String },
    RenameRow { row: RowId, name: String },
    DeleteRow(RowId),
    SelectRow(Option<RowId>),

    // Frame folders
    AddFolder { row: RowId, frame_index: u32, length: u32 },
    DeleteFolder(FolderId),
    SetFolderLength { folder: FolderId, length: u32 },
    SetFolderImage {
        folder: FolderId,
        image_url: Option<String>,
        file_name: Option<String>,
    },
    RenameFolder { folder: FolderId, name: Option<String> },
    /// Scrub to a frame number (always allowed, even while playing)
    SelectFrame(u32),

    // Layers
    AddLayer(FolderId),
    DeleteLayer(LayerRef),
    ReorderLayer { layer: LayerRef, direction: LayerDirection },
    SetLayerVisibility { layer: LayerRef, visible: bool },
    SetLayerOpacity { layer: LayerRef, opacity: f32 },
    RenameLayer { layer: LayerRef, name: String },
    SelectLayer(Option<LayerRef>),

    // Tools
    SetTool(ToolKind),
    SetBrushColor(Color32),
    SetBrushSize(f32),
    SetEraserSize(f32),
    SetEraserMode(EraserMode),

    // Clipboard, acting on the current lasso selection
    Copy,
    Cut,
    Paste,
    Duplicate,
    DeleteSelection,

    // History
    Undo,
    Redo,

    // View
    SetOnionSkin(bool),
    SetShowGrid(bool),
    SetZoom(f32),
}

impl Command {
    /// True for commands that edit the document and therefore take an undo snapshot
    pub fn is_undoable(&self) -> bool {
        matches!(
            self,
            Command::AddRow { .. }
                | Command::RenameRow { .. }
                | Command::DeleteRow(_)
                | Command::AddFolder { .. }
                | Command::DeleteFolder(_)
                | Command::SetFolderLength { .. }
                | Command::SetFolderImage { .. }
                | Command::RenameFolder { .. }
                | Command::AddLayer(_)
                | Command::DeleteLayer(_)
                | Command::ReorderLayer { .. }
                | Command::SetLayerVisibility { .. }
                | Command::SetLayerOpacity { .. }
                | Command::RenameLayer { .. }
                | Command::Cut
                | Command::Paste
                | Command::Duplicate
                | Command::DeleteSelection
        )
    }
}
