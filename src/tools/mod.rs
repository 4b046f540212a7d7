use crate::command::{CommandError, ToolKind};
use crate::document::Document;
use crate::layer::LayerRef;
use crate::selection::{LassoSelection, ResizeBox};
use crate::state::EditorState;
use egui::{Color32, Pos2};
use serde::{Deserialize, Serialize};

mod clipboard;
mod draw_tool;
mod eraser_tool;
mod selection_tool;

pub use clipboard::Clipboard;
pub use draw_tool::DrawTool;
pub use eraser_tool::{ERASER_SAMPLE_STEP, EraserMode, EraserTool, erase_points, erase_whole_strokes};
pub use selection_tool::SelectionTool;

/// Per-session tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    #[serde(with = "crate::util::color::hex")]
    pub color: Color32,
    pub brush_size: f32,
    pub eraser_size: f32,
    pub eraser_mode: EraserMode,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            color: Color32::BLACK,
            brush_size: 3.0,
            eraser_size: 10.0,
            eraser_mode: EraserMode::Precision,
        }
    }
}

/// Everything a tool may read or mutate while handling a pointer event
pub struct ToolContext<'a> {
    pub document: &'a mut Document,
    pub state: &'a mut EditorState,
    pub lasso: &'a mut LassoSelection,
    pub resize_box: &'a mut Option<ResizeBox>,
    pub settings: &'a ToolSettings,
    /// The layer selected in the layers panel
    pub layer: Option<LayerRef>,
}

impl ToolContext<'_> {
    /// The selected layer, if it still exists in the document
    pub fn active_layer(&self) -> Option<LayerRef> {
        self.layer.filter(|layer| self.document.has_layer(*layer))
    }
}

/// What the session should do after a tool handled an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Nothing visible changed
    None,
    /// Repaint, nothing to record
    Redraw,
    /// The gesture finished with an edit: record the pre-gesture snapshot and repaint
    Commit,
}

pub type ToolResult = Result<ToolOutcome, CommandError>;

/// Tool trait defines the interface for all canvas tools
pub trait Tool {
    /// Return the name of the tool
    fn name(&self) -> &'static str;

    /// Handle pointer press on the canvas
    fn on_pointer_down(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult;

    /// Handle pointer drag while the pointer is held down
    fn on_pointer_move(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult;

    /// Handle pointer release; finalizes the gesture
    fn on_pointer_up(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult;
}

/// Enum representing all available tool types
#[derive(Debug, Clone, PartialEq)]
pub enum ToolType {
    Draw(DrawTool),
    Eraser(EraserTool),
    Selection(SelectionTool),
}

impl ToolType {
    pub fn from_kind(kind: ToolKind) -> Self {
        match kind {
            ToolKind::Pencil => Self::Draw(DrawTool::new(crate::stroke::DrawingTool::Pencil)),
            ToolKind::Brush => Self::Draw(DrawTool::new(crate::stroke::DrawingTool::Brush)),
            ToolKind::Eraser => Self::Eraser(EraserTool),
            ToolKind::Move => Self::Selection(SelectionTool::new()),
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Draw(tool) => match tool.tool {
                crate::stroke::DrawingTool::Pencil => ToolKind::Pencil,
                crate::stroke::DrawingTool::Brush => ToolKind::Brush,
            },
            Self::Eraser(_) => ToolKind::Eraser,
            Self::Selection(_) => ToolKind::Move,
        }
    }

    pub fn is_selection_tool(&self) -> bool {
        matches!(self, Self::Selection(_))
    }
}

impl Default for ToolType {
    fn default() -> Self {
        Self::from_kind(ToolKind::Pencil)
    }
}

impl Tool for ToolType {
    fn name(&self) -> &'static str {
        match self {
            Self::Draw(tool) => tool.name(),
            Self::Eraser(tool) => tool.name(),
            Self::Selection(tool) => tool.name(),
        }
    }

    fn on_pointer_down(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        match self {
            Self::Draw(tool) => tool.on_pointer_down(pos, ctx),
            Self::Eraser(tool) => tool.on_pointer_down(pos, ctx),
            Self::Selection(tool) => tool.on_pointer_down(pos, ctx),
        }
    }

    fn on_pointer_move(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        match self {
            Self::Draw(tool) => tool.on_pointer_move(pos, ctx),
            Self::Eraser(tool) => tool.on_pointer_move(pos, ctx),
            Self::Selection(tool) => tool.on_pointer_move(pos, ctx),
        }
    }

    fn on_pointer_up(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        match self {
            Self::Draw(tool) => tool.on_pointer_up(pos, ctx),
            Self::Eraser(tool) => tool.on_pointer_up(pos, ctx),
            Self::Selection(tool) => tool.on_pointer_up(pos, ctx),
        }
    }
}
