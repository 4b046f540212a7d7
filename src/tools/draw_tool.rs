use super::{Tool, ToolContext, ToolOutcome, ToolResult};
use crate::state::EditorState;
use crate::stroke::{DrawingTool, Stroke};
use egui::Pos2;

/// Freehand pencil/brush capture. Points are stored raw, never smoothed.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawTool {
    pub tool: DrawingTool,
}

impl DrawTool {
    pub fn new(tool: DrawingTool) -> Self {
        Self { tool }
    }
}

impl Tool for DrawTool {
    fn name(&self) -> &'static str {
        match self.tool {
            DrawingTool::Pencil => "Pencil",
            DrawingTool::Brush => "Brush",
        }
    }

    fn on_pointer_down(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        let Some(layer) = ctx.active_layer() else {
            log::debug!("draw ignored: no layer selected");
            return Ok(ToolOutcome::None);
        };
        if !ctx.state.is_idle() {
            return Ok(ToolOutcome::None);
        }

        let stroke = Stroke::new(layer, self.tool, ctx.settings.color, ctx.settings.brush_size, pos);
        let id = stroke.id;
        ctx.document.add_stroke(layer, stroke)?;
        ctx.state.transition(EditorState::Drawing { layer, stroke: id })?;
        Ok(ToolOutcome::Redraw)
    }

    fn on_pointer_move(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        let Some((layer, stroke)) = ctx.state.drawing_stroke() else {
            return Ok(ToolOutcome::None);
        };
        if ctx.document.append_point(layer, stroke, pos)? {
            Ok(ToolOutcome::Redraw)
        } else {
            Ok(ToolOutcome::None)
        }
    }

    fn on_pointer_up(&mut self, _pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        let Some((layer, stroke)) = ctx.state.drawing_stroke() else {
            return Ok(ToolOutcome::None);
        };
        ctx.state.transition(EditorState::Idle)?;
        let points = ctx.document.stroke(layer, stroke).map_or(0, |s| s.points.len());
        log::info!("✏️ stroke {} completed on {} ({} points)", stroke, layer, points);
        Ok(ToolOutcome::Commit)
    }
}
