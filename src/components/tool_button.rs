use crate::command::ToolKind;
use egui::{Align2, Color32, FontId, Response, Sense, Stroke, Ui, Vec2, Widget};

const BUTTON_SIZE: Vec2 = Vec2::splat(32.0);
const SELECTED_FILL: Color32 = Color32::from_rgb(100, 181, 246);
const SELECTED_BORDER: Color32 = Color32::from_rgb(33, 150, 243);

/// Square icon button used for tool selection
pub struct ToolButton {
    pub tool: ToolKind,
    pub selected: bool,
}

impl ToolButton {
    pub fn new(tool: ToolKind, selected: bool) -> Self {
        Self { tool, selected }
    }

    pub fn icon(tool: ToolKind) -> &'static str {
        match tool {
            ToolKind::Pencil => "✏",
            ToolKind::Brush => "🖌",
            ToolKind::Eraser => "⌫",
            ToolKind::Move => "⬚",
        }
    }

    fn fill(&self, response: &Response) -> Color32 {
        match (self.selected, response.hovered()) {
            (true, _) => SELECTED_FILL,
            (false, true) => Color32::from_gray(60),
            (false, false) => Color32::from_gray(40),
        }
    }
}

impl Widget for ToolButton {
    fn ui(self, ui: &mut Ui) -> Response {
        let (rect, response) = ui.allocate_exact_size(BUTTON_SIZE, Sense::click());
        if ui.is_rect_visible(rect) {
            let painter = ui.painter();
            painter.rect_filled(rect, 4.0, self.fill(&response));
            let ink = if self.selected { Color32::BLACK } else { Color32::WHITE };
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                Self::icon(self.tool),
                FontId::proportional(20.0),
                ink,
            );
            if self.selected {
                painter.rect_stroke(rect, 4.0, Stroke::new(2.0, SELECTED_BORDER));
            }
        }
        response.on_hover_text(self.tool.label())
    }
}
