use super::{Tool, ToolContext, ToolOutcome, ToolResult};
use crate::geometry::{HANDLE_HIT_RADIUS, handle_at};
use crate::layer::LayerRef;
use crate::selection::ResizeBox;
use crate::state::{EditorState, ResizeHandle};
use crate::stroke::Stroke;
use egui::{Pos2, Rect};

/// Lasso selection, move and resize of stroke groups on the selected layer
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionTool {
    pub handle_size: f32,
}

impl Default for SelectionTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionTool {
    pub fn new() -> Self {
        Self {
            handle_size: HANDLE_HIT_RADIUS,
        }
    }

    fn start_lasso(&self, layer: LayerRef, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        ctx.lasso.start(pos);
        *ctx.resize_box = None;
        ctx.state.transition(EditorState::LassoBuilding { layer })?;
        Ok(ToolOutcome::Redraw)
    }

    /// Current versions of the selected strokes, in layer order
    fn selected_strokes(layer: LayerRef, ctx: &ToolContext<'_>) -> Vec<Stroke> {
        ctx.document
            .strokes(layer)
            .iter()
            .filter(|stroke| ctx.lasso.is_selected(stroke.id))
            .cloned()
            .collect()
    }

    /// Apply the drag at `pos` to whatever gesture is running
    fn drag(&self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        match ctx.state.clone() {
            EditorState::LassoBuilding { .. } => {
                ctx.lasso.extend(pos);
                Ok(ToolOutcome::Redraw)
            }
            EditorState::Moving {
                layer,
                start,
                origin,
                lasso_origin,
                box_origin,
            } => {
                let delta = pos - start;
                let moved: Vec<Stroke> = origin
                    .iter()
                    .map(|stroke| {
                        let mut stroke = stroke.clone();
                        stroke.translate(delta);
                        stroke
                    })
                    .collect();
                ctx.document.update_strokes(layer, &moved)?;
                ctx.lasso.points = lasso_origin.iter().map(|p| *p + delta).collect();
                if let (Some(resize_box), Some(rect)) = (ctx.resize_box.as_mut(), box_origin) {
                    resize_box.rect = rect.translate(delta);
                }
                Ok(ToolOutcome::Redraw)
            }
            EditorState::Resizing {
                layer,
                handle,
                start,
                lasso_origin,
            } => {
                let Some(resize_box) = ctx.resize_box.as_mut() else {
                    return Ok(ToolOutcome::None);
                };
                let delta = pos - start;
                let (strokes, target) = match handle {
                    ResizeHandle::Corner(corner) => {
                        let target = resize_box.resized_rect(corner, delta);
                        (resize_box.scaled_strokes(target), target)
                    }
                    ResizeHandle::Body => (
                        resize_box.translated_strokes(delta),
                        resize_box.initial.translate(delta),
                    ),
                };
                ctx.lasso.points = lasso_origin
                    .iter()
                    .map(|p| resize_box.map_point(target, *p))
                    .collect();
                resize_box.rect = target;
                ctx.document.update_strokes(layer, &strokes)?;
                Ok(ToolOutcome::Redraw)
            }
            _ => Ok(ToolOutcome::None),
        }
    }
}

impl Tool for SelectionTool {
    fn name(&self) -> &'static str {
        "Move"
    }

    fn on_pointer_down(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        let Some(layer) = ctx.active_layer() else {
            return Ok(ToolOutcome::None);
        };

        match ctx.state.clone() {
            EditorState::Idle => self.start_lasso(layer, pos, ctx),
            EditorState::LassoActive { layer: selected } if selected == layer => {
                let box_rect: Option<Rect> = ctx.resize_box.as_ref().map(|rb| rb.rect);
                let lasso_origin = ctx.lasso.points.clone();

                if let Some(corner) = box_rect.and_then(|rect| handle_at(rect, pos, self.handle_size)) {
                    log::debug!("resize from {}", corner.as_str());
                    ctx.state.transition(EditorState::Resizing {
                        layer,
                        handle: ResizeHandle::Corner(corner),
                        start: pos,
                        lasso_origin,
                    })?;
                } else if ctx.lasso.contains(pos) {
                    let origin = Self::selected_strokes(layer, ctx);
                    ctx.state.transition(EditorState::Moving {
                        layer,
                        start: pos,
                        origin,
                        lasso_origin,
                        box_origin: box_rect,
                    })?;
                } else if box_rect.is_some_and(|rect| rect.contains(pos)) {
                    ctx.state.transition(EditorState::Resizing {
                        layer,
                        handle: ResizeHandle::Body,
                        start: pos,
                        lasso_origin,
                    })?;
                } else {
                    ctx.lasso.clear();
                    return self.start_lasso(layer, pos, ctx);
                }
                Ok(ToolOutcome::Redraw)
            }
            EditorState::LassoActive { .. } => {
                // selection belongs to another layer
                ctx.lasso.clear();
                ctx.state.transition(EditorState::Idle)?;
                self.start_lasso(layer, pos, ctx)
            }
            _ => Ok(ToolOutcome::None),
        }
    }

    fn on_pointer_move(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        self.drag(pos, ctx)
    }

    fn on_pointer_up(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        match ctx.state.clone() {
            EditorState::LassoBuilding { layer } => {
                if ctx.lasso.finish(ctx.document.strokes(layer)) {
                    let selected = Self::selected_strokes(layer, ctx);
                    log::info!("lasso selected {} strokes", selected.len());
                    *ctx.resize_box = ResizeBox::around(selected);
                    ctx.state.transition(EditorState::LassoActive { layer })?;
                } else {
                    ctx.lasso.clear();
                    *ctx.resize_box = None;
                    ctx.state.transition(EditorState::Idle)?;
                }
                Ok(ToolOutcome::Redraw)
            }
            EditorState::Moving { layer, start, .. } | EditorState::Resizing { layer, start, .. } => {
                self.drag(pos, ctx)?;
                let current = Self::selected_strokes(layer, ctx);
                if let Some(resize_box) = ctx.resize_box.as_mut() {
                    resize_box.freeze(current);
                }
                ctx.state.transition(EditorState::LassoActive { layer })?;
                if pos == start {
                    Ok(ToolOutcome::Redraw)
                } else {
                    log::info!("transformed selection on {}", layer);
                    Ok(ToolOutcome::Commit)
                }
            }
            _ => Ok(ToolOutcome::None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::selection::LassoSelection;
    use crate::stroke::DrawingTool;
    use crate::tools::ToolSettings;
    use egui::{Color32, Vec2};

    struct Fixture {
        document: Document,
        state: EditorState,
        lasso: LassoSelection,
        resize_box: Option<ResizeBox>,
        settings: ToolSettings,
        layer: LayerRef,
    }

    impl Fixture {
        fn new() -> Self {
            let mut document = Document::new();
            let row = document.add_row("Row 1");
            let folder = document.add_folder(row, 1, 1).unwrap();
            let layer = folder.main_layer();
            Self {
                document,
                state: EditorState::Idle,
                lasso: LassoSelection::default(),
                resize_box: None,
                settings: ToolSettings::default(),
                layer,
            }
        }

        fn ctx(&mut self) -> ToolContext<'_> {
            ToolContext {
                document: &mut self.document,
                state: &mut self.state,
                lasso: &mut self.lasso,
                resize_box: &mut self.resize_box,
                settings: &self.settings,
                layer: Some(self.layer),
            }
        }

        fn add(&mut self, points: &[(f32, f32)]) -> Stroke {
            let mut stroke = Stroke::new(self.layer, DrawingTool::Pencil, Color32::BLACK, 2.0, Pos2::new(points[0].0, points[0].1));
            for &(x, y) in &points[1..] {
                stroke.add_point(Pos2::new(x, y));
            }
            self.document.add_stroke(self.layer, stroke.clone()).unwrap();
            stroke
        }
    }

    fn lasso_square(tool: &mut SelectionTool, f: &mut Fixture, min: f32, max: f32) {
        tool.on_pointer_down(Pos2::new(min, min), &mut f.ctx()).unwrap();
        tool.on_pointer_move(Pos2::new(max, min), &mut f.ctx()).unwrap();
        tool.on_pointer_move(Pos2::new(max, max), &mut f.ctx()).unwrap();
        tool.on_pointer_move(Pos2::new(min, max), &mut f.ctx()).unwrap();
        tool.on_pointer_up(Pos2::new(min, max), &mut f.ctx()).unwrap();
    }

    #[test]
    fn test_lasso_then_move() {
        let mut f = Fixture::new();
        let inside = f.add(&[(10.0, 10.0), (20.0, 20.0)]);
        let outside = f.add(&[(200.0, 200.0), (210.0, 210.0)]);
        let mut tool = SelectionTool::new();

        lasso_square(&mut tool, &mut f, 0.0, 50.0);
        assert!(matches!(f.state, EditorState::LassoActive { .. }));
        assert_eq!(f.lasso.selected_stroke_ids, vec![inside.id]);

        tool.on_pointer_down(Pos2::new(35.0, 35.0), &mut f.ctx()).unwrap();
        assert!(matches!(f.state, EditorState::Moving { .. }));
        tool.on_pointer_move(Pos2::new(40.0, 35.0), &mut f.ctx()).unwrap();
        let outcome = tool.on_pointer_up(Pos2::new(45.0, 40.0), &mut f.ctx()).unwrap();

        assert_eq!(outcome, ToolOutcome::Commit);
        let moved = f.document.stroke(f.layer, inside.id).unwrap();
        assert_eq!(moved.points[0], Pos2::new(20.0, 15.0));
        assert_eq!(f.document.stroke(f.layer, outside.id).unwrap().points, outside.points);
        assert_eq!(f.lasso.points[0], Pos2::new(10.0, 5.0));
        assert_eq!(f.resize_box.as_ref().unwrap().initial.min, Pos2::new(20.0, 15.0));
    }

    #[test]
    fn test_corner_resize_scales_selection() {
        let mut f = Fixture::new();
        let stroke = f.add(&[(10.0, 10.0), (110.0, 60.0)]);
        let mut tool = SelectionTool::new();
        lasso_square(&mut tool, &mut f, 0.0, 150.0);

        tool.on_pointer_down(Pos2::new(110.0, 60.0), &mut f.ctx()).unwrap();
        assert!(matches!(
            f.state,
            EditorState::Resizing { handle: ResizeHandle::Corner(crate::widgets::Corner::BottomRight), .. }
        ));
        tool.on_pointer_up(Pos2::new(210.0, 110.0), &mut f.ctx()).unwrap();

        let scaled = f.document.stroke(f.layer, stroke.id).unwrap();
        assert_eq!(scaled.points, vec![Pos2::new(10.0, 10.0), Pos2::new(210.0, 110.0)]);
        let rb = f.resize_box.as_ref().unwrap();
        assert_eq!(rb.initial.size(), Vec2::new(200.0, 100.0));
    }

    #[test]
    fn test_click_outside_starts_new_lasso() {
        let mut f = Fixture::new();
        f.add(&[(10.0, 10.0), (20.0, 20.0)]);
        let mut tool = SelectionTool::new();
        lasso_square(&mut tool, &mut f, 0.0, 50.0);

        tool.on_pointer_down(Pos2::new(400.0, 400.0), &mut f.ctx()).unwrap();
        assert!(matches!(f.state, EditorState::LassoBuilding { .. }));
        assert!(f.lasso.selected_stroke_ids.is_empty());
        assert!(f.resize_box.is_none());
    }

    #[test]
    fn test_empty_lasso_returns_to_idle() {
        let mut f = Fixture::new();
        let mut tool = SelectionTool::new();
        lasso_square(&mut tool, &mut f, 0.0, 50.0);
        assert!(f.state.is_idle());
        assert!(f.resize_box.is_none());
    }
}
