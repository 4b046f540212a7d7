use super::{ToolContext, ToolOutcome, ToolResult};
use crate::command::CommandError;
use crate::layer::LayerRef;
use crate::selection::ResizeBox;
use crate::state::EditorState;
use crate::stroke::Stroke;
use egui::Vec2;

/// Stroke clipboard for copy/cut/paste/duplicate on the lasso selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clipboard {
    strokes: Vec<Stroke>,
}

impl Clipboard {
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Layer and strokes of the current selection; `None` when nothing is selected
    fn selection(ctx: &ToolContext<'_>) -> Option<(LayerRef, Vec<Stroke>)> {
        let EditorState::LassoActive { layer } = *ctx.state else {
            return None;
        };
        if !ctx.lasso.is_active {
            return None;
        }
        let strokes: Vec<Stroke> = ctx
            .document
            .strokes(layer)
            .iter()
            .filter(|stroke| ctx.lasso.is_selected(stroke.id))
            .cloned()
            .collect();
        (!strokes.is_empty()).then_some((layer, strokes))
    }

    pub fn copy(&mut self, ctx: &ToolContext<'_>) -> ToolResult {
        match Self::selection(ctx) {
            Some((_, strokes)) => {
                log::info!("📋 copied {} strokes", strokes.len());
                self.strokes = strokes;
                Ok(ToolOutcome::None)
            }
            None => Ok(ToolOutcome::None),
        }
    }

    pub fn cut(&mut self, ctx: &mut ToolContext<'_>) -> ToolResult {
        if Self::selection(ctx).is_none() {
            return Ok(ToolOutcome::None);
        }
        self.copy(ctx)?;
        Self::delete_selection(ctx)
    }

    /// Remove the selected strokes and drop the selection
    pub fn delete_selection(ctx: &mut ToolContext<'_>) -> ToolResult {
        let Some((layer, _)) = Self::selection(ctx) else {
            return Ok(ToolOutcome::None);
        };
        let lasso = &*ctx.lasso;
        let removed = ctx.document.remove_strokes(layer, |stroke| lasso.is_selected(stroke.id))?;
        log::info!("deleted {} selected strokes", removed.len());
        ctx.lasso.clear();
        *ctx.resize_box = None;
        ctx.state.transition(EditorState::Idle)?;
        Ok(ToolOutcome::Commit)
    }

    /// Paste the clipboard into the selected layer at its original position,
    /// selecting the pasted copies
    pub fn paste(&self, ctx: &mut ToolContext<'_>) -> ToolResult {
        if self.strokes.is_empty() || ctx.state.is_gesture() {
            return Ok(ToolOutcome::None);
        }
        let Some(layer) = ctx.active_layer() else {
            return Ok(ToolOutcome::None);
        };

        let pasted: Vec<Stroke> = self
            .strokes
            .iter()
            .map(|stroke| stroke.duplicate_onto(layer, Vec2::ZERO))
            .collect();
        for stroke in &pasted {
            ctx.document.add_stroke(layer, stroke.clone())?;
        }
        log::info!("📋 pasted {} strokes into {}", pasted.len(), layer);

        let Some(resize_box) = ResizeBox::around(pasted.clone()) else {
            return Ok(ToolOutcome::Commit);
        };
        let rect = resize_box.rect;
        ctx.lasso.points = vec![rect.left_top(), rect.right_top(), rect.right_bottom(), rect.left_bottom()];
        Self::select(ctx, layer, &pasted, resize_box)?;
        Ok(ToolOutcome::Commit)
    }

    /// Copy the selection in place with `offset`, moving the outline along and
    /// selecting the copies so they can be dragged straight away
    pub fn duplicate(ctx: &mut ToolContext<'_>, offset: Vec2) -> ToolResult {
        let Some((layer, strokes)) = Self::selection(ctx) else {
            return Ok(ToolOutcome::None);
        };
        let copies: Vec<Stroke> = strokes.iter().map(|stroke| stroke.duplicate(offset)).collect();
        for stroke in &copies {
            ctx.document.add_stroke(layer, stroke.clone())?;
        }
        ctx.lasso.translate(offset);
        log::info!("duplicated {} strokes", copies.len());

        match ResizeBox::around(copies.clone()) {
            Some(resize_box) => Self::select(ctx, layer, &copies, resize_box)?,
            None => *ctx.resize_box = None,
        }
        Ok(ToolOutcome::Commit)
    }

    fn select(ctx: &mut ToolContext<'_>, layer: LayerRef, strokes: &[Stroke], resize_box: ResizeBox) -> Result<(), CommandError> {
        ctx.lasso.selected_stroke_ids = strokes.iter().map(|stroke| stroke.id).collect();
        ctx.lasso.is_active = true;
        *ctx.resize_box = Some(resize_box);
        ctx.state.transition(EditorState::LassoActive { layer })?;
        Ok(())
    }
}

