use super::{Tool, ToolContext, ToolOutcome, ToolResult};
use crate::command::CommandError;
use crate::geometry::interpolate_segment;
use crate::layer::LayerRef;
use crate::state::EditorState;
use crate::stroke::Stroke;
use egui::Pos2;
use serde::{Deserialize, Serialize};

/// Spacing of the samples taken along the eraser path, in canvas pixels
pub const ERASER_SAMPLE_STEP: f32 = 2.0;

/// How the eraser removes content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EraserMode {
    /// Remove individual points under the eraser
    #[default]
    Precision,
    /// Remove whole strokes touched by the gesture
    Stroke,
}

/// Drop every point within `radius` of a sample, then every stroke left
/// with fewer than two points.
///
/// Returns `None` when nothing changed.
pub fn erase_points(strokes: &[Stroke], samples: &[Pos2], radius: f32) -> Option<Vec<Stroke>> {
    let radius_sq = radius * radius;
    let hit = |p: &Pos2| samples.iter().any(|s| p.distance_sq(*s) <= radius_sq);

    let mut changed = false;
    let mut result = Vec::with_capacity(strokes.len());
    for stroke in strokes {
        let mut kept = stroke.clone();
        if stroke.points.iter().any(hit) {
            kept.points.retain(|p| !hit(p));
            changed = true;
        }
        if kept.points.len() >= 2 {
            result.push(kept);
        } else {
            changed = true;
        }
    }
    changed.then_some(result)
}

/// Remove every stroke with any point within `radius` of any sample.
///
/// Returns `None` when nothing changed.
pub fn erase_whole_strokes(strokes: &[Stroke], samples: &[Pos2], radius: f32) -> Option<Vec<Stroke>> {
    let radius_sq = radius * radius;
    let kept: Vec<Stroke> = strokes
        .iter()
        .filter(|stroke| {
            !stroke
                .points
                .iter()
                .any(|p| samples.iter().any(|s| p.distance_sq(*s) <= radius_sq))
        })
        .cloned()
        .collect();
    (kept.len() != strokes.len()).then_some(kept)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EraserTool;

impl EraserTool {
    /// Erase with `fresh` samples, `all` being the whole gesture so far.
    /// Returns true if the layer changed.
    fn erase(ctx: &mut ToolContext<'_>, layer: LayerRef, fresh: &[Pos2], all: &[Pos2]) -> Result<bool, CommandError> {
        let radius = ctx.settings.eraser_size;
        let strokes = ctx.document.strokes(layer);
        let erased = match ctx.settings.eraser_mode {
            EraserMode::Precision => erase_points(strokes, fresh, radius),
            // whole-gesture hit test, not just the latest segment
            EraserMode::Stroke => erase_whole_strokes(strokes, all, radius),
        };
        match erased {
            Some(strokes) => {
                ctx.document.replace_strokes(layer, strokes)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Tool for EraserTool {
    fn name(&self) -> &'static str {
        "Eraser"
    }

    fn on_pointer_down(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        let Some(layer) = ctx.active_layer() else {
            return Ok(ToolOutcome::None);
        };
        if !ctx.state.is_idle() {
            return Ok(ToolOutcome::None);
        }

        let samples = vec![pos];
        let changed = Self::erase(ctx, layer, &samples, &samples)?;
        ctx.state.transition(EditorState::Erasing {
            layer,
            last: pos,
            samples,
            changed,
        })?;
        Ok(if changed { ToolOutcome::Redraw } else { ToolOutcome::None })
    }

    fn on_pointer_move(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        let EditorState::Erasing { layer, last, samples, changed } = &*ctx.state else {
            return Ok(ToolOutcome::None);
        };
        let (layer, last, was_changed) = (*layer, *last, *changed);

        let fresh = interpolate_segment(last, pos, ERASER_SAMPLE_STEP);
        let mut all = samples.clone();
        all.extend_from_slice(&fresh);

        let now_changed = Self::erase(ctx, layer, &fresh, &all)?;
        *ctx.state = EditorState::Erasing {
            layer,
            last: pos,
            samples: all,
            changed: was_changed || now_changed,
        };
        Ok(if now_changed { ToolOutcome::Redraw } else { ToolOutcome::None })
    }

    fn on_pointer_up(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> ToolResult {
        let mut outcome = self.on_pointer_move(pos, ctx)?;
        if let EditorState::Erasing { layer, changed, .. } = &*ctx.state {
            if *changed {
                log::info!("🧽 erased on {}", layer);
                outcome = ToolOutcome::Commit;
            }
        } else {
            return Ok(outcome);
        }
        ctx.state.transition(EditorState::Idle)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{FolderId, RowId};
    use crate::stroke::DrawingTool;
    use egui::Color32;

    fn stroke(points: &[(f32, f32)]) -> Stroke {
        let layer = LayerRef::Main(FolderId::new(RowId(1), 1));
        let mut stroke = Stroke::new(layer, DrawingTool::Pencil, Color32::BLACK, 2.0, Pos2::new(points[0].0, points[0].1));
        for &(x, y) in &points[1..] {
            stroke.add_point(Pos2::new(x, y));
        }
        stroke
    }

    fn point_total(strokes: &[Stroke]) -> usize {
        strokes.iter().map(|s| s.points.len()).sum()
    }

    #[test]
    fn test_precision_erase_removes_nearby_points() {
        let line = stroke(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0), (40.0, 0.0)]);
        let result = erase_points(&[line.clone()], &[Pos2::new(20.0, 1.0)], 5.0).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, line.id);
        assert_eq!(result[0].points.len(), 4);
        assert!(point_total(&result) <= point_total(&[line]));
    }

    #[test]
    fn test_precision_erase_drops_short_leftovers() {
        let short = stroke(&[(0.0, 0.0), (3.0, 0.0), (50.0, 0.0)]);
        let result = erase_points(&[short], &[Pos2::new(1.0, 0.0)], 5.0).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_precision_erase_drops_single_point_strokes() {
        let dot = stroke(&[(100.0, 100.0)]);
        let line = stroke(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let result = erase_points(&[dot, line.clone()], &[Pos2::new(0.0, 1.0)], 3.0).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, line.id);
        assert!(result.iter().all(|stroke| stroke.points.len() >= 2));

        let far = [Pos2::new(500.0, 500.0)];
        assert!(erase_points(&[line], &far, 3.0).is_none());
    }

    #[test]
    fn test_stroke_mode_uses_whole_gesture() {
        let a = stroke(&[(0.0, 0.0), (5.0, 0.0)]);
        let b = stroke(&[(100.0, 0.0), (105.0, 0.0)]);
        let gesture = [Pos2::new(0.0, 1.0), Pos2::new(50.0, 50.0), Pos2::new(101.0, 0.0)];
        let result = erase_whole_strokes(&[a, b.clone()], &gesture, 3.0).unwrap();
        assert!(result.is_empty());

        let far = [Pos2::new(500.0, 500.0)];
        assert!(erase_whole_strokes(&[b], &far, 3.0).is_none());
    }
}
