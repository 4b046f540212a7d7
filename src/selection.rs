use crate::geometry;
use crate::stroke::{Stroke, StrokeId};
use crate::widgets::Corner;
use egui::{Pos2, Rangef, Rect, Vec2};

/// Minimum width/height a resize box can be dragged down to, in canvas pixels
pub const MIN_RESIZE_DIMENSION: f32 = 10.0;

/// Freehand selection polygon plus the strokes it picked. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LassoSelection {
    pub points: Vec<Pos2>,
    pub selected_stroke_ids: Vec<StrokeId>,
    pub is_active: bool,
}

impl LassoSelection {
    /// Begin a new polygon at `pos`, dropping any previous selection
    pub fn start(&mut self, pos: Pos2) {
        self.points = vec![pos];
        self.selected_stroke_ids.clear();
        self.is_active = false;
    }

    pub fn extend(&mut self, pos: Pos2) {
        self.points.push(pos);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn contains(&self, pos: Pos2) -> bool {
        geometry::point_in_polygon(pos, &self.points)
    }

    pub fn translate(&mut self, delta: Vec2) {
        for point in &mut self.points {
            *point += delta;
        }
    }

    /// Close the polygon and pick every stroke with at least one point inside it.
    ///
    /// Returns true when the selection ended up non-empty (and is now active).
    pub fn finish(&mut self, strokes: &[Stroke]) -> bool {
        self.selected_stroke_ids = if self.points.len() < 3 {
            Vec::new()
        } else {
            strokes
                .iter()
                .filter(|stroke| stroke.points.iter().any(|p| self.contains(*p)))
                .map(|stroke| stroke.id)
                .collect()
        };
        self.is_active = !self.selected_stroke_ids.is_empty();
        self.is_active
    }

    pub fn is_selected(&self, id: StrokeId) -> bool {
        self.selected_stroke_ids.contains(&id)
    }
}

/// The bounding box + handles used to scale or drag a stroke selection.
///
/// `original_strokes` and `initial` are the pristine state captured at the
/// last commit; every drag is computed from them, never compounded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeBox {
    pub rect: Rect,
    pub strokes: Vec<StrokeId>,
    pub original_strokes: Vec<Stroke>,
    pub initial: Rect,
}

impl ResizeBox {
    /// Box around `strokes`, or `None` when they have no points
    pub fn around(strokes: Vec<Stroke>) -> Option<Self> {
        let rect = geometry::strokes_bounds(&strokes)?;
        Some(Self {
            rect,
            strokes: strokes.iter().map(|stroke| stroke.id).collect(),
            original_strokes: strokes,
            initial: rect,
        })
    }

    /// Rect produced by dragging `corner` by `delta` from the initial box.
    ///
    /// The opposite corner stays fixed; each dimension is floored at
    /// [`MIN_RESIZE_DIMENSION`], and left/top handles shift the origin so the
    /// floor does not move the anchored edge.
    pub fn resized_rect(&self, corner: Corner, delta: Vec2) -> Rect {
        let initial = self.initial;

        let width = if corner.moves_left() {
            initial.width() - delta.x
        } else {
            initial.width() + delta.x
        }
        .max(MIN_RESIZE_DIMENSION);
        let height = if corner.moves_top() {
            initial.height() - delta.y
        } else {
            initial.height() + delta.y
        }
        .max(MIN_RESIZE_DIMENSION);

        let x = if corner.moves_left() {
            initial.max.x - width
        } else {
            initial.min.x
        };
        let y = if corner.moves_top() {
            initial.max.y - height
        } else {
            initial.min.y
        };

        Rect::from_min_size(Pos2::new(x, y), Vec2::new(width, height))
    }

    /// Map the original strokes into `target` with independent x/y scale.
    ///
    /// Every original point `p` becomes `target.min + (p - initial.min) * scale`.
    pub fn scaled_strokes(&self, target: Rect) -> Vec<Stroke> {
        self.original_strokes
            .iter()
            .map(|stroke| {
                let mut stroke = stroke.clone();
                for point in &mut stroke.points {
                    *point = self.map_point(target, *point);
                }
                stroke
            })
            .collect()
    }

    /// Where a point expressed relative to the initial box lands inside `target`.
    /// A flat axis (a straight horizontal or vertical stroke) is not scaled,
    /// only moved as far as needed to stay within `target`.
    pub fn map_point(&self, target: Rect, point: Pos2) -> Pos2 {
        Pos2::new(
            map_axis(point.x, self.initial.x_range(), target.x_range()),
            map_axis(point.y, self.initial.y_range(), target.y_range()),
        )
    }

    /// Original strokes shifted by `delta` (box-body drag)
    pub fn translated_strokes(&self, delta: Vec2) -> Vec<Stroke> {
        self.original_strokes
            .iter()
            .map(|stroke| {
                let mut stroke = stroke.clone();
                stroke.translate(delta);
                stroke
            })
            .collect()
    }

    /// Re-freeze the current state as the new source for later drags
    pub fn freeze(&mut self, current: Vec<Stroke>) {
        self.original_strokes = current;
        self.initial = self.rect;
    }
}

fn map_axis(value: f32, initial: Rangef, target: Rangef) -> f32 {
    if initial.span() > f32::EPSILON {
        target.min + (value - initial.min) * (target.span() / initial.span())
    } else {
        let anchor = initial.min.max(target.min).min(target.max);
        value + (anchor - initial.min)
    }
}
