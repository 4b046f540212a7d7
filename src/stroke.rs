use crate::layer::LayerRef;
use egui::{Color32, Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a stroke. Survives moves and resizes, re-minted on duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeId(pub Uuid);

impl StrokeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StrokeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The drawing tool that produced a stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingTool {
    Pencil,
    Brush,
}

/// A freehand vector stroke in canvas pixel space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub id: StrokeId,
    /// Raw captured points, never resampled
    pub points: Vec<Pos2>,
    #[serde(with = "crate::util::color::hex")]
    pub color: Color32,
    pub brush_size: f32,
    pub tool: DrawingTool,
    #[serde(rename = "layerId")]
    pub layer: LayerRef,
}

impl Stroke {
    /// Starts a stroke seeded with its first point
    pub fn new(layer: LayerRef, tool: DrawingTool, color: Color32, brush_size: f32, start: Pos2) -> Self {
        Self {
            id: StrokeId::new(),
            points: vec![start],
            color,
            brush_size,
            tool,
            layer,
        }
    }

    pub fn add_point(&mut self, point: Pos2) {
        self.points.push(point);
    }

    /// Bounding box of the raw points (brush size not included)
    pub fn bounds(&self) -> Rect {
        crate::geometry::points_bounds(&self.points)
    }

    pub fn translate(&mut self, delta: Vec2) {
        for point in &mut self.points {
            *point += delta;
        }
    }

    /// Copy with a freshly minted id, optionally offset
    pub fn duplicate(&self, offset: Vec2) -> Self {
        let mut copy = self.clone();
        copy.id = StrokeId::new();
        copy.translate(offset);
        copy
    }

    /// Copy with a fresh id re-homed onto another layer
    pub fn duplicate_onto(&self, layer: LayerRef, offset: Vec2) -> Self {
        let mut copy = self.duplicate(offset);
        copy.layer = layer;
        copy
    }

    /// A stroke needs at least two points to render as a line
    pub fn is_renderable_line(&self) -> bool {
        self.points.len() >= 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{FolderId, RowId};

    fn layer() -> LayerRef {
        LayerRef::Main(FolderId::new(RowId(1), 1))
    }

    #[test]
    fn test_duplicate_mints_new_id() {
        let mut stroke = Stroke::new(layer(), DrawingTool::Pencil, Color32::BLACK, 2.0, Pos2::new(1.0, 1.0));
        stroke.add_point(Pos2::new(5.0, 5.0));

        let copy = stroke.duplicate(Vec2::new(10.0, 10.0));
        assert_ne!(copy.id, stroke.id);
        assert_eq!(copy.points, vec![Pos2::new(11.0, 11.0), Pos2::new(15.0, 15.0)]);
        assert_eq!(copy.color, stroke.color);
    }

    #[test]
    fn test_stroke_json_shape() {
        let stroke = Stroke::new(layer(), DrawingTool::Brush, Color32::from_rgb(255, 0, 0), 4.0, Pos2::new(1.0, 2.0));
        let value = serde_json::to_value(&stroke).unwrap();
        assert_eq!(value["color"], "#ff0000");
        assert_eq!(value["tool"], "brush");
        assert_eq!(value["layerId"], "row-1-1-main");
        assert_eq!(value["brushSize"], 4.0);
        assert_eq!(value["points"][0]["x"], 1.0);
    }
}
