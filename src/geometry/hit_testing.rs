use crate::widgets::resize_handle::Corner;
use egui::{Pos2, Rect};

/// Pointer distance within which a resize handle is grabbed
pub const HANDLE_HIT_RADIUS: f32 = 8.0;

/// Even-odd point-in-polygon test (ray cast towards +x).
///
/// Edges use the half-open rule `(yi > y) != (yj > y)`, so for a point exactly
/// on the boundary the answer is deterministic: points on left/top edges count
/// as inside, points on right/bottom edges count as outside. Polygons with
/// fewer than three vertices contain nothing.
pub fn point_in_polygon(point: Pos2, polygon: &[Pos2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Returns the corner handle of `rect` under `pos`, if any.
///
/// Corners are checked in a fixed order so overlapping handles on tiny boxes
/// resolve the same way every time.
pub fn handle_at(rect: Rect, pos: Pos2, radius: f32) -> Option<Corner> {
    Corner::ALL
        .into_iter()
        .find(|corner| pos.distance(corner.position(rect)) <= radius)
}
