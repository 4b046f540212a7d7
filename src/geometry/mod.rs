use egui::{Pos2, Rect};

pub mod hit_testing;

pub use hit_testing::{HANDLE_HIT_RADIUS, handle_at, point_in_polygon};

/// Calculate the bounding box for a set of points
pub fn points_bounds(points: &[Pos2]) -> Rect {
    if points.is_empty() {
        return Rect::NOTHING;
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    Rect::from_min_max(Pos2::new(min_x, min_y), Pos2::new(max_x, max_y))
}

/// Bounding box of several strokes' points, `None` when there are no points at all
pub fn strokes_bounds<'a>(strokes: impl IntoIterator<Item = &'a crate::Stroke>) -> Option<Rect> {
    strokes
        .into_iter()
        .filter(|stroke| !stroke.points.is_empty())
        .map(|stroke| stroke.bounds())
        .reduce(|a, b| a.union(b))
}

/// Samples the segment `from -> to` every `step` pixels, always including both ends.
///
/// Fast pointer movement produces widely spaced events; sampling the path keeps
/// the eraser from skipping over strokes between two events.
pub fn interpolate_segment(from: Pos2, to: Pos2, step: f32) -> Vec<Pos2> {
    let distance = from.distance(to);
    if step <= 0.0 || distance <= step {
        return if from == to { vec![to] } else { vec![from, to] };
    }

    let steps = (distance / step).ceil() as usize;
    (0..=steps)
        .map(|i| from.lerp(to, i as f32 / steps as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_bounds() {
        let rect = points_bounds(&[Pos2::new(10.0, 5.0), Pos2::new(-2.0, 8.0), Pos2::new(4.0, 20.0)]);
        assert_eq!(rect.min, Pos2::new(-2.0, 5.0));
        assert_eq!(rect.max, Pos2::new(10.0, 20.0));
        assert_eq!(points_bounds(&[]), Rect::NOTHING);
    }

    #[test]
    fn test_interpolation_has_no_gaps() {
        let samples = interpolate_segment(Pos2::new(0.0, 0.0), Pos2::new(10.0, 0.0), 2.0);
        assert_eq!(samples.first(), Some(&Pos2::new(0.0, 0.0)));
        assert_eq!(samples.last(), Some(&Pos2::new(10.0, 0.0)));
        for pair in samples.windows(2) {
            assert!(pair[0].distance(pair[1]) <= 2.0 + f32::EPSILON);
        }
    }

    #[test]
    fn test_interpolation_of_short_segments() {
        let p = Pos2::new(3.0, 3.0);
        assert_eq!(interpolate_segment(p, p, 2.0), vec![p]);
        assert_eq!(interpolate_segment(p, Pos2::new(4.0, 3.0), 2.0).len(), 2);
    }
}
