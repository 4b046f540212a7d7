use super::DrawOp;
use crate::image_cache::ImageCache;
use egui::{Color32, Pos2, Rect};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

/// CPU target for display lists, one image pixel per canvas pixel.
/// Blending is straight-alpha source-over.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterCanvas {
    image: RgbaImage,
}

impl RasterCanvas {
    /// A fully transparent canvas
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.image.width() && y < self.image.height()).then(|| self.image.get_pixel(x, y).0)
    }

    pub fn replay(&mut self, ops: &[DrawOp], images: &ImageCache) {
        for op in ops {
            match op {
                DrawOp::FillRect { rect, color } => self.fill_rect(*rect, *color, 1.0),
                DrawOp::Line { from, to, width, color } => self.polyline(&[*from, *to], *width, *color, 1.0),
                DrawOp::Image { url, rect, alpha } => match images.get(url) {
                    Some(image) => self.blit(&image, *rect, *alpha),
                    None => log::warn!("image {} not loaded, exported without it", url),
                },
                DrawOp::Stroke {
                    points,
                    width,
                    color,
                    alpha,
                } => self.polyline(points, *width, *color, *alpha),
                DrawOp::CircleOutline {
                    center,
                    radius,
                    width,
                    color,
                } => self.ring(*center, *radius, *width, *color),
                DrawOp::DashedPath { points, closed, color } => {
                    let mut points = points.clone();
                    if *closed {
                        if let Some(first) = points.first().copied() {
                            points.push(first);
                        }
                    }
                    self.polyline(&points, 1.0, *color, 1.0);
                }
                DrawOp::Handle { rect } => self.fill_rect(*rect, super::SELECTION_COLOR, 1.0),
            }
        }
    }

    /// Pixel bounds of `rect` clipped to the canvas, as (x0, y0, x1, y1) exclusive
    fn clip(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let x0 = rect.min.x.floor().max(0.0) as u32;
        let y0 = rect.min.y.floor().max(0.0) as u32;
        let x1 = (rect.max.x.ceil().max(0.0) as u32).min(self.image.width());
        let y1 = (rect.max.y.ceil().max(0.0) as u32).min(self.image.height());
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }

    fn blend(&mut self, x: u32, y: u32, [r, g, b, a]: [u8; 4], coverage: f32) {
        let src_a = a as f32 / 255.0 * coverage.clamp(0.0, 1.0);
        if src_a <= 0.0 {
            return;
        }
        let dst = self.image.get_pixel_mut(x, y);
        let dst_a = dst.0[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        let mix = |src: u8, dst: u8| {
            let c = (src as f32 * src_a + dst as f32 * dst_a * (1.0 - src_a)) / out_a;
            c.round().clamp(0.0, 255.0) as u8
        };
        *dst = Rgba([
            mix(r, dst.0[0]),
            mix(g, dst.0[1]),
            mix(b, dst.0[2]),
            (out_a * 255.0).round() as u8,
        ]);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color32, alpha: f32) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        let rgba = color.to_srgba_unmultiplied();
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, rgba, alpha);
            }
        }
    }

    /// Round-capped polyline; coverage is antialiased over one pixel
    fn polyline(&mut self, points: &[Pos2], width: f32, color: Color32, alpha: f32) {
        if points.is_empty() {
            return;
        }
        let radius = (width / 2.0).max(0.5);
        let bounds = crate::geometry::points_bounds(points).expand(radius + 1.0);
        let Some((x0, y0, x1, y1)) = self.clip(bounds) else {
            return;
        };
        let rgba = color.to_srgba_unmultiplied();
        for y in y0..y1 {
            for x in x0..x1 {
                let center = Pos2::new(x as f32 + 0.5, y as f32 + 0.5);
                let distance = polyline_distance(points, center);
                let coverage = radius + 0.5 - distance;
                if coverage > 0.0 {
                    self.blend(x, y, rgba, coverage.min(1.0) * alpha);
                }
            }
        }
    }

    fn ring(&mut self, center: Pos2, radius: f32, width: f32, color: Color32) {
        let half = (width / 2.0).max(0.5);
        let bounds = Rect::from_center_size(center, egui::Vec2::splat((radius + half + 1.0) * 2.0));
        let Some((x0, y0, x1, y1)) = self.clip(bounds) else {
            return;
        };
        let rgba = color.to_srgba_unmultiplied();
        for y in y0..y1 {
            for x in x0..x1 {
                let d = (Pos2::new(x as f32 + 0.5, y as f32 + 0.5).distance(center) - radius).abs();
                let coverage = half + 0.5 - d;
                if coverage > 0.0 {
                    self.blend(x, y, rgba, coverage.min(1.0));
                }
            }
        }
    }

    /// Draw `source` scaled to fill `rect`
    fn blit(&mut self, source: &RgbaImage, rect: Rect, alpha: f32) {
        let width = rect.width().round().max(1.0) as u32;
        let height = rect.height().round().max(1.0) as u32;
        let scaled;
        let source = if source.dimensions() == (width, height) {
            source
        } else {
            scaled = image::imageops::resize(source, width, height, FilterType::Triangle);
            &scaled
        };

        let left = rect.min.x.round() as i64;
        let top = rect.min.y.round() as i64;
        for (sx, sy, pixel) in source.enumerate_pixels() {
            let x = left + sx as i64;
            let y = top + sy as i64;
            if x < 0 || y < 0 || x >= self.image.width() as i64 || y >= self.image.height() as i64 {
                continue;
            }
            self.blend(x as u32, y as u32, pixel.0, alpha);
        }
    }
}

fn segment_distance(a: Pos2, b: Pos2, p: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

fn polyline_distance(points: &[Pos2], p: Pos2) -> f32 {
    match points {
        [] => f32::INFINITY,
        [only] => p.distance(*only),
        _ => points
            .windows(2)
            .map(|pair| segment_distance(pair[0], pair[1], p))
            .fold(f32::INFINITY, f32::min),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const BLACK: [u8; 4] = [0, 0, 0, 255];

    fn white_canvas() -> RasterCanvas {
        let mut canvas = RasterCanvas::new(10, 10);
        canvas.replay(
            &[DrawOp::FillRect {
                rect: Rect::from_min_max(Pos2::ZERO, Pos2::new(10.0, 10.0)),
                color: Color32::WHITE,
            }],
            &ImageCache::default(),
        );
        canvas
    }

    #[test]
    fn test_stroke_covers_its_path_only() {
        let mut canvas = white_canvas();
        canvas.replay(
            &[DrawOp::Stroke {
                points: vec![Pos2::new(2.0, 5.0), Pos2::new(8.0, 5.0)],
                width: 2.0,
                color: Color32::BLACK,
                alpha: 1.0,
            }],
            &ImageCache::default(),
        );
        assert_eq!(canvas.pixel(5, 5), Some(BLACK));
        assert_eq!(canvas.pixel(5, 9), Some(WHITE));
        assert_eq!(canvas.pixel(0, 0), Some(WHITE));
    }

    #[test]
    fn test_half_alpha_blends_with_background() {
        let mut canvas = white_canvas();
        canvas.replay(
            &[DrawOp::FillRect {
                rect: Rect::from_min_max(Pos2::ZERO, Pos2::new(4.0, 4.0)),
                color: Color32::BLACK,
            }],
            &ImageCache::default(),
        );
        canvas.fill_rect(Rect::from_min_max(Pos2::new(5.0, 5.0), Pos2::new(6.0, 6.0)), Color32::BLACK, 0.5);
        assert_eq!(canvas.pixel(1, 1), Some(BLACK));
        assert_eq!(canvas.pixel(5, 5), Some([128, 128, 128, 255]));
    }

    #[test]
    fn test_blit_scales_into_rect() {
        let images = ImageCache::default();
        images.insert("blob:red", RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])));
        let mut canvas = white_canvas();
        canvas.replay(
            &[DrawOp::Image {
                url: "blob:red".into(),
                rect: Rect::from_min_max(Pos2::new(2.0, 2.0), Pos2::new(6.0, 6.0)),
                alpha: 1.0,
            }],
            &images,
        );
        assert_eq!(canvas.pixel(5, 5), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(6, 6), Some(WHITE));
        assert_eq!(canvas.pixel(1, 1), Some(WHITE));
    }

    #[test]
    fn test_transparent_canvas_takes_source_alpha() {
        let mut canvas = RasterCanvas::new(2, 2);
        canvas.fill_rect(Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)), Color32::from_rgb(10, 20, 30), 1.0);
        assert_eq!(canvas.pixel(0, 0), Some([10, 20, 30, 255]));
        assert_eq!(canvas.pixel(1, 1), Some([0, 0, 0, 0]));
    }
}
