use super::{DrawOp, SELECTION_COLOR};
use crate::image_cache::ImageCache;
use crate::input::CanvasView;
use crate::texture_manager::{color_image, TextureManager};
use egui::{Color32, Painter, Pos2, Rect, Shape, Stroke};

const DASH_LENGTH: f32 = 6.0;
const GAP_LENGTH: f32 = 4.0;

/// Replay a display list onto an egui painter through `view`
pub fn paint_ops(
    painter: &Painter,
    view: &CanvasView,
    ops: &[DrawOp],
    images: &ImageCache,
    textures: &mut TextureManager,
) {
    let zoom = view.zoom;
    for op in ops {
        match op {
            DrawOp::FillRect { rect, color } => {
                painter.rect_filled(view.canvas_rect_to_screen(*rect), 0.0, *color);
            }
            DrawOp::Line { from, to, width, color } => {
                painter.line_segment(
                    [view.canvas_to_screen(*from), view.canvas_to_screen(*to)],
                    Stroke::new(*width, *color),
                );
            }
            DrawOp::Image { url, rect, alpha } => {
                let Some(image) = images.get(url) else {
                    continue;
                };
                match textures.get_or_create_texture(url, || color_image(&image), painter.ctx()) {
                    Ok(texture) => {
                        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
                        let tint = Color32::WHITE.gamma_multiply(*alpha);
                        painter.image(texture, view.canvas_rect_to_screen(*rect), uv, tint);
                    }
                    Err(err) => log::warn!("cannot upload {}: {}", url, err),
                }
            }
            DrawOp::Stroke {
                points,
                width,
                color,
                alpha,
            } => {
                let color = color.gamma_multiply(*alpha);
                let width = width * zoom;
                let screen: Vec<Pos2> = points.iter().map(|p| view.canvas_to_screen(*p)).collect();
                match screen.as_slice() {
                    [] => {}
                    [dot] => {
                        painter.circle_filled(*dot, width / 2.0, color);
                    }
                    _ => {
                        painter.add(Shape::line(screen.clone(), Stroke::new(width, color)));
                        // round caps
                        for end in [screen[0], screen[screen.len() - 1]] {
                            painter.circle_filled(end, width / 2.0, color);
                        }
                    }
                }
            }
            DrawOp::CircleOutline {
                center,
                radius,
                width,
                color,
            } => {
                painter.circle_stroke(view.canvas_to_screen(*center), radius * zoom, Stroke::new(*width, *color));
            }
            DrawOp::DashedPath { points, closed, color } => {
                let mut screen: Vec<Pos2> = points.iter().map(|p| view.canvas_to_screen(*p)).collect();
                if *closed {
                    if let Some(first) = screen.first().copied() {
                        screen.push(first);
                    }
                }
                painter.extend(Shape::dashed_line(&screen, Stroke::new(1.0, *color), DASH_LENGTH, GAP_LENGTH));
            }
            DrawOp::Handle { rect } => {
                // handles keep their on-screen size at any zoom
                let handle = Rect::from_center_size(view.canvas_to_screen(rect.center()), rect.size());
                painter.rect_filled(handle, 2.0, SELECTION_COLOR);
                painter.rect_stroke(handle, 2.0, Stroke::new(1.0, Color32::WHITE));
            }
        }
    }
}
