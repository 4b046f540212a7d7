//! Frame compositing.
//!
//! The [`Compositor`] turns a frame of the document into a flat display list
//! of [`DrawOp`]s in fixed z-order:
//!
//! ```text
//! background → grid → onion skin (frame - 1) → folder layers bottom-to-top
//!            → in-progress stroke → eraser cursor → lasso → resize box
//! ```
//!
//! The list is replayed either onto an `egui::Painter` ([`painter`]) or onto a
//! CPU [`RasterCanvas`] for export. Export lists stop after the layer pass.

pub mod painter;
pub mod raster;

pub use painter::paint_ops;
pub use raster::RasterCanvas;

use crate::config::EditorConfig;
use crate::document::Document;
use crate::image_cache::ImageCache;
use crate::layer::{LayerRef, RowId};
use crate::state::EditorSession;
use crate::stroke::{Stroke, StrokeId};
use crate::widgets::{handle_rect, Corner};
use egui::{Color32, Pos2, Rect, Vec2};

pub const BACKGROUND_COLOR: Color32 = Color32::WHITE;
pub const GRID_COLOR: Color32 = Color32::from_rgb(225, 225, 225);
pub const SELECTION_COLOR: Color32 = Color32::from_rgb(30, 120, 255);
pub const ERASER_CURSOR_COLOR: Color32 = Color32::from_rgb(90, 90, 90);

/// One primitive of the display list, in canvas pixel space
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect {
        rect: Rect,
        color: Color32,
    },
    Line {
        from: Pos2,
        to: Pos2,
        width: f32,
        color: Color32,
    },
    /// A cached raster asset scaled into `rect`
    Image {
        url: String,
        rect: Rect,
        alpha: f32,
    },
    /// Freehand polyline with round caps; a single point draws a dot
    Stroke {
        points: Vec<Pos2>,
        width: f32,
        color: Color32,
        alpha: f32,
    },
    CircleOutline {
        center: Pos2,
        radius: f32,
        width: f32,
        color: Color32,
    },
    DashedPath {
        points: Vec<Pos2>,
        closed: bool,
        color: Color32,
    },
    Handle {
        rect: Rect,
    },
}

impl DrawOp {
    fn stroke(stroke: &Stroke, alpha: f32) -> Self {
        Self::Stroke {
            points: stroke.points.clone(),
            width: stroke.brush_size,
            color: stroke.color,
            alpha,
        }
    }
}

/// Builds display lists for a canvas of a fixed size
#[derive(Debug, Clone, PartialEq)]
pub struct Compositor {
    pub canvas_size: Vec2,
    /// Global alpha of the onion-skinned previous frame
    pub onion_alpha: f32,
    pub grid_pitch: f32,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl Compositor {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            canvas_size: config.canvas_size(),
            onion_alpha: config.onion_skin_alpha.clamp(0.0, 1.0),
            grid_pitch: config.grid_pitch.max(1.0),
        }
    }

    pub fn canvas_rect(&self) -> Rect {
        Rect::from_min_size(Pos2::ZERO, self.canvas_size)
    }

    /// Scale an image down (never up) to fit the canvas, keeping its aspect ratio, and centre it
    pub fn fit_image(&self, width: u32, height: u32) -> Rect {
        let size = Vec2::new(width as f32, height as f32);
        let scale = if size.x > 0.0 && size.y > 0.0 {
            (self.canvas_size.x / size.x).min(self.canvas_size.y / size.y).min(1.0)
        } else {
            1.0
        };
        Rect::from_center_size(self.canvas_rect().center(), size * scale)
    }

    /// Interactive display list for the session's current frame
    pub fn compose(&self, session: &EditorSession, images: &ImageCache) -> Vec<DrawOp> {
        let document = session.document();
        let frame = session.current_frame();
        let view = session.view();
        let in_progress = session.in_progress_stroke();
        let mut ops = Vec::new();

        // no folder under the cursor frame means no frame is selected
        self.background(session.selected_folder().map(|_| frame), &mut ops);
        if view.show_grid {
            self.grid(&mut ops);
        }
        if view.onion_skin && frame > 1 {
            self.layer_pass(document, frame - 1, self.onion_alpha, None, None, images, &mut ops);
        }
        self.layer_pass(document, frame, 1.0, in_progress.map(|s| s.id), None, images, &mut ops);

        if let Some(stroke) = in_progress {
            ops.push(DrawOp::stroke(stroke, 1.0));
        }
        if let Some((center, radius)) = session.eraser_cursor() {
            ops.push(DrawOp::CircleOutline {
                center,
                radius,
                width: 1.0,
                color: ERASER_CURSOR_COLOR,
            });
        }
        let lasso = session.lasso();
        if lasso.points.len() > 1 {
            ops.push(DrawOp::DashedPath {
                points: lasso.points.clone(),
                closed: lasso.is_active,
                color: SELECTION_COLOR,
            });
        }
        if let Some(resize_box) = session.resize_box().filter(|_| session.state().has_selection()) {
            let rect = resize_box.rect;
            ops.push(DrawOp::DashedPath {
                points: vec![rect.left_top(), rect.right_top(), rect.right_bottom(), rect.left_bottom()],
                closed: true,
                color: SELECTION_COLOR,
            });
            ops.extend(Corner::ALL.iter().map(|corner| DrawOp::Handle {
                rect: handle_rect(*corner, rect),
            }));
        }
        ops
    }

    /// Off-screen display list for export: no grid, onion skin or overlays.
    /// `row` limits the layer pass to a single timeline row. A frame no
    /// folder covers stays transparent.
    pub fn compose_export(&self, document: &Document, frame: u32, row: Option<RowId>, images: &ImageCache) -> Vec<DrawOp> {
        let mut ops = Vec::new();
        let covered = document
            .timeline()
            .folders_at(frame)
            .iter()
            .any(|folder| row.is_none_or(|row| folder.row == row));
        self.background(covered.then_some(frame), &mut ops);
        self.layer_pass(document, frame, 1.0, None, row, images, &mut ops);
        ops
    }

    /// White canvas when a frame is shown; nothing for no frame
    fn background(&self, frame: Option<u32>, ops: &mut Vec<DrawOp>) {
        if frame.is_some() {
            ops.push(DrawOp::FillRect {
                rect: self.canvas_rect(),
                color: BACKGROUND_COLOR,
            });
        }
    }

    /// Grid lines, extended half a canvas past each edge so panning never shows a gap
    fn grid(&self, ops: &mut Vec<DrawOp>) {
        let size = self.canvas_size;
        let min = Pos2::ZERO - size / 2.0;
        let max = Pos2::ZERO + size * 1.5;
        let pitch = self.grid_pitch;

        let mut x = (min.x / pitch).floor() * pitch;
        while x <= max.x {
            ops.push(DrawOp::Line {
                from: Pos2::new(x, min.y),
                to: Pos2::new(x, max.y),
                width: 1.0,
                color: GRID_COLOR,
            });
            x += pitch;
        }
        let mut y = (min.y / pitch).floor() * pitch;
        while y <= max.y {
            ops.push(DrawOp::Line {
                from: Pos2::new(min.x, y),
                to: Pos2::new(max.x, y),
                width: 1.0,
                color: GRID_COLOR,
            });
            y += pitch;
        }
    }

    /// Layers of every folder covering `frame`, rows in timeline order,
    /// layers bottom-to-top, honouring visibility and opacity
    #[allow(clippy::too_many_arguments)]
    fn layer_pass(
        &self,
        document: &Document,
        frame: u32,
        alpha: f32,
        skip: Option<StrokeId>,
        row: Option<RowId>,
        images: &ImageCache,
        ops: &mut Vec<DrawOp>,
    ) {
        let folders = document
            .timeline()
            .folders_at(frame)
            .into_iter()
            .filter(|folder| row.is_none_or(|row| folder.row == row));

        for folder in folders {
            for layer in document.layer_order(folder.id()) {
                let Some(props) = document.layer_props(*layer) else {
                    continue;
                };
                if !props.visible {
                    continue;
                }
                let alpha = alpha * props.opacity;

                if let (LayerRef::Main(_), Some(url)) = (layer, folder.image_url.as_deref()) {
                    if let Some(image) = images.get(url) {
                        ops.push(DrawOp::Image {
                            url: url.to_owned(),
                            rect: self.fit_image(image.width(), image.height()),
                            alpha,
                        });
                    }
                }
                ops.extend(
                    document
                        .strokes(*layer)
                        .iter()
                        .filter(|stroke| Some(stroke.id) != skip)
                        .map(|stroke| DrawOp::stroke(stroke, alpha)),
                );
            }
        }
    }
}
