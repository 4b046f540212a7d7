use crate::document::Document;
use crate::image_cache::ImageCache;
use crate::layer::RowId;
use crate::renderer::{Compositor, RasterCanvas};
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Row {0} has no frames to export")]
    EmptyRow(RowId),
    #[error("Frame {0} is out of range")]
    InvalidFrame(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Png, ExportFormat::Jpeg, ExportFormat::Webp];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Webp => ImageFormat::WebP,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Webp => "WEBP",
        }
    }
}

/// File name of a single downloaded frame: `<folder>_R<row>F<frame>.<ext>`
pub fn download_file_name(export_name: &str, row: RowId, frame: u32, format: ExportFormat) -> String {
    format!("{}_{}", export_name, directory_file_name(row, frame, format))
}

/// File name inside an export directory: `R<row>F<frame>.<ext>`
pub fn directory_file_name(row: RowId, frame: u32, format: ExportFormat) -> String {
    format!("R{}F{}.{}", row.0, frame, format.extension())
}

/// Encode a rendered frame. JPEG has no alpha channel, so it is flattened to RGB.
pub fn encode(image: &RgbaImage, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Cursor::new(Vec::new());
    match format {
        ExportFormat::Jpeg => DynamicImage::ImageRgba8(image.clone())
            .into_rgb8()
            .write_to(&mut bytes, format.image_format())?,
        _ => image.write_to(&mut bytes, format.image_format())?,
    }
    Ok(bytes.into_inner())
}

/// Renders frames off-screen and writes them out
pub struct FrameExporter<'a> {
    compositor: &'a Compositor,
    images: &'a ImageCache,
    format: ExportFormat,
}

impl<'a> FrameExporter<'a> {
    pub fn new(compositor: &'a Compositor, images: &'a ImageCache, format: ExportFormat) -> Self {
        Self {
            compositor,
            images,
            format,
        }
    }

    /// Rasterize one frame, optionally limited to a single row
    pub fn render(&self, document: &Document, frame: u32, row: Option<RowId>) -> Result<RgbaImage, ExportError> {
        if frame == 0 {
            return Err(ExportError::InvalidFrame(frame));
        }
        self.preload_images(document, frame, row);
        let size = self.compositor.canvas_size;
        let mut canvas = RasterCanvas::new(size.x.round() as u32, size.y.round() as u32);
        let ops = self.compositor.compose_export(document, frame, row, self.images);
        canvas.replay(&ops, self.images);
        Ok(canvas.into_image())
    }

    /// Load the frame's folder images now; a cache miss would leave them out
    fn preload_images(&self, document: &Document, frame: u32, row: Option<RowId>) {
        for folder in document.timeline().folders_at(frame) {
            if row.is_some_and(|row| folder.row != row) {
                continue;
            }
            if let Some(url) = &folder.image_url {
                if self.images.load_blocking(url).is_none() {
                    log::warn!("frame {} image {} is unavailable for export", frame, url);
                }
            }
        }
    }

    /// Render and encode one frame of a row for download
    pub fn export_bytes(&self, document: &Document, row: RowId, frame: u32) -> Result<Vec<u8>, ExportError> {
        encode(&self.render(document, frame, Some(row))?, self.format)
    }

    /// Write one frame of a row into `dir` as `R<row>F<frame>.<ext>`
    pub fn export_frame(&self, dir: &Path, document: &Document, row: RowId, frame: u32) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(directory_file_name(row, frame, self.format));
        fs::write(&path, self.export_bytes(document, row, frame)?)?;
        log::info!("📤 exported {}", path.display());
        Ok(path)
    }

    /// Write every frame covered by one of the row's folders into `dir`
    pub fn export_row(&self, dir: &Path, document: &Document, row: RowId) -> Result<Vec<PathBuf>, ExportError> {
        let frames = row_frames(document, row);
        if frames.is_empty() {
            log::warn!("nothing to export in {}", row);
            return Err(ExportError::EmptyRow(row));
        }
        frames
            .into_iter()
            .map(|frame| self.export_frame(dir, document, row, frame))
            .collect()
    }
}

/// Frames covered by the row's folders, ascending
pub fn row_frames(document: &Document, row: RowId) -> Vec<u32> {
    let mut frames: Vec<u32> = document
        .timeline()
        .folders()
        .iter()
        .filter(|folder| folder.row == row)
        .flat_map(|folder| folder.frame_index..folder.end())
        .collect();
    frames.sort_unstable();
    frames.dedup();
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::{DrawingTool, Stroke};
    use egui::{Color32, Pos2};

    fn document() -> Document {
        let mut document = Document::new();
        let row = document.add_row("Ink");
        let folder = document.add_folder(row, 2, 2).unwrap();
        let mut stroke = Stroke::new(folder.main_layer(), DrawingTool::Brush, Color32::RED, 6.0, Pos2::new(0.0, 5.0));
        stroke.add_point(Pos2::new(20.0, 5.0));
        document.add_stroke(folder.main_layer(), stroke).unwrap();
        document
    }

    fn compositor() -> Compositor {
        Compositor {
            canvas_size: egui::vec2(20.0, 10.0),
            ..Compositor::default()
        }
    }

    #[test]
    fn test_file_names() {
        assert_eq!(directory_file_name(RowId(2), 7, ExportFormat::Webp), "R2F7.webp");
        assert_eq!(
            download_file_name("walk", RowId(1), 3, ExportFormat::Jpeg),
            "walk_R1F3.jpg"
        );
    }

    #[test]
    fn test_row_frames_follow_folders() {
        assert_eq!(row_frames(&document(), RowId(1)), vec![2, 3]);
        assert!(row_frames(&document(), RowId(9)).is_empty());
    }

    #[test]
    fn test_render_draws_strokes_on_white() {
        let compositor = compositor();
        let images = ImageCache::default();
        let exporter = FrameExporter::new(&compositor, &images, ExportFormat::Png);
        let image = exporter.render(&document(), 2, None).unwrap();
        assert_eq!(image.dimensions(), (20, 10));
        assert_eq!(image.get_pixel(10, 5).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(10, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_export_row_writes_each_frame() {
        let dir = std::env::temp_dir().join(format!("export-{}", uuid::Uuid::new_v4()));
        let compositor = compositor();
        let images = ImageCache::default();
        let exporter = FrameExporter::new(&compositor, &images, ExportFormat::Jpeg);

        let paths = exporter.export_row(&dir, &document(), RowId(1)).unwrap();
        assert_eq!(paths, vec![dir.join("R1F2.jpg"), dir.join("R1F3.jpg")]);
        let decoded = image::open(&paths[0]).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
        assert!(matches!(
            exporter.export_row(&dir, &document(), RowId(5)),
            Err(ExportError::EmptyRow(_))
        ));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_render_loads_uncached_folder_image() {
        let dir = std::env::temp_dir().join(format!("export-image-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("plate.png");
        RgbaImage::from_pixel(20, 10, image::Rgba([0, 255, 0, 255])).save(&path).unwrap();

        let mut document = document();
        let folder = crate::layer::FolderId::new(RowId(1), 2);
        document
            .set_folder_image(folder, Some(format!("file://{}", path.display())), Some("plate.png".into()))
            .unwrap();

        let compositor = compositor();
        let images = ImageCache::default();
        let exporter = FrameExporter::new(&compositor, &images, ExportFormat::Png);
        let image = exporter.render(&document, 2, Some(RowId(1))).unwrap();
        assert_eq!(image.get_pixel(10, 0).0, [0, 255, 0, 255]);
        assert_eq!(image.get_pixel(10, 5).0, [255, 0, 0, 255]);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_png_keeps_alpha_channel() {
        let image = RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 4]));
        let bytes = encode(&image, ExportFormat::Png).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().into_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [1, 2, 3, 4]);
    }
}
