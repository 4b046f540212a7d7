use crate::command::{Command, CommandError};
use crate::image_cache::ImageCache;
use crate::import::{decode_asset, detect_sequence, is_image_file_name, ImportedAsset};
use crate::layer::FolderId;
use crate::persistence::{upload_frame_asset, AssetScope, SceneStore};
use crate::state::EditorSession;

/// A file dropped onto the window, read into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedAsset {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct FileHandler {
    dropped_files: Vec<egui::DroppedFile>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick up files dropped this frame. Returns true if there are any.
    pub fn check_for_dropped_files(&mut self, ctx: &egui::Context) -> bool {
        ctx.input(|i| {
            if !i.raw.dropped_files.is_empty() {
                self.dropped_files = i.raw.dropped_files.clone();
            }
        });
        !self.dropped_files.is_empty()
    }

    /// Read the pending dropped image files into memory
    pub fn take_dropped_assets(&mut self) -> Vec<DroppedAsset> {
        std::mem::take(&mut self.dropped_files)
            .into_iter()
            .filter_map(|file| {
                let file_name = dropped_file_name(&file);
                if !is_image_file_name(&file_name) && !file.mime.starts_with("image/") {
                    log::warn!("Dropped file is not a supported type: {}", file_name);
                    return None;
                }
                let bytes = read_dropped_file(&file, &file_name)?;
                Some(DroppedAsset { file_name, bytes })
            })
            .collect()
    }

    /// Preview files being dragged over the application
    pub fn preview_files_being_dropped(&self, ctx: &egui::Context) {
        use egui::{Align2, Color32, FontId, Id, LayerId, Order};

        if ctx.input(|i| i.raw.hovered_files.is_empty()) {
            return;
        }
        let text = ctx.input(|i| {
            let mut text = "Dropping frames:\n".to_owned();
            for file in &i.raw.hovered_files {
                if let Some(path) = &file.path {
                    text += &format!("\n{}", path.display());
                } else if !file.mime.is_empty() {
                    text += &format!("\n{}", file.mime);
                } else {
                    text += "\n(Path not available)";
                }
            }
            text
        });

        let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("file_drop_target")));
        let screen_rect = ctx.screen_rect();
        painter.rect_filled(screen_rect, 0.0, Color32::from_black_alpha(192));
        painter.text(
            screen_rect.center(),
            Align2::CENTER_CENTER,
            text,
            FontId::proportional(20.0),
            Color32::WHITE,
        );
    }
}

fn dropped_file_name(file: &egui::DroppedFile) -> String {
    if let Some(name) = file
        .path
        .as_ref()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
    {
        name
    } else if !file.name.is_empty() {
        file.name.clone()
    } else {
        "unknown".to_owned()
    }
}

fn read_dropped_file(file: &egui::DroppedFile, file_name: &str) -> Option<Vec<u8>> {
    if let Some(bytes) = &file.bytes {
        return Some(bytes.to_vec());
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Some(path) = &file.path {
            return match std::fs::read(path) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    log::error!("Failed to read dropped file {}: {}", path.display(), err);
                    None
                }
            };
        }
    }
    log::warn!("Dropped file has no accessible data: {}", file_name);
    None
}

/// Order dropped files: numbered sequences first, by frame number, then the
/// rest in drop order
pub fn order_for_placement(assets: Vec<DroppedAsset>) -> Vec<DroppedAsset> {
    let names: Vec<&str> = assets.iter().map(|asset| asset.file_name.as_str()).collect();
    let sequenced: Vec<String> = detect_sequence(&names)
        .into_iter()
        .flat_map(|sequence| sequence.files)
        .collect();

    let (mut in_sequence, rest): (Vec<_>, Vec<_>) = assets
        .into_iter()
        .partition(|asset| sequenced.contains(&asset.file_name));
    in_sequence.sort_by_key(|asset| sequenced.iter().position(|name| *name == asset.file_name));
    in_sequence.extend(rest);
    in_sequence
}

/// Bind dropped images to frames of the selected row, one frame each,
/// starting at the current frame. A frame already covered by a folder gets
/// its image replaced; otherwise a one-frame folder is created. Each file is
/// uploaded when a store is available, and kept session-local otherwise.
/// Files the decoders reject are only placed when they can be uploaded as-is.
pub fn place_assets(
    session: &mut EditorSession,
    images: &ImageCache,
    store: Option<&dyn SceneStore>,
    scope: &AssetScope,
    assets: Vec<DroppedAsset>,
) -> Result<Vec<FolderId>, CommandError> {
    if assets.is_empty() {
        return Ok(Vec::new());
    }
    let row = match session.selected_row() {
        Some(row) => row,
        None => {
            let name = format!("Row {}", session.document().timeline().rows().len() + 1);
            session.apply_command(Command::AddRow { name })?;
            session
                .selected_row()
                .ok_or_else(|| CommandError::InvalidParameters("no row to import into".into()))?
        }
    };

    let mut frame = session.current_frame();
    let mut placed = Vec::new();
    for asset in order_for_placement(assets) {
        let decoded = match decode_asset(&asset.bytes, &asset.file_name) {
            ImportedAsset::Decoded(image) => Some(image),
            ImportedAsset::Blob { .. } if store.is_none() => {
                // without a store the raw bytes have nowhere to live
                log::warn!("skipped {}: it cannot be decoded and there is no scene store to keep it", asset.file_name);
                continue;
            }
            ImportedAsset::Blob { .. } => None,
        };

        let folder = match session.document().timeline().folder_at(row, frame) {
            Some(folder) => folder.id(),
            None => {
                session.apply_command(Command::AddFolder {
                    row,
                    frame_index: frame,
                    length: 1,
                })?;
                FolderId::new(row, frame)
            }
        };

        let (url, key) = match store {
            Some(store) => {
                let uploaded = upload_frame_asset(store, images, scope, folder, &asset.file_name, &asset.bytes, decoded);
                (uploaded.url, uploaded.key)
            }
            None => {
                let url = format!("blob:session/{}", uuid::Uuid::new_v4());
                if let Some(image) = decoded {
                    images.insert(url.clone(), image);
                }
                (url, None)
            }
        };

        session.apply_command(Command::SetFolderImage {
            folder,
            image_url: Some(url),
            file_name: Some(asset.file_name.clone()),
        })?;
        if let Some(key) = key {
            session.set_asset_key(folder, key)?;
        }
        log::info!("🖼 placed {} on {} frame {}", asset.file_name, row, frame);
        placed.push(folder);
        frame += 1;
    }
    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::image_cache::CacheEntry;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]))
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn asset(name: &str) -> DroppedAsset {
        DroppedAsset {
            file_name: name.to_owned(),
            bytes: png_bytes(),
        }
    }

    #[test]
    fn test_sequences_are_ordered_by_number() {
        let ordered = order_for_placement(vec![asset("bg.png"), asset("walk_10.png"), asset("walk_2.png")]);
        let names: Vec<_> = ordered.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["walk_2.png", "walk_10.png", "bg.png"]);
    }

    #[test]
    fn test_place_assets_creates_row_and_folders() {
        let mut session = EditorSession::new(EditorConfig::default());
        let images = ImageCache::default();
        let placed = place_assets(
            &mut session,
            &images,
            None,
            &AssetScope::default(),
            vec![asset("a_1.png"), asset("a_2.png")],
        )
        .unwrap();

        assert_eq!(placed.len(), 2);
        assert_eq!(placed[1].frame_index, 2);
        let folder = session.document().folder(placed[0]).unwrap();
        assert_eq!(folder.file_name.as_deref(), Some("a_1.png"));
        let url = folder.image_url.clone().unwrap();
        assert!(url.starts_with("blob:session/"));
        assert!(matches!(images.entry(&url), Some(CacheEntry::Ready(_))));
    }

    #[test]
    fn test_place_assets_reuses_covering_folder() {
        let mut session = EditorSession::new(EditorConfig::default());
        session.apply_command(Command::AddRow { name: "BG".into() }).unwrap();
        let row = session.selected_row().unwrap();
        session
            .apply_command(Command::AddFolder { row, frame_index: 1, length: 4 })
            .unwrap();
        let images = ImageCache::default();

        let placed = place_assets(&mut session, &images, None, &AssetScope::default(), vec![asset("plate.png")]).unwrap();
        assert_eq!(placed, vec![FolderId::new(row, 1)]);
        assert_eq!(session.document().timeline().folders().len(), 1);
        assert!(session.can_undo());
    }

    #[test]
    fn test_undecodable_file_is_skipped_without_a_store() {
        let mut session = EditorSession::new(EditorConfig::default());
        let images = ImageCache::default();
        let broken = DroppedAsset {
            file_name: "broken.tga".into(),
            bytes: b"not an image".to_vec(),
        };
        let placed = place_assets(&mut session, &images, None, &AssetScope::default(), vec![broken, asset("plate.png")]).unwrap();

        let row = session.selected_row().unwrap();
        assert_eq!(placed, vec![FolderId::new(row, 1)]);
        for folder in session.document().timeline().folders() {
            let url = folder.image_url.clone().unwrap();
            assert!(matches!(images.entry(&url), Some(CacheEntry::Ready(_))));
        }
    }
}
