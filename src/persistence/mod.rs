//! Scene documents on the wire and the store they are saved to.
//!
//! A scene is always loaded and saved whole; there is no delta protocol.

mod keys;
mod store;

pub use keys::{sanitize_file_name, slugify, AssetScope};
pub use store::{FileSceneStore, SceneStore};

use crate::config::EditorConfig;
use crate::document::{Document, DocumentError};
use crate::image_cache::ImageCache;
use crate::layer::{FolderId, LayerProps, LayerRef, RowId};
use crate::state::{EditorSession, ViewState};
use crate::stroke::Stroke;
use crate::timeline::{FrameFolder, Row, Timeline, TimelineError};
use crate::util::time;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// The only scene format version written
pub const SCENE_VERSION: u32 = 1;

/// Errors that can occur while loading or saving scenes
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to serialize scene: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to access scene storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported scene version {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid scene timeline: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Invalid scene layers: {0}")]
    Document(#[from] DocumentError),

    #[error("Scene or asset not found: {0}")]
    NotFound(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub units: String,
}

impl Default for SceneSettings {
    fn default() -> Self {
        let config = EditorConfig::default();
        Self {
            width: config.canvas_width,
            height: config.canvas_height,
            fps: config.fps,
            units: "px".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineSection {
    pub drawing_frames: Vec<FrameFolder>,
    pub layer_order: BTreeMap<FolderId, Vec<LayerRef>>,
}

/// A layer's display props, listed under its folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub id: LayerRef,
    #[serde(flatten)]
    pub props: LayerProps,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayersSection {
    pub folder_layers: BTreeMap<FolderId, Vec<LayerEntry>>,
    pub layer_strokes: BTreeMap<LayerRef, Vec<Stroke>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiState {
    pub current_frame: u32,
    pub selected_row: Option<RowId>,
    pub zoom: f32,
    pub onion_skin: bool,
    pub show_grid: bool,
}

impl Default for UiState {
    fn default() -> Self {
        ViewState::default().into()
    }
}

impl From<ViewState> for UiState {
    fn from(view: ViewState) -> Self {
        Self {
            current_frame: view.current_frame,
            selected_row: view.selected_row,
            zoom: view.zoom,
            onion_skin: view.onion_skin,
            show_grid: view.show_grid,
        }
    }
}

impl From<UiState> for ViewState {
    fn from(ui: UiState) -> Self {
        Self {
            current_frame: ui.current_frame.max(1),
            selected_row: ui.selected_row,
            zoom: ui.zoom,
            onion_skin: ui.onion_skin,
            show_grid: ui.show_grid,
        }
    }
}

/// Persisted scene, version 1. Absent optional sections take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    pub version: u32,
    #[serde(default)]
    pub scene_settings: SceneSettings,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub frame_count: u32,
    #[serde(default)]
    pub timeline: TimelineSection,
    #[serde(default)]
    pub layers: LayersSection,
    #[serde(default)]
    pub ui_state: UiState,
    #[serde(default)]
    pub frame_asset_keys: BTreeMap<FolderId, String>,
    #[serde(default)]
    pub folder_names: BTreeMap<FolderId, String>,
}

/// Everything a loaded scene restores into a session
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedScene {
    pub document: Document,
    pub view: ViewState,
}

impl SceneDocument {
    /// Snapshot a session for saving
    pub fn capture(session: &EditorSession) -> Self {
        let document = session.document();
        let config = session.config();
        let timeline = document.timeline();

        let mut folder_layers = BTreeMap::new();
        let mut layer_order = BTreeMap::new();
        let mut layer_strokes = BTreeMap::new();
        for folder in timeline.folders() {
            let id = folder.id();
            let order = document.layer_order(id).to_vec();
            let entries = order
                .iter()
                .filter_map(|layer| {
                    document.layer_props(*layer).map(|props| LayerEntry {
                        id: *layer,
                        props: props.clone(),
                    })
                })
                .collect();
            for layer in &order {
                layer_strokes.insert(*layer, document.strokes(*layer).to_vec());
            }
            folder_layers.insert(id, entries);
            layer_order.insert(id, order);
        }

        Self {
            version: SCENE_VERSION,
            scene_settings: SceneSettings {
                width: config.canvas_width,
                height: config.canvas_height,
                fps: config.fps,
                units: "px".to_owned(),
            },
            rows: timeline.rows().to_vec(),
            frame_count: timeline.max_frame(),
            timeline: TimelineSection {
                drawing_frames: timeline.folders().to_vec(),
                layer_order,
            },
            layers: LayersSection {
                folder_layers,
                layer_strokes,
            },
            ui_state: session.view().clone().into(),
            frame_asset_keys: session
                .asset_keys()
                .iter()
                .map(|(folder, key)| (*folder, key.clone()))
                .collect(),
            folder_names: timeline
                .folders()
                .iter()
                .filter_map(|folder| folder.name.clone().map(|name| (folder.id(), name)))
                .collect(),
        }
    }

    pub fn from_json(json: &str) -> PersistenceResult<Self> {
        let scene: Self = serde_json::from_str(json)?;
        if scene.version > SCENE_VERSION {
            return Err(PersistenceError::UnsupportedVersion(scene.version));
        }
        Ok(scene)
    }

    pub fn to_json(&self) -> PersistenceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rebuild the editable facets
    pub fn into_loaded(self) -> PersistenceResult<LoadedScene> {
        let mut folders = self.timeline.drawing_frames;
        for folder in &mut folders {
            folder.name = self.folder_names.get(&folder.id()).cloned();
        }
        let timeline = Timeline::from_parts(self.rows, folders)?;

        let layers: HashMap<LayerRef, LayerProps> = self
            .layers
            .folder_layers
            .into_values()
            .flatten()
            .map(|entry| (entry.id, entry.props))
            .collect();
        let mut document = Document::from_parts(
            timeline,
            layers,
            self.layers.layer_strokes.into_iter().collect(),
            self.timeline.layer_order.into_iter().collect(),
        )?;
        for (folder, key) in self.frame_asset_keys {
            if document.set_asset_key(folder, key).is_err() {
                log::warn!("dropping asset key of missing folder {}", folder);
            }
        }

        Ok(LoadedScene {
            document,
            view: self.ui_state.into(),
        })
    }
}

/// Where an uploaded frame asset ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub url: String,
    /// `None` when the upload failed and the asset only lives in this session
    pub key: Option<String>,
}

impl UploadedAsset {
    pub fn is_durable(&self) -> bool {
        self.key.is_some()
    }
}

/// Upload a frame asset, falling back to a session-local `blob:` URL.
/// Decoded pixels are registered in `images` under the returned URL either way.
pub fn upload_frame_asset(
    store: &dyn SceneStore,
    images: &ImageCache,
    scope: &AssetScope,
    folder: FolderId,
    file_name: &str,
    bytes: &[u8],
    decoded: Option<image::RgbaImage>,
) -> UploadedAsset {
    let key = scope.frame_asset_key(folder, time::timestamp_millis(), file_name);
    let uploaded = match store.upload_asset(&key, bytes) {
        Ok(url) => {
            log::info!("⬆️ uploaded {} as {}", file_name, key);
            UploadedAsset { url, key: Some(key) }
        }
        Err(err) => {
            let url = format!("blob:session/{}", uuid::Uuid::new_v4());
            log::warn!("upload of {} failed ({}); using local {}", file_name, err, url);
            UploadedAsset { url, key: None }
        }
    };
    if let Some(image) = decoded {
        images.insert(uploaded.url.clone(), image);
    }
    uploaded
}

/// Load a scene and re-resolve its asset URLs. A key that cannot be resolved
/// leaves its folder without an image instead of failing the load.
pub fn load_scene(store: &dyn SceneStore, scene_id: &str) -> PersistenceResult<LoadedScene> {
    let scene = store.load(scene_id)?;
    let mut loaded = scene.into_loaded()?;

    let keys: Vec<(FolderId, String)> = loaded
        .document
        .asset_keys()
        .iter()
        .map(|(folder, key)| (*folder, key.clone()))
        .collect();
    for (folder, key) in keys {
        let file_name = loaded.document.folder(folder).and_then(|f| f.file_name.clone());
        match store.resolve_url(&key) {
            Ok(url) => loaded.document.set_folder_image(folder, Some(url), file_name)?,
            Err(err) => {
                log::warn!("could not resolve asset of {}: {}; frame loads without it", folder, err);
                loaded.document.set_folder_image(folder, None, file_name)?;
            }
        }
    }
    log::info!("📂 loaded scene {}", scene_id);
    Ok(loaded)
}

/// Capture and save a session
pub fn save_session(store: &dyn SceneStore, scene_id: &str, session: &EditorSession) -> PersistenceResult<()> {
    store.save(scene_id, &SceneDocument::capture(session))?;
    log::info!("💾 saved scene {}", scene_id);
    Ok(())
}

/// Put a loaded scene into a session; history starts empty
pub fn restore_session(session: &mut EditorSession, loaded: LoadedScene) {
    session.replace_document(loaded.document);
    session.set_view_state(loaded.view);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::input::InputEvent;
    use egui::Pos2;

    fn drawn_session() -> EditorSession {
        let mut session = EditorSession::new(EditorConfig::default());
        session.apply_command(Command::AddRow { name: "Characters".into() }).unwrap();
        let row = session.selected_row().unwrap();
        session
            .apply_command(Command::AddFolder { row, frame_index: 1, length: 3 })
            .unwrap();
        let folder = FolderId::new(row, 1);
        session.apply_command(Command::AddLayer(folder)).unwrap();
        session
            .apply_command(Command::RenameFolder {
                folder,
                name: Some("Walk".into()),
            })
            .unwrap();
        session.handle_input(InputEvent::PointerDown { pos: Pos2::new(1.0, 2.0) }).unwrap();
        session.handle_input(InputEvent::PointerMove { pos: Pos2::new(3.0, 4.0) }).unwrap();
        session.handle_input(InputEvent::PointerUp { pos: Pos2::new(3.0, 4.0) }).unwrap();
        session.apply_command(Command::SetOnionSkin(true)).unwrap();
        session
    }

    #[test]
    fn test_capture_and_restore() {
        let session = drawn_session();
        let json = SceneDocument::capture(&session).to_json().unwrap();
        let loaded = SceneDocument::from_json(&json).unwrap().into_loaded().unwrap();

        assert_eq!(&loaded.document, session.document());
        assert!(loaded.view.onion_skin);
        let folder = FolderId::new(RowId(1), 1);
        assert_eq!(loaded.document.folder(folder).unwrap().name.as_deref(), Some("Walk"));
    }

    #[test]
    fn test_wire_keys_use_legacy_strings() {
        let json = SceneDocument::capture(&drawn_session()).to_json().unwrap();
        assert!(json.contains("\"row-1-1-main\""));
        assert!(json.contains("\"row-1-1-extra-1\""));
        assert!(json.contains("\"drawingFrames\""));
        assert!(json.contains("\"uiState\""));
    }

    #[test]
    fn test_missing_optional_fields_take_defaults() {
        let scene = SceneDocument::from_json(r#"{"version": 1}"#).unwrap();
        assert_eq!(scene.ui_state.zoom, 1.0);
        assert_eq!(scene.ui_state.current_frame, 1);
        assert!(!scene.ui_state.onion_skin && !scene.ui_state.show_grid);
        let loaded = scene.into_loaded().unwrap();
        assert!(loaded.document.timeline().rows().is_empty());
    }

    #[test]
    fn test_newer_version_is_rejected() {
        assert!(matches!(
            SceneDocument::from_json(r#"{"version": 2}"#),
            Err(PersistenceError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_restore_into_session_clears_history() {
        let session = drawn_session();
        let loaded = SceneDocument::capture(&session).into_loaded().unwrap();
        let mut fresh = EditorSession::new(EditorConfig::default());
        restore_session(&mut fresh, loaded);
        assert_eq!(fresh.document(), session.document());
        assert!(!fresh.can_undo());
        assert!(fresh.view().onion_skin);
        assert_eq!(fresh.selected_row(), Some(RowId(1)));
    }
}
