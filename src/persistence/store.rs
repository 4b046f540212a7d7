use super::{PersistenceError, PersistenceResult, SceneDocument};
use crate::util::time;
use std::fs;
use std::path::{Path, PathBuf};

/// Backend holding scene documents and their uploaded frame assets
pub trait SceneStore {
    fn load(&self, scene_id: &str) -> PersistenceResult<SceneDocument>;

    fn save(&self, scene_id: &str, scene: &SceneDocument) -> PersistenceResult<()>;

    /// Store asset bytes under `key` and return a URL they can be loaded from
    fn upload_asset(&self, key: &str, bytes: &[u8]) -> PersistenceResult<String>;

    /// Produce a fresh URL for a previously uploaded asset key
    fn resolve_url(&self, key: &str) -> PersistenceResult<String>;
}

/// Scenes and assets on the local filesystem.
///
/// Layout: `<root>/scenes/<id>.json`, `<root>/assets/<key>` and rotating
/// `<root>/autosave/autosave_<millis>.json` snapshots.
#[derive(Debug, Clone)]
pub struct FileSceneStore {
    root: PathBuf,
    /// Maximum number of autosave files to keep
    max_autosaves: usize,
    /// Interval between autosaves in seconds
    autosave_interval: u64,
    /// Last autosave timestamp
    last_autosave: u64,
}

impl FileSceneStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_autosaves: 5,
            autosave_interval: 300,
            last_autosave: 0,
        }
    }

    pub fn with_autosave(mut self, max_autosaves: usize, interval_secs: u64) -> Self {
        self.max_autosaves = max_autosaves.max(1);
        self.autosave_interval = interval_secs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scene_path(&self, scene_id: &str) -> PathBuf {
        self.root
            .join("scenes")
            .join(format!("{}.json", super::sanitize_file_name(scene_id)))
    }

    fn asset_path(&self, key: &str) -> PersistenceResult<PathBuf> {
        let mut path = self.root.join("assets");
        for part in key.split('/') {
            if part.is_empty() || part == "." || part == ".." {
                return Err(PersistenceError::NotFound(key.to_owned()));
            }
            path.push(part);
        }
        Ok(path)
    }

    fn autosave_dir(&self) -> PathBuf {
        self.root.join("autosave")
    }

    /// Check if we should autosave based on the interval
    pub fn should_autosave(&self, now_secs: u64) -> bool {
        now_secs.saturating_sub(self.last_autosave) >= self.autosave_interval
    }

    /// Write an autosave snapshot if the interval has elapsed.
    /// Returns the snapshot name when one was written.
    pub fn try_autosave(&mut self, scene: &SceneDocument) -> PersistenceResult<Option<String>> {
        let now = time::timestamp_secs();
        if !self.should_autosave(now) {
            return Ok(None);
        }
        let name = self.autosave(scene)?;
        self.last_autosave = now;
        Ok(Some(name))
    }

    /// Write an autosave snapshot unconditionally and prune old ones
    pub fn autosave(&self, scene: &SceneDocument) -> PersistenceResult<String> {
        let dir = self.autosave_dir();
        fs::create_dir_all(&dir)?;

        let mut stamp = time::timestamp_millis();
        let name = loop {
            let name = format!("autosave_{:013}", stamp);
            if !dir.join(format!("{}.json", name)).exists() {
                break name;
            }
            stamp += 1;
        };
        fs::write(dir.join(format!("{}.json", name)), scene.to_json()?)?;
        log::debug!("autosaved {}", name);

        self.cleanup_old_autosaves()?;
        Ok(name)
    }

    fn autosave_names(&self) -> PersistenceResult<Vec<String>> {
        let dir = self.autosave_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.strip_prefix("autosave_")
                    .and_then(|rest| rest.strip_suffix(".json"))
                    .map(|stamp| format!("autosave_{}", stamp))
            })
            .collect();
        // zero-padded stamps sort chronologically
        names.sort();
        Ok(names)
    }

    fn cleanup_old_autosaves(&self) -> PersistenceResult<()> {
        let names = self.autosave_names()?;
        let excess = names.len().saturating_sub(self.max_autosaves);
        for name in &names[..excess] {
            fs::remove_file(self.autosave_dir().join(format!("{}.json", name)))?;
        }
        Ok(())
    }

    /// Name of the most recent autosave, if any
    pub fn find_latest_autosave(&self) -> PersistenceResult<Option<String>> {
        Ok(self.autosave_names()?.pop())
    }

    pub fn load_autosave(&self, name: &str) -> PersistenceResult<SceneDocument> {
        let path = self.autosave_dir().join(format!("{}.json", name));
        if !path.exists() {
            return Err(PersistenceError::NotFound(name.to_owned()));
        }
        SceneDocument::from_json(&fs::read_to_string(path)?)
    }
}

impl SceneStore for FileSceneStore {
    fn load(&self, scene_id: &str) -> PersistenceResult<SceneDocument> {
        let path = self.scene_path(scene_id);
        if !path.exists() {
            return Err(PersistenceError::NotFound(scene_id.to_owned()));
        }
        SceneDocument::from_json(&fs::read_to_string(path)?)
    }

    fn save(&self, scene_id: &str, scene: &SceneDocument) -> PersistenceResult<()> {
        let path = self.scene_path(scene_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, scene.to_json()?)?;
        Ok(())
    }

    fn upload_asset(&self, key: &str, bytes: &[u8]) -> PersistenceResult<String> {
        let path = self.asset_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        self.resolve_url(key)
    }

    fn resolve_url(&self, key: &str) -> PersistenceResult<String> {
        let path = self.asset_path(key)?;
        if !path.is_file() {
            return Err(PersistenceError::NotFound(key.to_owned()));
        }
        Ok(format!("file://{}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::image_cache::ImageCache;
    use crate::layer::{FolderId, RowId};
    use crate::persistence::{load_scene, upload_frame_asset, AssetScope};
    use crate::state::EditorSession;
    use crate::command::Command;

    fn temp_store() -> FileSceneStore {
        let dir = std::env::temp_dir().join(format!("scene-store-{}", uuid::Uuid::new_v4()));
        FileSceneStore::new(dir)
    }

    fn session_with_folder() -> EditorSession {
        let mut session = EditorSession::new(EditorConfig::default());
        session.apply_command(Command::AddRow { name: "BG".into() }).unwrap();
        session
            .apply_command(Command::AddFolder {
                row: RowId(1),
                frame_index: 1,
                length: 2,
            })
            .unwrap();
        session
    }

    #[test]
    fn test_save_and_load() {
        let store = temp_store();
        let scene = SceneDocument::capture(&session_with_folder());
        store.save("shot 1", &scene).unwrap();
        assert_eq!(store.load("shot 1").unwrap(), scene);
        assert!(matches!(store.load("missing"), Err(PersistenceError::NotFound(_))));
        fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn test_upload_and_resolve() {
        let store = temp_store();
        let url = store.upload_asset("p/assets/frames/row-1/1/1-a.png", b"png").unwrap();
        assert!(url.starts_with("file://"));
        assert_eq!(store.resolve_url("p/assets/frames/row-1/1/1-a.png").unwrap(), url);
        assert!(store.resolve_url("p/assets/other.png").is_err());
        assert!(store.upload_asset("../escape.png", b"x").is_err());
        fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn test_unresolvable_key_leaves_folder_without_image() {
        let store = temp_store();
        let mut session = session_with_folder();
        let folder = FolderId::new(RowId(1), 1);
        session.set_asset_key(folder, "gone/assets/frames/row-1/1/1-x.png".into()).unwrap();
        store.save("scene", &SceneDocument::capture(&session)).unwrap();

        let loaded = load_scene(&store, "scene").unwrap();
        assert_eq!(loaded.document.folder(folder).unwrap().image_url, None);
        assert!(loaded.document.asset_keys().contains_key(&folder));
        fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn test_uploaded_key_is_resolved_on_load() {
        let store = temp_store();
        let images = ImageCache::default();
        let mut session = session_with_folder();
        let folder = FolderId::new(RowId(1), 1);

        let uploaded = upload_frame_asset(&store, &images, &AssetScope::default(), folder, "a.png", b"bytes", None);
        assert!(uploaded.is_durable());
        session.set_asset_key(folder, uploaded.key.clone().unwrap()).unwrap();
        store.save("scene", &SceneDocument::capture(&session)).unwrap();

        let loaded = load_scene(&store, "scene").unwrap();
        assert_eq!(loaded.document.folder(folder).unwrap().image_url, Some(uploaded.url));
        fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn test_autosave_rotation() {
        let store = temp_store().with_autosave(2, 300);
        let scene = SceneDocument::capture(&session_with_folder());
        let first = store.autosave(&scene).unwrap();
        store.autosave(&scene).unwrap();
        let last = store.autosave(&scene).unwrap();

        assert_eq!(store.autosave_names().unwrap().len(), 2);
        assert!(!store.autosave_names().unwrap().contains(&first));
        assert_eq!(store.find_latest_autosave().unwrap(), Some(last.clone()));
        assert_eq!(store.load_autosave(&last).unwrap(), scene);
        fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn test_try_autosave_respects_interval() {
        let mut store = temp_store().with_autosave(5, 300);
        let scene = SceneDocument::capture(&session_with_folder());
        assert!(store.try_autosave(&scene).unwrap().is_some());
        assert!(store.try_autosave(&scene).unwrap().is_none());
        fs::remove_dir_all(store.root()).ok();
    }
}
