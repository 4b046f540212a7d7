use crate::command::Command;
use crate::config::EditorConfig;
use crate::event::{EditorEvent, LoggingEventHandler};
use crate::export::{download_file_name, ExportFormat, FrameExporter};
use crate::file_handler::{place_assets, FileHandler};
use crate::image_cache::ImageCache;
use crate::input::{CanvasView, InputHandler};
use crate::panels::{central_panel, timeline_panel, tools_panel};
use crate::persistence::{self, AssetScope, FileSceneStore, SceneDocument, SceneStore};
use crate::playback::PlaybackScheduler;
use crate::renderer::Compositor;
use crate::state::EditorSession;
use crate::texture_manager::TextureManager;
use crate::util::time;
use std::path::PathBuf;

const MAX_TEXTURES: usize = 64;

/// We derive Deserialize/Serialize so we can persist app settings on shutdown.
/// The scene itself goes through the scene store, not eframe storage.
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct AnimateApp {
    config: EditorConfig,
    scene_id: String,
    scope: AssetScope,
    export_format: ExportFormat,
    export_dir: Option<PathBuf>,

    #[serde(skip)]
    session: EditorSession,
    #[serde(skip)]
    images: ImageCache,
    #[serde(skip)]
    textures: TextureManager,
    #[serde(skip)]
    playback: PlaybackScheduler,
    #[serde(skip)]
    input: InputHandler,
    #[serde(skip)]
    file_handler: FileHandler,
    #[serde(skip)]
    compositor: Compositor,
    #[serde(skip)]
    store: Option<FileSceneStore>,
    #[serde(skip)]
    canvas_view: CanvasView,
    /// Last error or notice shown in the tools panel
    #[serde(skip)]
    status: Option<String>,
}

impl Default for AnimateApp {
    fn default() -> Self {
        let config = EditorConfig::default();
        Self {
            scene_id: "untitled".to_owned(),
            scope: AssetScope::default(),
            export_format: ExportFormat::Png,
            export_dir: None,
            session: EditorSession::new(config.clone()),
            images: ImageCache::default(),
            textures: TextureManager::new(MAX_TEXTURES),
            playback: PlaybackScheduler::from_config(&config, 1),
            input: InputHandler::new(),
            file_handler: FileHandler::new(),
            compositor: Compositor::new(&config),
            store: None,
            canvas_view: CanvasView::default(),
            status: None,
            config,
        }
    }
}

impl AnimateApp {
    /// Called once before the first frame. A config file given on startup
    /// takes precedence over the settings stored by eframe.
    pub fn new(cc: &eframe::CreationContext<'_>, config_path: Option<PathBuf>) -> Self {
        let app: Self = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        let config = EditorConfig::load_or(config_path.as_deref(), app.config.clone());
        app.with_config(config)
    }

    /// Rebuild the runtime parts from `config`
    pub fn with_config(mut self, config: EditorConfig) -> Self {
        let mut session = EditorSession::new(config.clone());
        session.subscribe(Box::new(LoggingEventHandler));
        self.session = session;
        self.compositor = Compositor::new(&config);
        self.playback = PlaybackScheduler::from_config(&config, 1);
        self.store = config.autosave_dir.clone().map(|dir| {
            FileSceneStore::new(dir).with_autosave(config.max_autosaves, config.autosave_interval)
        });
        self.config = config;
        self
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn playback(&self) -> &PlaybackScheduler {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackScheduler {
        &mut self.playback
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn export_format(&self) -> ExportFormat {
        self.export_format
    }

    pub fn set_export_format(&mut self, format: ExportFormat) {
        self.export_format = format;
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Apply a command, reporting failures in the status line
    pub fn execute_command(&mut self, command: Command) {
        log::debug!("executing {:?}", command);
        match self.session.apply_command(command) {
            Ok(()) => self.sync_playback(),
            Err(err) => {
                log::warn!("command failed: {}", err);
                self.status = Some(err.to_string());
            }
        }
    }

    /// Scrub both the session and the scheduler
    pub fn scrub(&mut self, frame: u32) {
        self.playback.scrub(frame);
        self.execute_command(Command::SelectFrame(frame));
    }

    fn sync_playback(&mut self) {
        let max_frame = self.session.document().timeline().max_frame();
        self.playback.set_max_frame(max_frame);
        if !self.playback.is_playing() {
            self.playback.scrub(self.session.current_frame());
        }
    }

    pub fn save_scene(&mut self) {
        let Some(store) = &self.store else {
            self.status = Some("No scene store configured".to_owned());
            return;
        };
        match persistence::save_session(store, &self.scene_id, &self.session) {
            Ok(()) => self.status = Some(format!("Saved {}", self.scene_id)),
            Err(err) => {
                log::error!("saving {} failed: {}", self.scene_id, err);
                self.status = Some(err.to_string());
            }
        }
    }

    pub fn load_scene(&mut self) {
        let Some(store) = &self.store else {
            self.status = Some("No scene store configured".to_owned());
            return;
        };
        match persistence::load_scene(store, &self.scene_id) {
            Ok(loaded) => {
                self.playback.pause();
                self.textures.clear_cache();
                persistence::restore_session(&mut self.session, loaded);
                self.sync_playback();
                self.status = Some(format!("Loaded {}", self.scene_id));
            }
            Err(err) => {
                log::error!("loading {} failed: {}", self.scene_id, err);
                self.status = Some(err.to_string());
            }
        }
    }

    /// Export every frame of the selected row to the export directory
    pub fn export_selected_row(&mut self) {
        let Some(row) = self.session.selected_row() else {
            self.status = Some("Select a row to export".to_owned());
            return;
        };
        let dir = self
            .export_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("animate-export"));
        let exporter = FrameExporter::new(&self.compositor, &self.images, self.export_format);
        self.status = Some(match exporter.export_row(&dir, self.session.document(), row) {
            Ok(paths) => format!("Exported {} frames to {}", paths.len(), dir.display()),
            Err(err) => err.to_string(),
        });
    }

    /// Export the current frame of the selected row under its download name
    pub fn export_current_frame(&mut self) {
        let Some(folder) = self.session.selected_folder() else {
            self.status = Some("No frame here to export".to_owned());
            return;
        };
        let row = folder.row;
        let frame = self.session.current_frame();
        let name = folder.name.clone().unwrap_or_else(|| self.scene_id.clone());
        let dir = self
            .export_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("animate-export"));
        let path = dir.join(download_file_name(&name, row, frame, self.export_format));
        let exporter = FrameExporter::new(&self.compositor, &self.images, self.export_format);
        let result = exporter
            .export_bytes(self.session.document(), row, frame)
            .and_then(|bytes| {
                std::fs::create_dir_all(&dir)?;
                std::fs::write(&path, bytes)?;
                Ok(())
            });
        self.status = Some(match result {
            Ok(()) => format!("Exported {}", path.display()),
            Err(err) => err.to_string(),
        });
    }

    /// Handle pointer input over the canvas and paint it
    pub fn show_canvas(&mut self, ui: &mut egui::Ui) {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        self.canvas_view = CanvasView::centered(rect, self.compositor.canvas_size, self.session.view().zoom);

        for event in self.input.process_input(ui.ctx(), rect, &self.canvas_view) {
            if let Err(err) = self.session.handle_input(event) {
                log::warn!("input rejected: {}", err);
            }
        }

        let painter = ui.painter_at(response.rect);
        let ops = self.compositor.compose(&self.session, &self.images);
        self.textures.begin_frame();
        crate::renderer::paint_ops(&painter, &self.canvas_view, &ops, &self.images, &mut self.textures);
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        self.file_handler.preview_files_being_dropped(ctx);
        if !self.file_handler.check_for_dropped_files(ctx) {
            return;
        }
        let assets = self.file_handler.take_dropped_assets();
        let store = self.store.as_ref().map(|store| store as &dyn SceneStore);
        match place_assets(&mut self.session, &self.images, store, &self.scope, assets) {
            Ok(placed) => {
                self.sync_playback();
                self.status = Some(format!("Placed {} frames", placed.len()));
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn autosave(&mut self) {
        let Some(store) = &mut self.store else {
            return;
        };
        if !store.should_autosave(time::timestamp_secs()) {
            return;
        }
        if let Err(err) = store.try_autosave(&SceneDocument::capture(&self.session)) {
            log::warn!("autosave failed: {}", err);
        }
    }
}

impl eframe::App for AnimateApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);

        for command in InputHandler::shortcut_commands(ctx) {
            self.execute_command(command);
        }

        for finished in self.images.poll() {
            if !finished.ok {
                self.textures.invalidate(&finished.url);
            }
            self.session.image_loaded(&finished.url, finished.ok);
        }

        let now = time::current_time_secs();
        if self.playback.update(now) {
            self.session.set_frame(self.playback.current_frame());
        }

        tools_panel(self, ctx);
        timeline_panel(self, ctx);
        central_panel(self, ctx);

        let events = self.session.drain_events();
        if events.iter().any(|event| matches!(event, EditorEvent::RedrawRequested | EditorEvent::ImageLoaded { .. })) {
            ctx.request_repaint();
        }
        if self.images.is_loading() {
            ctx.request_repaint();
        }
        if let Some(wait) = self.playback.time_until_next(now) {
            ctx.request_repaint_after(std::time::Duration::from_secs_f64(wait));
        }

        self.autosave();
    }
}
