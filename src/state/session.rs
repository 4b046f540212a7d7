use super::EditorState;
use crate::command::{Command, CommandError, CommandResult, SnapshotHistory, ToolKind};
use crate::config::EditorConfig;
use crate::document::{Document, DocumentError};
use crate::event::{EditorEvent, EventBus, EventHandler, LayerEvent, SelectionEvent};
use crate::input::InputEvent;
use crate::layer::{FolderId, LayerRef, RowId};
use crate::selection::{LassoSelection, ResizeBox};
use crate::stroke::Stroke;
use crate::timeline::FrameFolder;
use crate::tools::{Clipboard, Tool, ToolContext, ToolOutcome, ToolSettings, ToolType};
use egui::Pos2;
use std::collections::HashMap;

/// Zoom limits of the canvas view
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 8.0;

/// View settings persisted alongside the document
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub current_frame: u32,
    pub selected_row: Option<RowId>,
    pub zoom: f32,
    pub onion_skin: bool,
    pub show_grid: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            current_frame: 1,
            selected_row: None,
            zoom: 1.0,
            onion_skin: false,
            show_grid: false,
        }
    }
}

/// The editor session: owns the document and everything needed to edit it.
///
/// All mutation goes through [`EditorSession::apply_command`] (discrete edits)
/// or [`EditorSession::handle_input`] (pointer gestures). Each committed edit
/// pushes exactly one snapshot onto the history.
#[derive(Debug)]
pub struct EditorSession {
    document: Document,
    history: SnapshotHistory,
    state: EditorState,
    lasso: LassoSelection,
    resize_box: Option<ResizeBox>,
    tool: ToolType,
    settings: ToolSettings,
    config: EditorConfig,
    view: ViewState,
    selected_layer: Option<LayerRef>,
    hover: Option<Pos2>,
    clipboard: Clipboard,
    events: EventBus,
    /// Document as it was when the running gesture started
    baseline: Option<Document>,
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_document(Document::new(), config)
    }

    pub fn with_document(document: Document, config: EditorConfig) -> Self {
        let mut session = Self {
            document,
            history: SnapshotHistory::new(),
            state: EditorState::Idle,
            lasso: LassoSelection::default(),
            resize_box: None,
            tool: ToolType::default(),
            settings: config.tool_settings(),
            config,
            view: ViewState::default(),
            selected_layer: None,
            hover: None,
            clipboard: Clipboard::default(),
            events: EventBus::new(),
            baseline: None,
        };
        session.view.selected_row = session.document.timeline().rows().first().map(|row| row.id);
        session.sync_selected_layer();
        session
    }

    // ---- accessors ------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn lasso(&self) -> &LassoSelection {
        &self.lasso
    }

    pub fn resize_box(&self) -> Option<&ResizeBox> {
        self.resize_box.as_ref()
    }

    pub fn tool(&self) -> ToolKind {
        self.tool.kind()
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn current_frame(&self) -> u32 {
        self.view.current_frame
    }

    pub fn selected_row(&self) -> Option<RowId> {
        self.view.selected_row
    }

    pub fn selected_layer(&self) -> Option<LayerRef> {
        self.selected_layer
    }

    /// The folder of the selected row that covers the current frame
    pub fn selected_folder(&self) -> Option<&FrameFolder> {
        let row = self.view.selected_row?;
        self.document.timeline().folder_at(row, self.view.current_frame)
    }

    pub fn hover(&self) -> Option<Pos2> {
        self.hover
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// The stroke currently being captured, drawn on top at full alpha
    pub fn in_progress_stroke(&self) -> Option<&Stroke> {
        let (layer, id) = self.state.drawing_stroke()?;
        self.document.stroke(layer, id)
    }

    /// Eraser preview circle (centre, radius) while the eraser hovers the canvas
    pub fn eraser_cursor(&self) -> Option<(Pos2, f32)> {
        match self.tool {
            ToolType::Eraser(_) => self.hover.map(|pos| (pos, self.settings.eraser_size)),
            _ => None,
        }
    }

    pub fn asset_keys(&self) -> &HashMap<FolderId, String> {
        self.document.asset_keys()
    }

    /// Record the storage key of an uploaded asset. Not an undo step of its
    /// own: it rides along with the folder in every later snapshot.
    pub fn set_asset_key(&mut self, folder: FolderId, key: String) -> CommandResult {
        Ok(self.document.set_asset_key(folder, key)?)
    }

    pub fn subscribe(&mut self, handler: Box<dyn EventHandler>) {
        self.events.subscribe(handler);
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.events.drain()
    }

    /// Report a finished image load; redraws if a folder shows that image
    pub fn image_loaded(&mut self, url: &str, ok: bool) {
        self.events.emit(EditorEvent::ImageLoaded { url: url.to_owned(), ok });
        let shown = self
            .document
            .timeline()
            .folders()
            .iter()
            .any(|folder| folder.image_url.as_deref() == Some(url));
        if ok && shown {
            self.events.emit(EditorEvent::RedrawRequested);
        }
    }

    /// Restore persisted view settings
    pub fn set_view_state(&mut self, view: ViewState) {
        self.abandon_gesture();
        self.view = ViewState {
            current_frame: view.current_frame.max(1),
            zoom: view.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            selected_row: view
                .selected_row
                .filter(|row| self.document.timeline().row(*row).is_some()),
            ..view
        };
        self.sync_selected_layer();
        self.events.emit(EditorEvent::RedrawRequested);
    }

    /// Swap in a freshly loaded document; history starts over
    pub fn replace_document(&mut self, document: Document) {
        self.abandon_gesture();
        self.document = document;
        self.history.clear();
        self.view.selected_row = self
            .view
            .selected_row
            .filter(|row| self.document.timeline().row(*row).is_some())
            .or_else(|| self.document.timeline().rows().first().map(|row| row.id));
        self.sync_selected_layer();
        self.emit_history();
        self.events.emit(EditorEvent::RedrawRequested);
    }

    // ---- frames ---------------------------------------------------------

    /// Show frame `frame`. Abandons any gesture when the frame actually changes.
    pub fn set_frame(&mut self, frame: u32) {
        let frame = frame.max(1);
        let old = self.view.current_frame;
        if frame == old {
            return;
        }
        self.abandon_gesture();
        self.view.current_frame = frame;
        self.sync_selected_layer();
        self.events.emit(EditorEvent::FrameChanged { old, new: frame });
        self.events.emit(EditorEvent::RedrawRequested);
    }

    /// Keep the selected layer inside the folder under (selected row, current frame)
    fn sync_selected_layer(&mut self) {
        let folder = self.selected_folder().map(FrameFolder::id);
        let next = match (folder, self.selected_layer) {
            (Some(folder), Some(layer)) if layer.folder() == folder && self.document.has_layer(layer) => Some(layer),
            (Some(folder), _) => Some(folder.main_layer()),
            (None, _) => None,
        };
        if next != self.selected_layer {
            self.selected_layer = next;
            self.events.emit(EditorEvent::LayerChanged(LayerEvent::Selected(next)));
        }
    }

    // ---- gestures -------------------------------------------------------

    /// Drop an unfinished gesture, restoring the document to how it was before
    /// it started, and clear the selection. Nothing is recorded.
    pub fn abandon_gesture(&mut self) {
        if self.state.is_gesture() {
            log::info!("abandoned {} gesture", self.state.name());
            if let Some(before) = self.baseline.take() {
                self.document = before;
            }
        }
        self.baseline = None;
        self.clear_selection();
    }

    fn clear_selection(&mut self) {
        let had_selection = self.lasso.is_active || !self.lasso.points.is_empty();
        self.lasso.clear();
        self.resize_box = None;
        self.state = EditorState::Idle;
        if had_selection {
            self.events.emit(EditorEvent::SelectionChanged(SelectionEvent::Cleared));
            self.events.emit(EditorEvent::RedrawRequested);
        }
    }

    fn tool_context(&mut self) -> (&mut ToolType, ToolContext<'_>) {
        let layer = self.selected_layer;
        (
            &mut self.tool,
            ToolContext {
                document: &mut self.document,
                state: &mut self.state,
                lasso: &mut self.lasso,
                resize_box: &mut self.resize_box,
                settings: &self.settings,
                layer,
            },
        )
    }

    /// Feed one pointer event through the interaction state machine
    pub fn handle_input(&mut self, event: InputEvent) -> CommandResult {
        let before_state = self.state.name();
        let drawing = self.state.drawing_stroke();

        let result = match event {
            InputEvent::PointerDown { pos } => {
                self.hover = Some(pos);
                if self.state.is_gesture() {
                    return Ok(());
                }
                self.baseline = Some(self.document.clone());
                let (tool, mut ctx) = self.tool_context();
                tool.on_pointer_down(pos, &mut ctx)
            }
            InputEvent::PointerMove { pos } => {
                self.hover = Some(pos);
                let erasing = matches!(self.tool, ToolType::Eraser(_));
                let (tool, mut ctx) = self.tool_context();
                tool.on_pointer_move(pos, &mut ctx).map(|outcome| match outcome {
                    // the cursor circle follows the pointer
                    ToolOutcome::None if erasing => ToolOutcome::Redraw,
                    other => other,
                })
            }
            InputEvent::PointerUp { pos } => {
                self.hover = Some(pos);
                let (tool, mut ctx) = self.tool_context();
                tool.on_pointer_up(pos, &mut ctx)
            }
            InputEvent::Hover { pos } => {
                self.hover = pos;
                Ok(if self.eraser_cursor().is_some() || pos.is_none() {
                    ToolOutcome::Redraw
                } else {
                    ToolOutcome::None
                })
            }
            InputEvent::Cancel => {
                self.abandon_gesture();
                Ok(ToolOutcome::Redraw)
            }
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!("{} gesture failed: {}", before_state, err);
                self.abandon_gesture();
                return Err(err);
            }
        };
        self.finish_outcome(outcome);

        if let (Some((layer, _)), ToolOutcome::Commit) = (drawing, outcome) {
            self.events.emit(EditorEvent::StrokeCompleted { layer });
        }
        match (before_state, self.state.name()) {
            ("LassoBuilding", "LassoActive") => {
                let strokes = self.lasso.selected_stroke_ids.len();
                self.events.emit(EditorEvent::SelectionChanged(SelectionEvent::Created { strokes }));
            }
            ("Moving" | "Resizing", "LassoActive") => {
                self.events.emit(EditorEvent::SelectionChanged(SelectionEvent::Modified));
            }
            _ => {}
        }
        if !self.state.is_gesture() {
            self.baseline = None;
        }
        Ok(())
    }

    fn finish_outcome(&mut self, outcome: ToolOutcome) {
        match outcome {
            ToolOutcome::None => {}
            ToolOutcome::Redraw => self.events.emit(EditorEvent::RedrawRequested),
            ToolOutcome::Commit => {
                if let Some(before) = self.baseline.take() {
                    self.commit(before);
                }
                self.events.emit(EditorEvent::RedrawRequested);
            }
        }
    }

    fn commit(&mut self, before: Document) {
        self.history.commit(before);
        log::info!("committed edit ({} undo steps)", self.history.undo_len());
        self.emit_history();
    }

    fn emit_history(&mut self) {
        self.events.emit(EditorEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    /// Run a structural edit: abandon gestures, apply `f`, record a snapshot if it changed anything
    fn edit<T>(&mut self, f: impl FnOnce(&mut Document) -> Result<(T, bool), DocumentError>) -> Result<T, CommandError> {
        self.abandon_gesture();
        let before = self.document.clone();
        let (value, changed) = f(&mut self.document)?;
        if changed {
            self.commit(before);
            self.events.emit(EditorEvent::RedrawRequested);
        }
        Ok(value)
    }

    /// Run a clipboard operation on the live selection
    fn clipboard_op(&mut self, op: impl FnOnce(&mut Clipboard, &mut ToolContext<'_>, &EditorConfig) -> crate::tools::ToolResult) -> CommandResult {
        if self.state.is_gesture() {
            return Ok(());
        }
        let before = self.document.clone();
        let layer = self.selected_layer;
        let mut ctx = ToolContext {
            document: &mut self.document,
            state: &mut self.state,
            lasso: &mut self.lasso,
            resize_box: &mut self.resize_box,
            settings: &self.settings,
            layer,
        };
        let outcome = op(&mut self.clipboard, &mut ctx, &self.config)?;
        if outcome == ToolOutcome::Commit {
            self.commit(before);
            self.events.emit(EditorEvent::SelectionChanged(SelectionEvent::Modified));
        }
        self.finish_outcome(match outcome {
            ToolOutcome::Commit => ToolOutcome::Redraw,
            other => other,
        });
        Ok(())
    }

    // ---- commands -------------------------------------------------------

    /// Apply one command to the session
    pub fn apply_command(&mut self, command: Command) -> CommandResult {
        log::debug!("apply {:?}", command);
        match command {
            Command::AddRow { name } => {
                let row = self.edit(|doc| Ok((doc.add_row(name), true)))?;
                if self.view.selected_row.is_none() {
                    self.view.selected_row = Some(row);
                    self.sync_selected_layer();
                }
            }
            Command::RenameRow { row, name } => {
                self.edit(|doc| doc.rename_row(row, name).map(|_| ((), true)))?;
            }
            Command::DeleteRow(row) => {
                self.edit(|doc| doc.remove_row(row).map(|_| ((), true)))?;
                if self.view.selected_row == Some(row) {
                    self.view.selected_row = self.document.timeline().rows().first().map(|r| r.id);
                }
                self.sync_selected_layer();
            }
            Command::SelectRow(row) => {
                if let Some(row) = row {
                    if self.document.timeline().row(row).is_none() {
                        return Err(CommandError::UnknownRow(row));
                    }
                }
                if row != self.view.selected_row {
                    self.abandon_gesture();
                    self.view.selected_row = row;
                    self.sync_selected_layer();
                    self.events.emit(EditorEvent::RedrawRequested);
                }
            }

            Command::AddFolder { row, frame_index, length } => {
                let folder = self.edit(|doc| doc.add_folder(row, frame_index, length).map(|id| (id, true)))?;
                log::info!("📁 added frame folder {} (length {})", folder, length);
                self.events.emit(EditorEvent::LayerChanged(LayerEvent::FolderAdded(folder)));
                self.sync_selected_layer();
            }
            Command::DeleteFolder(folder) => {
                self.edit(|doc| doc.remove_folder(folder).map(|_| ((), true)))?;
                self.events.emit(EditorEvent::LayerChanged(LayerEvent::FolderRemoved(folder)));
                self.sync_selected_layer();
            }
            Command::SetFolderLength { folder, length } => {
                self.edit(|doc| doc.set_folder_length(folder, length).map(|_| ((), true)))?;
                self.sync_selected_layer();
            }
            Command::SetFolderImage { folder, image_url, file_name } => {
                self.edit(|doc| doc.set_folder_image(folder, image_url, file_name).map(|_| ((), true)))?;
            }
            Command::RenameFolder { folder, name } => {
                self.edit(|doc| doc.set_folder_name(folder, name).map(|_| ((), true)))?;
            }
            Command::SelectFrame(frame) => {
                if frame == 0 {
                    return Err(CommandError::InvalidParameters("frame numbers start at 1".into()));
                }
                self.set_frame(frame);
            }

            Command::AddLayer(folder) => {
                if self.document.folder(folder).is_none() {
                    return Err(CommandError::UnknownFolder(folder));
                }
                let layer = self.edit(|doc| doc.add_extra_layer(folder).map(|layer| (layer, true)))?;
                self.events.emit(EditorEvent::LayerChanged(LayerEvent::Added(layer)));
                self.select_layer(Some(layer))?;
            }
            Command::DeleteLayer(layer) => {
                self.edit(|doc| doc.remove_layer(layer).map(|_| ((), true)))?;
                self.events.emit(EditorEvent::LayerChanged(LayerEvent::Removed(layer)));
                if self.selected_layer == Some(layer) {
                    self.selected_layer = Some(layer.folder().main_layer());
                    self.events.emit(EditorEvent::LayerChanged(LayerEvent::Selected(self.selected_layer)));
                }
            }
            Command::ReorderLayer { layer, direction } => {
                let moved = self.edit(|doc| doc.reorder_layer(layer.folder(), layer, direction).map(|moved| (moved, moved)))?;
                if moved {
                    self.events.emit(EditorEvent::LayerChanged(LayerEvent::Reordered(layer)));
                }
            }
            Command::SetLayerVisibility { layer, visible } => {
                self.edit(|doc| {
                    let props = doc.layer_props_mut(layer)?;
                    let changed = props.visible != visible;
                    props.visible = visible;
                    Ok(((), changed))
                })?;
                self.events.emit(EditorEvent::LayerChanged(LayerEvent::PropsChanged(layer)));
            }
            Command::SetLayerOpacity { layer, opacity } => {
                self.edit(|doc| {
                    let props = doc.layer_props_mut(layer)?;
                    let old = props.opacity;
                    props.set_opacity(opacity);
                    Ok(((), props.opacity != old))
                })?;
                self.events.emit(EditorEvent::LayerChanged(LayerEvent::PropsChanged(layer)));
            }
            Command::RenameLayer { layer, name } => {
                self.edit(|doc| {
                    let props = doc.layer_props_mut(layer)?;
                    let changed = props.name != name;
                    props.name = name;
                    Ok(((), changed))
                })?;
                self.events.emit(EditorEvent::LayerChanged(LayerEvent::PropsChanged(layer)));
            }
            Command::SelectLayer(layer) => self.select_layer(layer)?,

            Command::SetTool(kind) => {
                let old = self.tool.kind();
                if kind != old {
                    self.abandon_gesture();
                    self.tool = ToolType::from_kind(kind);
                    log::info!("🔧 tool {} -> {}", old.label(), kind.label());
                    self.events.emit(EditorEvent::ToolChanged { old, new: kind });
                    self.events.emit(EditorEvent::RedrawRequested);
                }
            }
            Command::SetBrushColor(color) => self.settings.color = color,
            Command::SetBrushSize(size) => self.settings.brush_size = positive(size, "brush size")?,
            Command::SetEraserSize(size) => {
                self.settings.eraser_size = positive(size, "eraser size")?;
                self.events.emit(EditorEvent::RedrawRequested);
            }
            Command::SetEraserMode(mode) => self.settings.eraser_mode = mode,

            Command::Copy => self.clipboard_op(|clipboard, ctx, _| clipboard.copy(ctx))?,
            Command::Cut => self.clipboard_op(|clipboard, ctx, _| clipboard.cut(ctx))?,
            Command::Paste => self.clipboard_op(|clipboard, ctx, _| clipboard.paste(ctx))?,
            Command::Duplicate => {
                self.clipboard_op(|_, ctx, config| Clipboard::duplicate(ctx, config.duplicate_offset()))?
            }
            Command::DeleteSelection => self.clipboard_op(|_, ctx, _| Clipboard::delete_selection(ctx))?,

            Command::Undo => self.step_history(true),
            Command::Redo => self.step_history(false),

            Command::SetOnionSkin(on) => {
                self.view.onion_skin = on;
                self.events.emit(EditorEvent::RedrawRequested);
            }
            Command::SetShowGrid(on) => {
                self.view.show_grid = on;
                self.events.emit(EditorEvent::RedrawRequested);
            }
            Command::SetZoom(zoom) => {
                if !zoom.is_finite() || zoom <= 0.0 {
                    return Err(CommandError::InvalidParameters(format!("zoom {zoom}")));
                }
                self.view.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
                self.events.emit(EditorEvent::RedrawRequested);
            }
        }
        Ok(())
    }

    fn select_layer(&mut self, layer: Option<LayerRef>) -> CommandResult {
        if let Some(layer) = layer {
            if !self.document.has_layer(layer) {
                return Err(CommandError::UnknownLayer(layer));
            }
        }
        if layer == self.selected_layer {
            return Ok(());
        }
        self.abandon_gesture();
        self.selected_layer = layer;
        if let Some(layer) = layer {
            let folder = layer.folder();
            self.view.selected_row = Some(folder.row);
            let covers_frame = self
                .document
                .folder(folder)
                .is_some_and(|f| f.contains(self.view.current_frame));
            if !covers_frame {
                let old = self.view.current_frame;
                self.view.current_frame = folder.frame_index;
                self.events.emit(EditorEvent::FrameChanged {
                    old,
                    new: folder.frame_index,
                });
            }
        }
        self.events.emit(EditorEvent::LayerChanged(LayerEvent::Selected(layer)));
        self.events.emit(EditorEvent::RedrawRequested);
        Ok(())
    }

    fn step_history(&mut self, undo: bool) {
        self.abandon_gesture();
        let stepped = if undo {
            self.history.undo(&mut self.document)
        } else {
            self.history.redo(&mut self.document)
        };
        if !stepped {
            log::debug!("nothing to {}", if undo { "undo" } else { "redo" });
            return;
        }
        log::info!("{} ({} undo / {} redo)", if undo { "↩️ undo" } else { "↪️ redo" }, self.history.undo_len(), self.history.redo_len());
        if self.view.selected_row.is_some_and(|row| self.document.timeline().row(row).is_none()) {
            self.view.selected_row = self.document.timeline().rows().first().map(|row| row.id);
        }
        self.sync_selected_layer();
        self.emit_history();
        self.events.emit(EditorEvent::RedrawRequested);
    }
}

fn positive(value: f32, what: &str) -> Result<f32, CommandError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CommandError::InvalidParameters(format!("{what} must be positive, got {value}")))
    }
}
