#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod command;
pub mod components;
pub mod config;
pub mod document;
pub mod effects;
pub mod error;
pub mod event;
pub mod export;
pub mod file_handler;
pub mod geometry;
pub mod image_cache;
pub mod import;
pub mod input;
pub mod layer;
pub mod panels;
pub mod persistence;
pub mod playback;
pub mod renderer;
pub mod selection;
pub mod state;
pub mod stroke;
pub mod texture_manager;
pub mod timeline;
pub mod tools;
pub mod util;
pub mod widgets;

pub use app::AnimateApp;
pub use command::{Command, CommandError, SnapshotHistory, ToolKind};
pub use config::EditorConfig;
pub use document::Document;
pub use error::{EditorError, EditorResult};
pub use input::InputEvent;
pub use layer::{FolderId, LayerRef, RowId};
pub use renderer::{Compositor, DrawOp};
pub use state::{EditorSession, EditorState};
pub use stroke::Stroke;
pub use timeline::Timeline;
