mod commands;
mod history;

use crate::document::DocumentError;
use crate::layer::{FolderId, LayerRef, RowId};
use crate::state::TransitionError;
use thiserror::Error;

pub use commands::{Command, ToolKind};
pub use history::SnapshotHistory;

/// Result type for command operations
pub type CommandResult = Result<(), CommandError>;

/// Errors that can occur while applying a command
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("unknown row {0}")]
    UnknownRow(RowId),
    #[error("unknown frame folder {0}")]
    UnknownFolder(FolderId),
    #[error("unknown layer {0}")]
    UnknownLayer(LayerRef),
    #[error("invalid parameter: {0}")]
    InvalidParameters(String),
}
