use crate::command::CommandError;
use crate::config::ConfigError;
use crate::document::DocumentError;
use crate::effects::EffectError;
use crate::export::ExportError;
use crate::import::AssetError;
use crate::persistence::PersistenceError;
use crate::timeline::TimelineError;
use thiserror::Error;

/// Any failure surfaced to the UI shell
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error(transparent)]
    Effect(#[from] EffectError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type EditorResult<T> = Result<T, EditorError>;
