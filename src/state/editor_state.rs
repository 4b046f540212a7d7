//! The interaction state machine of the editor.
//!
//! Every pointer gesture is one trip around this graph; the variants carry
//! exactly the data the gesture needs to finish or be abandoned.
//!
//! ```text
//!          ┌──────────► Drawing ─────────┐
//!          │                             │
//!   Idle ──┼──────────► Erasing ─────────┼──► Idle
//!          │                             │
//!          └──► LassoBuilding ──► LassoActive ──► Idle
//!                    ▲              │   ▲
//!                    └──────────────┤   │
//!                                   ▼   │
//!                         Moving / Resizing
//! ```

use crate::layer::LayerRef;
use crate::stroke::{Stroke, StrokeId};
use crate::widgets::Corner;
use egui::{Pos2, Rect};
use thiserror::Error;

/// Raised when a gesture tries to jump to a state it cannot reach
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot transition from {from} to {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

/// What a resize gesture is dragging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    Corner(Corner),
    /// The box body: translate instead of scale
    Body,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditorState {
    /// No gesture in progress
    #[default]
    Idle,
    /// Capturing a stroke that already lives in `layer`
    Drawing { layer: LayerRef, stroke: StrokeId },
    /// Eraser held down
    Erasing {
        layer: LayerRef,
        last: Pos2,
        /// Every sample of the gesture so far
        samples: Vec<Pos2>,
        changed: bool,
    },
    /// Tracing a lasso polygon
    LassoBuilding { layer: LayerRef },
    /// A lasso selection exists and the pointer is up
    LassoActive { layer: LayerRef },
    /// Dragging the lasso contents
    Moving {
        layer: LayerRef,
        start: Pos2,
        origin: Vec<Stroke>,
        lasso_origin: Vec<Pos2>,
        box_origin: Option<Rect>,
    },
    /// Dragging a resize-box handle or its body
    Resizing {
        layer: LayerRef,
        handle: ResizeHandle,
        start: Pos2,
        lasso_origin: Vec<Pos2>,
    },
}

impl EditorState {
    pub fn name(&self) -> &'static str {
        match self {
            EditorState::Idle => "Idle",
            EditorState::Drawing { .. } => "Drawing",
            EditorState::Erasing { .. } => "Erasing",
            EditorState::LassoBuilding { .. } => "LassoBuilding",
            EditorState::LassoActive { .. } => "LassoActive",
            EditorState::Moving { .. } => "Moving",
            EditorState::Resizing { .. } => "Resizing",
        }
    }

    /// Validates whether a transition to the new state is allowed
    pub fn can_transition_to(&self, new_state: &EditorState) -> bool {
        use EditorState::*;
        match (self, new_state) {
            // abandoning or finishing anything lands in Idle
            (_, Idle) => true,

            (Idle, Drawing { .. } | Erasing { .. } | LassoBuilding { .. }) => true,

            (LassoBuilding { .. }, LassoActive { .. }) => true,

            (LassoActive { .. }, LassoBuilding { .. } | Moving { .. } | Resizing { .. }) => true,
            // the selection is rewired in place (duplicate/paste)
            (LassoActive { .. }, LassoActive { .. }) => true,
            (Idle, LassoActive { .. }) => true,

            (Moving { .. } | Resizing { .. }, LassoActive { .. }) => true,

            _ => false,
        }
    }

    /// Checked transition
    pub fn transition(&mut self, new_state: EditorState) -> Result<(), TransitionError> {
        if !self.can_transition_to(&new_state) {
            return Err(TransitionError {
                from: self.name(),
                to: new_state.name(),
            });
        }
        log::debug!("state {} -> {}", self.name(), new_state.name());
        *self = new_state;
        Ok(())
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, EditorState::Idle)
    }

    /// True while the pointer is held down in some gesture
    pub fn is_gesture(&self) -> bool {
        matches!(
            self,
            EditorState::Drawing { .. }
                | EditorState::Erasing { .. }
                | EditorState::LassoBuilding { .. }
                | EditorState::Moving { .. }
                | EditorState::Resizing { .. }
        )
    }

    pub fn has_selection(&self) -> bool {
        matches!(
            self,
            EditorState::LassoActive { .. } | EditorState::Moving { .. } | EditorState::Resizing { .. }
        )
    }

    /// The stroke being captured, if drawing
    pub fn drawing_stroke(&self) -> Option<(LayerRef, StrokeId)> {
        match self {
            EditorState::Drawing { layer, stroke } => Some((*layer, *stroke)),
            _ => None,
        }
    }

    /// The layer the current gesture or selection works on
    pub fn layer(&self) -> Option<LayerRef> {
        match self {
            EditorState::Idle => None,
            EditorState::Drawing { layer, .. }
            | EditorState::Erasing { layer, .. }
            | EditorState::LassoBuilding { layer }
            | EditorState::LassoActive { layer }
            | EditorState::Moving { layer, .. }
            | EditorState::Resizing { layer, .. } => Some(*layer),
        }
    }
}
