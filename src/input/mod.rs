use crate::command::Command;
use egui::{Context, Key, Modifiers, PointerButton, Pos2, Rect, Vec2};

/// Pointer events in canvas pixel space, consumed by the interaction state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { pos: Pos2 },
    PointerMove { pos: Pos2 },
    PointerUp { pos: Pos2 },
    /// Pointer moved without a button held; `None` when it left the canvas
    Hover { pos: Option<Pos2> },
    /// Abandon whatever gesture is in progress
    Cancel,
}

/// Maps between screen space and canvas pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasView {
    /// Screen position of canvas pixel (0, 0)
    pub origin: Pos2,
    pub zoom: f32,
}

impl Default for CanvasView {
    fn default() -> Self {
        Self {
            origin: Pos2::ZERO,
            zoom: 1.0,
        }
    }
}

impl CanvasView {
    /// Centre a canvas of `canvas_size` pixels inside `panel`
    pub fn centered(panel: Rect, canvas_size: Vec2, zoom: f32) -> Self {
        Self {
            origin: panel.center() - canvas_size * zoom / 2.0,
            zoom,
        }
    }

    pub fn screen_to_canvas(&self, pos: Pos2) -> Pos2 {
        Pos2::ZERO + (pos - self.origin) / self.zoom
    }

    pub fn canvas_to_screen(&self, pos: Pos2) -> Pos2 {
        self.origin + pos.to_vec2() * self.zoom
    }

    /// Screen rect covered by a canvas-space rect
    pub fn canvas_rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.canvas_to_screen(rect.min), self.canvas_to_screen(rect.max))
    }
}

/// Turns raw egui input over the canvas into [`InputEvent`]s
#[derive(Debug, Default)]
pub struct InputHandler {
    last_pointer_pos: Option<Pos2>,
    /// True between a primary press inside the canvas and its release
    dragging: bool,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Process this frame's pointer input. Presses only start gestures inside
    /// `canvas_rect`; a drag that started inside keeps reporting outside it.
    pub fn process_input(&mut self, ctx: &Context, canvas_rect: Rect, view: &CanvasView) -> Vec<InputEvent> {
        let mut events = Vec::new();

        ctx.input(|input| {
            let hover = input.pointer.hover_pos();
            let to_canvas = |pos: Pos2| view.screen_to_canvas(pos);

            if input.pointer.button_pressed(PointerButton::Primary) {
                if let Some(pos) = hover.filter(|pos| canvas_rect.contains(*pos)) {
                    self.dragging = true;
                    events.push(InputEvent::PointerDown { pos: to_canvas(pos) });
                }
            }

            if hover != self.last_pointer_pos {
                match hover {
                    Some(pos) if self.dragging => events.push(InputEvent::PointerMove { pos: to_canvas(pos) }),
                    Some(pos) if canvas_rect.contains(pos) => events.push(InputEvent::Hover {
                        pos: Some(to_canvas(pos)),
                    }),
                    _ if !self.dragging => events.push(InputEvent::Hover { pos: None }),
                    _ => {}
                }
                self.last_pointer_pos = hover;
            }

            if self.dragging && !input.pointer.button_down(PointerButton::Primary) {
                self.dragging = false;
                match hover.or(self.last_pointer_pos) {
                    Some(pos) => events.push(InputEvent::PointerUp { pos: to_canvas(pos) }),
                    None => events.push(InputEvent::Cancel),
                }
            }

            if input.key_pressed(Key::Escape) {
                self.dragging = false;
                events.push(InputEvent::Cancel);
            }
        });

        events
    }

    /// Keyboard shortcuts for history and clipboard
    pub fn shortcut_commands(ctx: &Context) -> Vec<Command> {
        ctx.input(|input| {
            let mut commands = Vec::new();
            let cmd = input.modifiers.command;
            let shift = input.modifiers.shift;

            if cmd && input.key_pressed(Key::Z) {
                commands.push(if shift { Command::Redo } else { Command::Undo });
            }
            if cmd && input.key_pressed(Key::Y) {
                commands.push(Command::Redo);
            }
            if input.modifiers.matches_exact(Modifiers::COMMAND) {
                if input.key_pressed(Key::C) {
                    commands.push(Command::Copy);
                }
                if input.key_pressed(Key::X) {
                    commands.push(Command::Cut);
                }
                if input.key_pressed(Key::V) {
                    commands.push(Command::Paste);
                }
                if input.key_pressed(Key::D) {
                    commands.push(Command::Duplicate);
                }
            }
            if input.key_pressed(Key::Delete) || input.key_pressed(Key::Backspace) {
                commands.push(Command::DeleteSelection);
            }
            commands
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_round_trip() {
        let view = CanvasView {
            origin: Pos2::new(100.0, 50.0),
            zoom: 2.0,
        };
        let canvas = view.screen_to_canvas(Pos2::new(140.0, 70.0));
        assert_eq!(canvas, Pos2::new(20.0, 10.0));
        assert_eq!(view.canvas_to_screen(canvas), Pos2::new(140.0, 70.0));
    }

    #[test]
    fn test_centered_view() {
        let panel = Rect::from_min_size(Pos2::ZERO, Vec2::new(400.0, 300.0));
        let view = CanvasView::centered(panel, Vec2::new(200.0, 100.0), 1.0);
        assert_eq!(view.origin, Pos2::new(100.0, 100.0));
    }
}
