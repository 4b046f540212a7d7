use egui::{CursorIcon, Pos2, Rect, Vec2};

/// Side length of the square drawn for each resize handle, in canvas pixels
pub const HANDLE_DRAW_SIZE: f32 = 8.0;

/// Represents a corner of a selection box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Corner::TopLeft => "top_left",
            Corner::TopRight => "top_right",
            Corner::BottomLeft => "bottom_left",
            Corner::BottomRight => "bottom_right",
        }
    }

    pub fn cursor_icon(&self) -> CursorIcon {
        match self {
            Corner::TopLeft => CursorIcon::ResizeNwSe,
            Corner::TopRight => CursorIcon::ResizeNeSw,
            Corner::BottomLeft => CursorIcon::ResizeNeSw,
            Corner::BottomRight => CursorIcon::ResizeNwSe,
        }
    }

    /// Where this handle sits on `rect`
    pub fn position(&self, rect: Rect) -> Pos2 {
        match self {
            Corner::TopLeft => rect.left_top(),
            Corner::TopRight => rect.right_top(),
            Corner::BottomLeft => rect.left_bottom(),
            Corner::BottomRight => rect.right_bottom(),
        }
    }

    /// True when dragging this handle moves the left edge
    pub fn moves_left(&self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomLeft)
    }

    /// True when dragging this handle moves the top edge
    pub fn moves_top(&self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }
}

/// Square drawn for `corner`'s handle on `rect`
pub fn handle_rect(corner: Corner, rect: Rect) -> Rect {
    Rect::from_center_size(corner.position(rect), Vec2::splat(HANDLE_DRAW_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_positions() {
        let rect = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(100.0, 50.0));
        assert_eq!(Corner::BottomRight.position(rect), Pos2::new(100.0, 50.0));
        assert!(Corner::TopLeft.moves_left() && Corner::TopLeft.moves_top());
        assert!(!Corner::BottomRight.moves_left());
        let handle = handle_rect(Corner::TopRight, rect);
        assert_eq!(handle.center(), Pos2::new(100.0, 0.0));
        assert_eq!(handle.width(), HANDLE_DRAW_SIZE);
    }
}
