// Host surface trait - abstracts over whatever actually displays the editor
use crate::richtext::structured_document::DocumentPosition;

/// Caret bounding box in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaretRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CaretRect {
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

pub trait SurfaceHost {
    /// Bounding box of the caret at `pos`, if it is laid out
    fn caret_rect(&self, pos: DocumentPosition) -> Option<CaretRect>;
    /// Move input focus to the editor. Returns whether focus was granted.
    fn request_focus(&mut self) -> bool;
}

/// Layout-free surface with one line per block and fixed-width glyphs
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    line_height: i32,
    glyph_width: i32,
    grant_focus: bool,
    focus_requests: usize,
}

impl HeadlessSurface {
    pub fn new(line_height: i32, glyph_width: i32) -> Self {
        HeadlessSurface {
            line_height,
            glyph_width,
            grant_focus: true,
            focus_requests: 0,
        }
    }

    /// Refuse focus requests, like a surface that is detached or hidden
    pub fn refusing_focus(mut self) -> Self {
        self.grant_focus = false;
        self
    }

    pub fn set_grant_focus(&mut self, grant: bool) {
        self.grant_focus = grant;
    }

    pub fn focus_requests(&self) -> usize {
        self.focus_requests
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        HeadlessSurface::new(20, 8)
    }
}

impl SurfaceHost for HeadlessSurface {
    fn caret_rect(&self, pos: DocumentPosition) -> Option<CaretRect> {
        let x = i32::try_from(pos.offset).ok()?.checked_mul(self.glyph_width)?;
        let y = i32::try_from(pos.block_index)
            .ok()?
            .checked_mul(self.line_height)?;
        Some(CaretRect {
            x,
            y,
            width: 1,
            height: self.line_height,
        })
    }

    fn request_focus(&mut self) -> bool {
        self.focus_requests += 1;
        self.grant_focus
    }
}
