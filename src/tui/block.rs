use crate::tui::geometry::Point;
use crate::tui::terminal_buffer::TerminalBuffer;
use crate::tui::{Control, ControlState};

/// Fills its whole area with one glyph in the control's colors.
#[derive(Debug, Clone)]
pub struct Block {
    glyph: char,
}

impl Block {
    pub fn new(glyph: char) -> Self {
        Block { glyph }
    }

    pub fn glyph(&self) -> char {
        self.glyph
    }

    pub fn set_glyph(&mut self, glyph: char) {
        self.glyph = glyph;
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::new(' ')
    }
}

impl Control for Block {
    fn render(&self, state: &ControlState, buffer: &mut TerminalBuffer) {
        buffer
            .set_drawing_colors(state.background, state.foreground)
            .draw_rectangle(self.glyph, Point::ORIGIN, state.size, true);
    }

    fn name(&self) -> &'static str {
        "block"
    }
}
