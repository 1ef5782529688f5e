use unicode_width::UnicodeWidthStr;

use crate::tui::geometry::Point;
use crate::tui::terminal_buffer::TerminalBuffer;
use crate::tui::{Control, ControlState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Static text, one buffer row per line, cut at the control's edges.
#[derive(Debug, Clone)]
pub struct Label {
    text: String,
    alignment: Alignment,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Label {
            text: text.into(),
            alignment: Alignment::Left,
        }
    }

    pub fn aligned(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = alignment;
    }
}

/// Column where a line of `line_width` starts inside `width`.
fn line_start(alignment: Alignment, width: u16, line_width: usize) -> i32 {
    let free = (width as i64 - line_width as i64).max(0) as i32;
    match alignment {
        Alignment::Left => 0,
        Alignment::Center => free / 2,
        Alignment::Right => free,
    }
}

impl Control for Label {
    fn render(&self, state: &ControlState, buffer: &mut TerminalBuffer) {
        buffer
            .set_drawing_colors(state.background, state.foreground)
            .draw_rectangle(' ', Point::ORIGIN, state.size, true);

        for (row, line) in self.text.lines().take(state.size.height as usize).enumerate() {
            let x = line_start(self.alignment, state.size.width, line.width());
            buffer.draw_text(Point::new(x, row as i32), line);
        }
    }

    fn name(&self) -> &'static str {
        "label"
    }
}
