use std::io::{self, Write};

use crossterm::QueueableCommand;
use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use unicode_width::UnicodeWidthChar;

use crate::color::ColorLevel;
use crate::tui::geometry::{Point, Size};

/// Marks the cell covered by the right half of a wide glyph.
pub const CONTINUATION: char = '\0';

/// One character cell: a glyph and the two colors it is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub glyph: char,
    pub background: Color,
    pub foreground: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            glyph: ' ',
            background: Color::Reset,
            foreground: Color::Reset,
        }
    }
}

impl Cell {
    pub fn new(glyph: char, background: Color, foreground: Color) -> Self {
        Self {
            glyph,
            background,
            foreground,
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.glyph == CONTINUATION
    }
}

/// An off-screen rectangle of cells that controls render into.
///
/// Drawing never fails: anything outside the buffer is clipped. The current
/// drawing colors are applied to every cell written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalBuffer {
    size: Size,
    cells: Vec<Cell>,
    background: Color,
    foreground: Color,
}

impl TerminalBuffer {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            cells: vec![Cell::default(); size.area()],
            background: Color::Reset,
            foreground: Color::Reset,
        }
    }

    pub fn width(&self) -> u16 {
        self.size.width
    }

    pub fn height(&self) -> u16 {
        self.size.height
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn set_drawing_colors(&mut self, background: Color, foreground: Color) -> &mut Self {
        self.background = background;
        self.foreground = foreground;
        self
    }

    pub fn set_background(&mut self, color: Color) -> &mut Self {
        self.background = color;
        self
    }

    pub fn set_foreground(&mut self, color: Color) -> &mut Self {
        self.foreground = color;
        self
    }

    /// Current `(background, foreground)` drawing colors.
    pub fn drawing_colors(&self) -> (Color, Color) {
        (self.background, self.foreground)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if x < self.size.width && y < self.size.height {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.size.width as usize + x as usize
    }

    /// Map a signed position into the buffer, or `None` if it is clipped.
    fn local(&self, x: i64, y: i64) -> Option<(u16, u16)> {
        if x < 0 || y < 0 || x >= self.size.width as i64 || y >= self.size.height as i64 {
            return None;
        }
        Some((x as u16, y as u16))
    }

    fn put_local(&mut self, x: u16, y: u16, glyph: char) {
        let idx = self.index(x, y);
        self.cells[idx] = Cell::new(glyph, self.background, self.foreground);
    }

    /// Write one glyph with the drawing colors. Returns false if clipped.
    pub fn put(&mut self, at: Point, glyph: char) -> bool {
        match self.local(at.x as i64, at.y as i64) {
            Some((x, y)) => {
                self.put_local(x, y, glyph);
                true
            }
            None => false,
        }
    }

    /// Draw a rectangle of `glyph`, either filled or as a one-cell outline.
    pub fn draw_rectangle(
        &mut self,
        glyph: char,
        origin: Point,
        size: Size,
        filled: bool,
    ) -> &mut Self {
        if size.is_empty() {
            return self;
        }

        let left = origin.x as i64;
        let top = origin.y as i64;
        let right = left + size.width as i64 - 1;
        let bottom = top + size.height as i64 - 1;

        let x_range = left.max(0)..=right.min(self.size.width as i64 - 1);
        let y_range = top.max(0)..=bottom.min(self.size.height as i64 - 1);

        for y in y_range {
            for x in x_range.clone() {
                let on_edge = x == left || x == right || y == top || y == bottom;
                if filled || on_edge {
                    self.put_local(x as u16, y as u16, glyph);
                }
            }
        }
        self
    }

    /// Write `text` on one row starting at `origin`, clipped to the buffer.
    ///
    /// Wide glyphs take two cells; one that would be cut by the right edge is
    /// not drawn. Zero-width and control characters are skipped.
    pub fn draw_text(&mut self, origin: Point, text: &str) -> &mut Self {
        let y = origin.y as i64;
        if y < 0 || y >= self.size.height as i64 {
            return self;
        }

        let mut x = origin.x as i64;
        for ch in text.chars() {
            let width = match ch.width() {
                Some(0) | None => continue,
                Some(width) => width as i64,
            };
            if x >= self.size.width as i64 {
                break;
            }
            if x >= 0 && x + width <= self.size.width as i64 {
                self.put_local(x as u16, y as u16, ch);
                for tail in 1..width {
                    self.put_local((x + tail) as u16, y as u16, CONTINUATION);
                }
            }
            x += width;
        }
        self
    }

    /// Paint `source` over this buffer with its origin at `offset`.
    ///
    /// Source cells that land outside this buffer are dropped; cells inside
    /// overwrite whatever was there. A wide glyph split by the clip, or by the
    /// edge of the pasted span, is replaced with a blank in its own colors.
    pub fn merge(&mut self, source: &TerminalBuffer, offset: Point) -> &mut Self {
        if source.size.is_empty() || self.size.is_empty() {
            return self;
        }

        let off_x = offset.x as i64;
        let off_y = offset.y as i64;

        let src_x_start = (-off_x).max(0);
        let src_x_end = (self.size.width as i64 - off_x).min(source.size.width as i64);
        let src_y_start = (-off_y).max(0);
        let src_y_end = (self.size.height as i64 - off_y).min(source.size.height as i64);

        if src_x_start >= src_x_end || src_y_start >= src_y_end {
            return self;
        }

        let len = (src_x_end - src_x_start) as usize;
        let dst_x = (src_x_start + off_x) as usize;
        let width = self.size.width as usize;

        for sy in src_y_start..src_y_end {
            let src_row = source.index(src_x_start as u16, sy as u16);
            let first = self.index(dst_x as u16, (sy + off_y) as u16);
            let last = first + len - 1;
            self.cells[first..=last].copy_from_slice(&source.cells[src_row..src_row + len]);

            // Halves cut off by the source clip.
            if src_x_start > 0 && self.cells[first].is_continuation() {
                self.cells[first].glyph = ' ';
            }
            if src_x_end < source.size.width as i64 && is_wide(self.cells[last].glyph) {
                self.cells[last].glyph = ' ';
            }
            // Halves of destination glyphs the span overwrote.
            if dst_x > 0 && is_wide(self.cells[first - 1].glyph) {
                self.cells[first - 1].glyph = ' ';
            }
            if dst_x + len < width && self.cells[last + 1].is_continuation() {
                self.cells[last + 1].glyph = ' ';
            }
        }
        self
    }

    /// Rows as plain strings, wide-glyph continuations removed.
    pub fn to_lines(&self) -> Vec<String> {
        if self.size.width == 0 {
            return vec![String::new(); self.size.height as usize];
        }
        self.cells
            .chunks(self.size.width as usize)
            .map(|row| {
                row.iter()
                    .filter(|cell| !cell.is_continuation())
                    .map(|cell| cell.glyph)
                    .collect()
            })
            .collect()
    }

    /// Queue the buffer onto a terminal with its top-left corner at `origin`.
    ///
    /// Colors are reduced to what `level` supports. The writer is flushed.
    pub fn flush<W: Write>(
        &self,
        out: &mut W,
        origin: (u16, u16),
        level: ColorLevel,
    ) -> io::Result<()> {
        let mut background = None;
        let mut foreground = None;

        for y in 0..self.size.height {
            let row_y = origin.1.saturating_add(y);
            out.queue(MoveTo(origin.0, row_y))?;
            let mut expect_tail = false;

            for x in 0..self.size.width {
                let cell = self.cells[self.index(x, y)];

                if cell.is_continuation() && expect_tail {
                    expect_tail = false;
                    continue;
                }
                if expect_tail {
                    // The wide glyph before this one lost its right half.
                    out.queue(MoveTo(origin.0.saturating_add(x), row_y))?;
                }

                let bg = level.adapt(cell.background);
                if background != Some(bg) {
                    out.queue(SetBackgroundColor(bg))?;
                    background = Some(bg);
                }
                let fg = level.adapt(cell.foreground);
                if foreground != Some(fg) {
                    out.queue(SetForegroundColor(fg))?;
                    foreground = Some(fg);
                }

                let glyph = if cell.is_continuation() { ' ' } else { cell.glyph };
                out.queue(Print(glyph))?;
                expect_tail = glyph.width().unwrap_or(1) > 1;
            }
        }

        out.queue(ResetColor)?;
        out.flush()
    }
}

fn is_wide(glyph: char) -> bool {
    glyph.width().unwrap_or(1) > 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_blank() {
        let buffer = TerminalBuffer::new(Size::new(3, 2));
        assert_eq!(buffer.cells().len(), 6);
        assert!(buffer.cells().iter().all(|c| *c == Cell::default()));
        assert_eq!(buffer.to_lines(), vec!["   ", "   "]);
    }

    #[test]
    fn test_filled_rectangle_uses_drawing_colors() {
        let mut buffer = TerminalBuffer::new(Size::new(4, 3));
        buffer
            .set_drawing_colors(Color::Blue, Color::White)
            .draw_rectangle('#', Point::new(1, 1), Size::new(2, 2), true);

        assert_eq!(buffer.to_lines(), vec!["    ", " ## ", " ## "]);
        let cell = buffer.get(1, 1).unwrap();
        assert_eq!(cell.background, Color::Blue);
        assert_eq!(cell.foreground, Color::White);
        assert_eq!(buffer.get(0, 0).unwrap().background, Color::Reset);
    }

    #[test]
    fn test_outline_rectangle() {
        let mut buffer = TerminalBuffer::new(Size::new(4, 3));
        buffer.draw_rectangle('*', Point::ORIGIN, Size::new(4, 3), false);
        assert_eq!(buffer.to_lines(), vec!["****", "*  *", "****"]);
    }

    #[test]
    fn test_rectangle_clipped_at_negative_origin() {
        let mut buffer = TerminalBuffer::new(Size::new(3, 3));
        buffer.draw_rectangle('x', Point::new(-2, -2), Size::new(4, 4), true);
        assert_eq!(buffer.to_lines(), vec!["xx ", "xx ", "   "]);
    }

    #[test]
    fn test_draw_text_clips_right_edge() {
        let mut buffer = TerminalBuffer::new(Size::new(4, 1));
        buffer.draw_text(Point::new(1, 0), "hello");
        assert_eq!(buffer.to_lines(), vec![" hel"]);
    }

    #[test]
    fn test_draw_text_wide_glyph() {
        let mut buffer = TerminalBuffer::new(Size::new(5, 1));
        buffer.draw_text(Point::ORIGIN, "a世b");
        assert_eq!(buffer.get(1, 0).unwrap().glyph, '世');
        assert!(buffer.get(2, 0).unwrap().is_continuation());
        assert_eq!(buffer.get(3, 0).unwrap().glyph, 'b');
        assert_eq!(buffer.to_lines(), vec!["a世b "]);
    }

    #[test]
    fn test_wide_glyph_cut_by_edge_is_dropped() {
        let mut buffer = TerminalBuffer::new(Size::new(2, 1));
        buffer.draw_text(Point::new(1, 0), "世");
        assert_eq!(buffer.to_lines(), vec!["  "]);
    }

    #[test]
    fn test_merge_at_offset() {
        let mut dest = TerminalBuffer::new(Size::new(5, 3));
        let mut src = TerminalBuffer::new(Size::new(2, 1));
        src.draw_text(Point::ORIGIN, "ab");

        dest.merge(&src, Point::new(2, 1));
        assert_eq!(dest.to_lines(), vec!["     ", "  ab ", "     "]);
    }

    #[test]
    fn test_merge_clips_every_side() {
        let mut src = TerminalBuffer::new(Size::new(3, 3));
        src.draw_rectangle('o', Point::ORIGIN, Size::new(3, 3), true);

        let mut dest = TerminalBuffer::new(Size::new(4, 4));
        dest.merge(&src, Point::new(-1, -1));
        dest.merge(&src, Point::new(3, 3));
        assert_eq!(dest.to_lines(), vec!["oo  ", "oo  ", "    ", "   o"]);
    }

    fn wide_source() -> TerminalBuffer {
        let mut src = TerminalBuffer::new(Size::new(2, 1));
        src.draw_text(Point::ORIGIN, "世");
        src
    }

    #[test]
    fn test_merge_blanks_wide_glyph_losing_its_tail() {
        let mut dest = TerminalBuffer::new(Size::new(2, 1));
        dest.merge(&wide_source(), Point::new(1, 0));

        assert_eq!(dest.get(1, 0).unwrap().glyph, ' ');
        assert_eq!(dest.to_lines(), vec!["  "]);

        let mut out = Vec::new();
        dest.flush(&mut out, (0, 0), ColorLevel::None).unwrap();
        assert!(!String::from_utf8(out).unwrap().contains('世'));
    }

    #[test]
    fn test_merge_blanks_tail_losing_its_wide_glyph() {
        let mut dest = TerminalBuffer::new(Size::new(2, 1));
        dest.merge(&wide_source(), Point::new(-1, 0));

        assert!(!dest.get(0, 0).unwrap().is_continuation());
        assert_eq!(dest.to_lines(), vec!["  "]);
    }

    #[test]
    fn test_merge_over_half_of_wide_glyph() {
        let mut dot = TerminalBuffer::new(Size::new(1, 1));
        dot.draw_text(Point::ORIGIN, "x");

        let mut dest = TerminalBuffer::new(Size::new(2, 1));
        dest.draw_text(Point::ORIGIN, "世");
        dest.merge(&dot, Point::new(1, 0));
        assert_eq!(dest.to_lines(), vec![" x"]);

        let mut dest = TerminalBuffer::new(Size::new(2, 1));
        dest.draw_text(Point::ORIGIN, "世");
        dest.merge(&dot, Point::ORIGIN);
        assert_eq!(dest.to_lines(), vec!["x "]);
    }

    #[test]
    fn test_merge_keeps_whole_wide_glyph() {
        let mut dest = TerminalBuffer::new(Size::new(4, 1));
        dest.merge(&wide_source(), Point::new(1, 0));
        assert_eq!(dest.get(1, 0).unwrap().glyph, '世');
        assert!(dest.get(2, 0).unwrap().is_continuation());
        assert_eq!(dest.to_lines(), vec![" 世 "]);
    }

    #[test]
    fn test_merge_fully_outside_is_noop() {
        let mut src = TerminalBuffer::new(Size::new(2, 2));
        src.draw_rectangle('o', Point::ORIGIN, Size::new(2, 2), true);
        let mut dest = TerminalBuffer::new(Size::new(2, 2));
        let before = dest.clone();

        dest.merge(&src, Point::new(10, 0));
        dest.merge(&src, Point::new(0, -10));
        assert_eq!(dest, before);
    }

    #[test]
    fn test_merge_degenerate_source() {
        let src = TerminalBuffer::new(Size::new(0, 4));
        let mut dest = TerminalBuffer::new(Size::new(2, 2));
        let before = dest.clone();
        dest.merge(&src, Point::ORIGIN);
        assert_eq!(dest, before);
    }

    #[test]
    fn test_flush_emits_glyphs() {
        let mut buffer = TerminalBuffer::new(Size::new(2, 1));
        buffer.draw_text(Point::ORIGIN, "ok");
        let mut out = Vec::new();
        buffer.flush(&mut out, (0, 0), ColorLevel::None).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("ok"));
    }
}
