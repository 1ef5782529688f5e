use std::any::Any;

use crossterm::style::Color;

use crate::tui::geometry::{Point, Size};
use crate::tui::terminal_buffer::TerminalBuffer;

pub mod block;
pub mod geometry;
pub mod label;
pub mod signal;
pub mod terminal_buffer;
pub mod tree;

pub type Result<T> = std::result::Result<T, crate::error::TreeError>;

/// Attributes every control carries, leaf or container.
///
/// The tree owns these; mutate them through the tree so that invalidation
/// is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub size: Size,
    /// Offset from the parent's origin. Ignored while unattached.
    pub location: Point,
    pub visible: bool,
    pub background: Color,
    pub foreground: Color,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            size: Size::ZERO,
            location: Point::ORIGIN,
            visible: true,
            background: Color::Reset,
            foreground: Color::Reset,
        }
    }
}

impl ControlState {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn at(mut self, location: Point) -> Self {
        self.location = location;
        self
    }

    pub fn with_colors(mut self, background: Color, foreground: Color) -> Self {
        self.background = background;
        self.foreground = foreground;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Downcasting support for concrete controls.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A leaf widget hosted by the tree.
///
/// `render` receives a buffer sized exactly to `state.size` and must fill it
/// from the control's current state alone: rendering twice without changes
/// gives the same cells.
pub trait Control: AsAny {
    fn render(&self, state: &ControlState, buffer: &mut TerminalBuffer);

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "control"
    }
}
