//! Composition core for character-cell user interfaces.
//!
//! Controls live in a [`ControlTree`](tui::tree::ControlTree). Containers own
//! an ordered set of children, paint them into their own buffer at each
//! child's relative location, and relay invalidation up to whoever drives
//! the redraw.

pub mod color;
pub mod error;
pub mod event;
pub mod tui;

pub use error::{ErrorKind, TreeError};
pub use tui::geometry::{Point, Size};
pub use tui::terminal_buffer::{Cell, TerminalBuffer};
pub use tui::tree::{ControlId, ControlTree};
pub use tui::{Control, ControlState};
