use crossterm::event::KeyEvent;

/// What wakes the driver loop up.
#[derive(Debug, Clone)]
pub enum DriverEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    /// Some control in the tree was invalidated.
    Redraw,
}

impl DriverEvent {
    /// Translate a terminal event; mouse, focus and paste events are not used.
    pub fn from_terminal(event: crossterm::event::Event) -> Option<Self> {
        match event {
            crossterm::event::Event::Key(key) => Some(DriverEvent::Key(key)),
            crossterm::event::Event::Resize(x, y) => Some(DriverEvent::Resize(x, y)),
            crossterm::event::Event::Mouse(_)
            | crossterm::event::Event::FocusGained
            | crossterm::event::Event::FocusLost
            | crossterm::event::Event::Paste(_) => None,
        }
    }
}
