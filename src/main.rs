use std::{
    fs::OpenOptions,
    io::{Stdout, stdout},
    path::PathBuf,
    thread,
};

use anyhow::Result;
use crossbeam::channel::{self, Sender};
use crossterm::{
    ExecutableCommand,
    cursor::{Hide, Show},
    event::{KeyCode, KeyEventKind},
    style::Color,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use celltree::{
    ControlId, ControlState, ControlTree, Point, Size,
    color::{self, ColorLevel},
    event::DriverEvent,
    tui::{
        block::Block,
        label::{Alignment, Label},
    },
};

fn main() -> Result<()> {
    let mut args = std::env::args();
    let _program_name = args.next();
    let log_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("celltree.log"));

    // Terminal belongs to the UI, so logs go to a file
    let log_file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(&log_path)?;
    let (log_writer, _log_guard) = tracing_appender::non_blocking(log_file);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_writer(log_writer)
        .with_ansi(false)
        .init();

    info!("celltree starting, logging to {}", log_path.display());

    terminal::enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?.execute(Hide)?;

    let result = run();

    // Always restore terminal state, even if run() fails
    stdout().execute(Show)?.execute(LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;

    if let Err(err) = &result {
        warn!("run failed: {err:#}");
    }
    info!("celltree shutting down");
    result
}

fn run() -> Result<()> {
    let level = color::color_level();
    info!("color level {:?}", level);

    let (events, inbox) = channel::unbounded();

    let input = events.clone();
    thread::spawn(move || {
        loop {
            match crossterm::event::read() {
                Ok(event) => {
                    if let Some(event) = DriverEvent::from_terminal(event) {
                        if input.send(event).is_err() {
                            break;
                        }
                    }
                }
                Err(err) => {
                    warn!("failed to read terminal event: {err}");
                    break;
                }
            }
        }
    });

    let (width, height) = terminal::size()?;
    let mut screen = Screen::build(Size::new(width, height), events)?;
    let mut out = stdout();

    let mut dirty = true;
    loop {
        // Several invalidations may be queued for one change; draw once they are drained
        if dirty && inbox.is_empty() {
            screen.draw(&mut out, level)?;
            dirty = false;
        }

        match inbox.recv()? {
            DriverEvent::Redraw => dirty = true,
            DriverEvent::Resize(width, height) => screen.resize(Size::new(width, height))?,
            DriverEvent::Key(key) if key.kind == KeyEventKind::Press => {
                if key.code == KeyCode::Esc {
                    break;
                }
                screen.key(key.code)?;
            }
            DriverEvent::Key(_) => {}
        }
    }
    Ok(())
}

/// The demo screen: a shadowed panel with a title and a key counter, and a
/// status line along the bottom.
struct Screen {
    tree: ControlTree,
    root: ControlId,
    shadow: ControlId,
    panel: ControlId,
    title: ControlId,
    counter: ControlId,
    status: ControlId,
    presses: u32,
}

fn panel_size(screen: Size) -> Size {
    Size::new(screen.width.saturating_sub(6), screen.height.saturating_sub(4))
}

impl Screen {
    fn build(size: Size, redraw: Sender<DriverEvent>) -> Result<Self> {
        let mut tree = ControlTree::new();
        let panel_size = panel_size(size);

        let root = tree.create_container(
            ControlState::new(size).with_colors(Color::DarkBlue, Color::White),
        );
        let shadow = tree.create_control(
            Block::new(' '),
            ControlState::new(panel_size)
                .at(Point::new(4, 2))
                .with_colors(Color::Black, Color::Black),
        );
        let panel = tree.create_container(
            ControlState::new(panel_size)
                .at(Point::new(2, 1))
                .with_colors(Color::Grey, Color::Black),
        );
        let title = tree.create_control(
            Label::new("celltree").aligned(Alignment::Center),
            ControlState::new(Size::new(panel_size.width, 1))
                .with_colors(Color::DarkCyan, Color::White),
        );
        let counter = tree.create_control(
            Label::new("keys pressed: 0"),
            ControlState::new(Size::new(24, 1))
                .at(Point::new(2, 2))
                .with_colors(Color::Grey, Color::Black),
        );
        let status = tree.create_control(
            Label::new(" esc quit | h toggle panel | any other key counts"),
            ControlState::new(Size::new(size.width, 1))
                .at(Point::new(0, size.height as i32 - 1))
                .with_colors(Color::Black, Color::Yellow),
        );

        tree.add(root, shadow)?;
        tree.add(root, panel)?;
        tree.add(panel, title)?;
        tree.add(panel, counter)?;
        tree.add(root, status)?;

        tree.subscribe(root, move || {
            if redraw.send(DriverEvent::Redraw).is_err() {
                warn!("redraw requested after the driver stopped");
            }
        })?;

        Ok(Self {
            tree,
            root,
            shadow,
            panel,
            title,
            counter,
            status,
            presses: 0,
        })
    }

    fn draw(&self, out: &mut Stdout, level: ColorLevel) -> Result<()> {
        let buffer = self.tree.render_to_buffer(self.root)?;
        debug!("draw frame {}x{}", buffer.width(), buffer.height());
        buffer.flush(out, (0, 0), level)?;
        Ok(())
    }

    fn resize(&mut self, size: Size) -> Result<()> {
        let panel_size = panel_size(size);
        self.tree.set_size(self.root, size)?;
        self.tree.set_size(self.shadow, panel_size)?;
        self.tree.set_size(self.panel, panel_size)?;
        self.tree
            .set_size(self.title, Size::new(panel_size.width, 1))?;
        self.tree
            .set_size(self.status, Size::new(size.width, 1))?;
        self.tree
            .set_location(self.status, Point::new(0, size.height as i32 - 1))?;
        Ok(())
    }

    fn key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Char('h') => {
                let visible = !self.tree.state(self.panel)?.visible;
                self.tree.set_visible(self.panel, visible)?;
                self.tree.set_visible(self.shadow, visible)?;
            }
            _ => {
                self.presses += 1;
                let text = format!("keys pressed: {}", self.presses);
                self.tree
                    .update::<Label, _>(self.counter, |label| label.set_text(text))?;
            }
        }
        Ok(())
    }
}
