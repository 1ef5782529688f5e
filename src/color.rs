use crossterm::style::Color;
use supports_color::Stream;

/// Detect the level of color support
pub fn color_level() -> ColorLevel {
    match supports_color::on(Stream::Stdout) {
        Some(level) => match level.has_16m {
            true => ColorLevel::TrueColor,
            false => match level.has_256 {
                true => ColorLevel::Color256,
                false => ColorLevel::Color16,
            },
        },
        None => ColorLevel::None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorLevel {
    /// No color support
    None,
    /// 16 basic colors
    Color16,
    /// 256 ANSI colors
    Color256,
    /// True color (24-bit RGB)
    TrueColor,
}

/// The 16 named colors with their usual xterm RGB values.
const BASIC: [(Color, (u8, u8, u8)); 16] = [
    (Color::Black, (0, 0, 0)),
    (Color::DarkRed, (128, 0, 0)),
    (Color::DarkGreen, (0, 128, 0)),
    (Color::DarkYellow, (128, 128, 0)),
    (Color::DarkBlue, (0, 0, 128)),
    (Color::DarkMagenta, (128, 0, 128)),
    (Color::DarkCyan, (0, 128, 128)),
    (Color::Grey, (192, 192, 192)),
    (Color::DarkGrey, (128, 128, 128)),
    (Color::Red, (255, 0, 0)),
    (Color::Green, (0, 255, 0)),
    (Color::Yellow, (255, 255, 0)),
    (Color::Blue, (0, 0, 255)),
    (Color::Magenta, (255, 0, 255)),
    (Color::Cyan, (0, 255, 255)),
    (Color::White, (255, 255, 255)),
];

impl ColorLevel {
    /// Reduce `color` to something this level can display.
    pub fn adapt(self, color: Color) -> Color {
        match (self, color) {
            (ColorLevel::None, _) => Color::Reset,
            (ColorLevel::TrueColor, color) => color,
            (ColorLevel::Color256, Color::Rgb { r, g, b }) => Color::AnsiValue(cube_index(r, g, b)),
            (ColorLevel::Color256, color) => color,
            (ColorLevel::Color16, Color::Rgb { r, g, b }) => nearest_basic(r, g, b),
            (ColorLevel::Color16, Color::AnsiValue(value)) => {
                let (r, g, b) = ansi_to_rgb(value);
                nearest_basic(r, g, b)
            }
            (ColorLevel::Color16, color) => color,
        }
    }
}

fn cube_level(channel: u8) -> u8 {
    // xterm cube steps: 0, 95, 135, 175, 215, 255
    if channel < 48 {
        0
    } else if channel < 115 {
        1
    } else {
        (channel - 35) / 40
    }
}

fn cube_index(r: u8, g: u8, b: u8) -> u8 {
    16 + 36 * cube_level(r) + 6 * cube_level(g) + cube_level(b)
}

fn ansi_to_rgb(value: u8) -> (u8, u8, u8) {
    match value {
        0..=15 => BASIC[value as usize].1,
        16..=231 => {
            let step = |n: u8| if n == 0 { 0 } else { 55 + n * 40 };
            let idx = value - 16;
            (step(idx / 36), step((idx / 6) % 6), step(idx % 6))
        }
        _ => {
            let grey = 8 + (value - 232) * 10;
            (grey, grey, grey)
        }
    }
}

fn nearest_basic(r: u8, g: u8, b: u8) -> Color {
    let distance = |(cr, cg, cb): (u8, u8, u8)| {
        let dr = r as i32 - cr as i32;
        let dg = g as i32 - cg as i32;
        let db = b as i32 - cb as i32;
        dr * dr + dg * dg + db * db
    };
    BASIC
        .iter()
        .min_by_key(|(_, rgb)| distance(*rgb))
        .map(|(color, _)| *color)
        .unwrap_or(Color::Reset)
}
