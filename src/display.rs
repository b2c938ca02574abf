use std::fmt;
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const DISPLAY_PIXELS: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT;

/// The machine's view of the screen: one byte per pixel, each 0 or 1.
///
/// Only the interpreter writes pixels. Renderers read them through
/// [`FrameBuffer::pixels`] and use [`FrameBuffer::take_redraw`] to find out
/// whether anything changed since they last looked.
pub struct FrameBuffer {
    pixels: Box<[u8]>,
    redraw: bool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer {
            pixels: vec![0u8; DISPLAY_PIXELS].into_boxed_slice(),
            redraw: false,
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
        self.redraw = true;
    }

    /// XOR an 8-pixel-wide sprite onto the screen with its top left corner at
    /// (x, y), one sprite byte per row, most significant bit leftmost.
    /// Returns true if any pixel that was on got switched off.
    ///
    /// Pixels are addressed as a flat index modulo the buffer size, so a
    /// sprite that runs off the right edge carries on at the left of the
    /// next row down, and one that runs off the bottom wraps to the top.
    pub fn draw_sprite(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let mut collision = false;
        for (row, byte) in sprite.iter().enumerate() {
            for col in 0..8 {
                if byte & (0x80 >> col) == 0 {
                    continue;
                }
                let idx = ((x as usize + col) + (y as usize + row) * DISPLAY_WIDTH) % DISPLAY_PIXELS;
                if self.pixels[idx] == 1 {
                    collision = true;
                }
                self.pixels[idx] ^= 1;
            }
        }
        self.redraw = true;
        collision
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// panics if (x, y) is off screen
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        assert!(x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT, "pixel ({}, {}) off screen", x, y);
        self.pixels[x + y * DISPLAY_WIDTH]
    }

    pub fn needs_redraw(&self) -> bool {
        self.redraw
    }

    /// returns the redraw flag and clears it
    pub fn take_redraw(&mut self) -> bool {
        std::mem::replace(&mut self.redraw, false)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// one line per row, one digit per pixel
impl fmt::Display for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.pixels.chunks(DISPLAY_WIDTH) {
            for px in row {
                write!(f, "{:X}", px)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Display is used to put the frame buffer on a screen. It should abstract
/// the implementation details, so a variety of kinds of screen would work.
pub trait Display {
    /// draw one byte per pixel, row major
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error>;
}

// store useful metadata about the screen
struct Resolution(usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// coords of every pixel that is `value`, y flipped so row 0 is at the top
    fn bitplane_from_data<'a>(
        &self,
        data: &'a [u8],
        value: u8,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let w = self.0;
        data.iter()
            .enumerate()
            .filter(move |&(_, &px)| px == value)
            .map(move |(count, _)| {
                (
                    (count % w) as f64,        // x
                    -1.0 * (count / w) as f64, // y
                )
            })
    }
}

/// monochrome display in a terminal, rendered using TUI and Crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(DISPLAY_WIDTH, DISPLAY_HEIGHT),
        })
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error> {
        // make sure we're given exactly the right amount of data to draw
        assert_eq!(
            data.len(),
            self.resolution.pixel_count(),
            "MonoTermDisplay must have correct-sized data to draw"
        );

        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        let resolution = &self.resolution;
        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, 2 + resolution.0 as u16, 2 + resolution.1 as u16);

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &resolution.bitplane_from_data(data, 0).collect::<Vec<_>>(),
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &resolution.bitplane_from_data(data, 1).collect::<Vec<_>>(),
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines; remembers the last frame
#[derive(Default)]
pub struct DummyDisplay {
    pub frames_drawn: usize,
    pub last_frame: Vec<u8>,
}

impl DummyDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error> {
        self.frames_drawn += 1;
        self.last_frame.clear();
        self.last_frame.extend_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Resolution tests
    #[test]
    fn test_pixel_count() {
        let r = Resolution(64, 32);
        assert_eq!(r.pixel_count(), 2048)
    }

    #[test]
    fn test_x_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
    }

    #[test]
    fn test_y_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_bitplane_coords() {
        let r = Resolution(64, 32);
        let mut data = [0u8; 2048];
        data[0] = 1;
        data[65] = 1;
        let on: Vec<_> = r.bitplane_from_data(&data, 1).collect();
        assert_eq!(on, vec![(0.0, 0.0), (1.0, -1.0)]);
        assert_eq!(r.bitplane_from_data(&data, 0).count(), 2046);
    }

    // FrameBuffer tests
    #[test]
    fn test_new_frame_is_blank() {
        let fb = FrameBuffer::new();
        assert_eq!(fb.pixels().len(), DISPLAY_PIXELS);
        assert!(fb.pixels().iter().all(|&p| p == 0));
        assert!(!fb.needs_redraw());
    }

    #[test]
    fn test_draw_sprite_plots_bits() {
        let mut fb = FrameBuffer::new();
        let collision = fb.draw_sprite(2, 1, &[0b1010_0000]);
        assert!(!collision);
        assert_eq!(fb.pixel(2, 1), 1);
        assert_eq!(fb.pixel(3, 1), 0);
        assert_eq!(fb.pixel(4, 1), 1);
        assert_eq!(fb.pixels().iter().filter(|&&p| p == 1).count(), 2);
    }

    #[test]
    fn test_draw_twice_erases_and_collides() {
        let mut fb = FrameBuffer::new();
        let glyph = [0xF0, 0x90, 0xF0, 0x90, 0xF0];
        assert!(!fb.draw_sprite(10, 10, &glyph));
        assert!(fb.draw_sprite(10, 10, &glyph));
        assert!(fb.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_draw_wraps_into_next_row() {
        let mut fb = FrameBuffer::new();
        fb.draw_sprite(62, 0, &[0xff]);
        assert_eq!(fb.pixel(62, 0), 1);
        assert_eq!(fb.pixel(63, 0), 1);
        // carries on from the left edge one row down, not the same row
        assert_eq!(fb.pixel(0, 0), 0);
        assert_eq!(fb.pixel(0, 1), 1);
        assert_eq!(fb.pixel(5, 1), 1);
        assert_eq!(fb.pixel(6, 1), 0);
    }

    #[test]
    fn test_draw_wraps_past_bottom_to_top() {
        let mut fb = FrameBuffer::new();
        fb.draw_sprite(0, 31, &[0x80, 0x80]);
        assert_eq!(fb.pixel(0, 31), 1);
        assert_eq!(fb.pixel(0, 0), 1);
    }

    #[test]
    fn test_take_redraw_clears_flag() {
        let mut fb = FrameBuffer::new();
        fb.draw_sprite(0, 0, &[]);
        assert!(fb.needs_redraw());
        assert!(fb.take_redraw());
        assert!(!fb.take_redraw());
    }

    #[test]
    fn test_clear() {
        let mut fb = FrameBuffer::new();
        fb.draw_sprite(0, 0, &[0xff; 4]);
        fb.take_redraw();
        fb.clear();
        assert!(fb.pixels().iter().all(|&p| p == 0));
        assert!(fb.needs_redraw());
    }

    #[test]
    fn test_dump_format() {
        let mut fb = FrameBuffer::new();
        fb.draw_sprite(0, 0, &[0xc0]);
        let dump = fb.to_string();
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines.len(), 32);
        assert!(lines.iter().all(|l| l.len() == 64));
        assert!(lines[0].starts_with("110"));
    }

    #[test]
    fn test_dummy_display_keeps_last_frame() -> Result<(), io::Error> {
        let mut d = DummyDisplay::new();
        let fb = FrameBuffer::new();
        d.draw(fb.pixels())?;
        d.draw(fb.pixels())?;
        assert_eq!(d.frames_drawn, 2);
        assert_eq!(d.last_frame.len(), DISPLAY_PIXELS);
        Ok(())
    }
}
