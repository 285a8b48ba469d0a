//! Fixed-size glyph + packed-color grid with a row-coalesced flush.
//!
//! Flush contracts:
//! * rows are emitted top-to-bottom, the cursor is homed first;
//! * a truecolor escape appears only when the color changes from the
//!   previous cell within the row; the first cell of each row always
//!   emits one (the terminal's current color is unknown across rows);
//! * each row is assembled in one retained scratch buffer and handed to
//!   the writer in a single call.
//!
//! Out-of-bounds plots are silent no-ops: the physics loop clamps
//! positions, but overlays and text may legitimately hang off an edge.

use core_error::{EngineError, Result};
use std::fmt::Write as _;
use std::io::Write;
use std::time::Instant;

pub const DEFAULT_GLYPH: char = ' ';
pub const DEFAULT_COLOR: u32 = 0x202020;

/// Longest truecolor escape: `ESC [ 38 ; 2 ; 255 ; 255 ; 255 m`.
const MAX_COLOR_ESCAPE: usize = 19;

/// Per-flush telemetry: how well the color-run compression is doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub rows: usize,
    pub color_escapes: usize,
    pub bytes_written: usize,
}

#[derive(Debug)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    glyphs: Vec<char>,
    colors: Vec<u32>,
    row_scratch: String,
}

impl FrameBuffer {
    /// Dimensions are fixed for the lifetime of the buffer.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::invalid_parameter(
                "framebuffer dimensions must be positive",
            ));
        }
        let cells = width
            .checked_mul(height)
            .ok_or_else(|| EngineError::invalid_parameter("framebuffer dimensions overflow"))?;
        Ok(Self {
            width,
            height,
            glyphs: vec![DEFAULT_GLYPH; cells],
            colors: vec![DEFAULT_COLOR; cells],
            // Worst case: every cell changes color, plus the newline.
            row_scratch: String::with_capacity(width * (MAX_COLOR_ESCAPE + 4) + 1),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.glyphs.fill(DEFAULT_GLYPH);
        self.colors.fill(DEFAULT_COLOR);
    }

    /// Write one cell. Coordinates outside the grid are ignored.
    pub fn plot(&mut self, x: i32, y: i32, glyph: char, color: u32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let index = y as usize * self.width + x as usize;
        self.glyphs[index] = glyph;
        self.colors[index] = color;
    }

    /// Plot a string left-to-right from `(x, y)`, clipping at both edges.
    pub fn text(&mut self, x: i32, y: i32, text: &str, color: u32) {
        for (i, glyph) in text.chars().enumerate() {
            self.plot(x + i as i32, y, glyph, color);
        }
    }

    /// Read a cell back; `None` out of bounds.
    pub fn read(&self, x: i32, y: i32) -> Option<(char, u32)> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        let index = y as usize * self.width + x as usize;
        Some((self.glyphs[index], self.colors[index]))
    }

    /// Emit the grid to `out`. See the module docs for the byte contract.
    pub fn flush<W: Write>(&mut self, out: &mut W) -> Result<FlushStats> {
        let started = Instant::now();
        let mut stats = FlushStats {
            rows: self.height,
            ..FlushStats::default()
        };

        out.write_all(b"\x1b[H")
            .map_err(|e| EngineError::from_io("framebuffer home", &e))?;
        stats.bytes_written += 3;

        for y in 0..self.height {
            self.row_scratch.clear();
            let mut last_color = None;
            for x in 0..self.width {
                let index = y * self.width + x;
                let color = self.colors[index];
                if last_color != Some(color) {
                    let (r, g, b) = crate::color::unpack(color);
                    // Infallible: writing into a String.
                    let _ = write!(self.row_scratch, "\x1b[38;2;{r};{g};{b}m");
                    stats.color_escapes += 1;
                    last_color = Some(color);
                }
                self.row_scratch.push(self.glyphs[index]);
            }
            self.row_scratch.push('\n');
            out.write_all(self.row_scratch.as_bytes())
                .map_err(|e| EngineError::from_io("framebuffer row write", &e))?;
            stats.bytes_written += self.row_scratch.len();
        }

        crate::timing::record_last_flush_ns(started.elapsed().as_nanos() as u64);
        tracing::trace!(
            target: "render.flush",
            rows = stats.rows,
            escapes = stats.color_escapes,
            bytes = stats.bytes_written,
            "flush"
        );
        Ok(stats)
    }
}
