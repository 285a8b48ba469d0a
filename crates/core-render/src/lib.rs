//! Double-buffered color framebuffer and its terminal flush path.
//!
//! The physics loop plots into a fixed glyph + packed-RGB grid; `flush`
//! emits the grid as ANSI bytes. Only three sequence kinds ever leave this
//! crate: cursor-home, truecolor set, and printable glyphs/newlines.

pub mod color;
pub mod framebuffer;
pub mod timing;

pub use framebuffer::{DEFAULT_COLOR, DEFAULT_GLYPH, FlushStats, FrameBuffer};
