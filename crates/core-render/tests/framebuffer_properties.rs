//! Property-based framebuffer checks: plot/read-back agreement and the
//! color-run compression bound.

use core_render::{DEFAULT_COLOR, DEFAULT_GLYPH, FrameBuffer};
use proptest::prelude::*;

proptest! {
    // plot followed by read yields the written cell iff in bounds.
    #[test]
    fn plot_read_back(
        w in 1usize..40,
        h in 1usize..20,
        x in -5i32..45,
        y in -5i32..25,
        color in 0u32..=0xFFFFFF,
    ) {
        let mut fb = FrameBuffer::new(w, h).unwrap();
        fb.plot(x, y, '#', color);
        let in_bounds = x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h;
        match fb.read(x, y) {
            Some(cell) if in_bounds => prop_assert_eq!(cell, ('#', color)),
            None if !in_bounds => {}
            other => prop_assert!(false, "unexpected read-back: {:?}", other),
        }
    }

    // A flush emits one escape per color run, at least one per row, and
    // never more than one per cell.
    #[test]
    fn escape_count_matches_color_runs(
        w in 1usize..30,
        h in 1usize..10,
        cells in prop::collection::vec((0u32..4, any::<bool>()), 0..300),
    ) {
        let palette = [0xFF0000u32, 0x00FF00, 0x0000FF, 0xFFFFFF];
        let mut fb = FrameBuffer::new(w, h).unwrap();
        for (i, (color_index, plot_glyph)) in cells.iter().enumerate() {
            let x = (i % w) as i32;
            let y = ((i / w) % h) as i32;
            let glyph = if *plot_glyph { '*' } else { '.' };
            fb.plot(x, y, glyph, palette[*color_index as usize]);
        }

        // Count runs straight off the cell grid.
        let mut expected = 0usize;
        for y in 0..h as i32 {
            let mut last = None;
            for x in 0..w as i32 {
                let (_, color) = fb.read(x, y).unwrap();
                if last != Some(color) {
                    expected += 1;
                    last = Some(color);
                }
            }
        }

        let mut out = Vec::new();
        let stats = fb.flush(&mut out).unwrap();
        prop_assert_eq!(stats.color_escapes, expected);
        prop_assert!(stats.color_escapes >= h);
        prop_assert!(stats.color_escapes <= w * h);

        // Byte-level agreement: escapes in the stream match the count.
        let text = String::from_utf8(out).unwrap();
        prop_assert_eq!(text.matches("\x1b[38;2;").count(), stats.color_escapes);
    }

    // Dimensions are immutable and clear restores the default cell.
    #[test]
    fn clear_restores_defaults(w in 1usize..20, h in 1usize..20) {
        let mut fb = FrameBuffer::new(w, h).unwrap();
        fb.text(0, 0, "xyz", 0x777777);
        fb.clear();
        prop_assert_eq!(fb.width(), w);
        prop_assert_eq!(fb.height(), h);
        prop_assert_eq!(fb.read(0, 0), Some((DEFAULT_GLYPH, DEFAULT_COLOR)));
    }
}
