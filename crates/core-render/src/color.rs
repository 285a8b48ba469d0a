//! Packed-RGB helpers and the velocity/energy color ramps used by the
//! plot pass.

/// Pack 8-bit channels into `0xRRGGBB`.
pub const fn pack(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

pub const fn unpack(color: u32) -> (u8, u8, u8) {
    (
        ((color >> 16) & 0xFF) as u8,
        ((color >> 8) & 0xFF) as u8,
        (color & 0xFF) as u8,
    )
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Speed ramp: dark blue through cyan to white, saturating at 50 world
/// units per second. Smoothstepped so slow particles stay dim.
pub fn speed_color(speed: f32) -> u32 {
    let t = (speed.min(50.0) / 50.0).max(0.0);
    let t = t * t * (3.0 - 2.0 * t);
    if t < 0.5 {
        let k = t * 2.0;
        pack(0, lerp(64.0, 200.0, k) as u8, lerp(160.0, 255.0, k) as u8)
    } else {
        let k = (t - 0.5) * 2.0;
        pack(
            lerp(0.0, 255.0, k) as u8,
            lerp(200.0, 255.0, k) as u8,
            255,
        )
    }
}

/// Energy ramp (speed squared): black-body style red to orange to near
/// white, saturating at 400.
pub fn energy_color(energy: f32) -> u32 {
    let t = (energy / 400.0).clamp(0.0, 1.0);
    if t < 0.33 {
        pack((255.0 * t * 3.0) as u8, 0, 0)
    } else if t < 0.66 {
        let k = (t - 0.33) * 3.0;
        pack(255, (165.0 * k) as u8, 0)
    } else {
        let k = (t - 0.66) * 3.0;
        pack(255, (165.0 + 90.0 * k) as u8, (255.0 * k) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trip() {
        let color = pack(0x12, 0x34, 0x56);
        assert_eq!(color, 0x123456);
        assert_eq!(unpack(color), (0x12, 0x34, 0x56));
    }

    #[test]
    fn speed_ramp_ends_are_dim_blue_and_white() {
        assert_eq!(speed_color(0.0), pack(0, 64, 160));
        assert_eq!(speed_color(50.0), pack(255, 255, 255));
        // Saturation: above the cap nothing changes.
        assert_eq!(speed_color(500.0), speed_color(50.0));
    }

    #[test]
    fn speed_ramp_is_monotonic_in_brightness() {
        let brightness = |c: u32| {
            let (r, g, b) = unpack(c);
            r as u32 + g as u32 + b as u32
        };
        let mut last = brightness(speed_color(0.0));
        for i in 1..=50 {
            let cur = brightness(speed_color(i as f32));
            assert!(cur >= last, "ramp dipped at speed {i}");
            last = cur;
        }
    }

    #[test]
    fn energy_ramp_spans_red_to_white() {
        let (r, g, b) = unpack(energy_color(40.0));
        assert!(r > 0 && g == 0 && b == 0);
        let (r, g, b) = unpack(energy_color(400.0));
        assert!(r == 255 && g > 200 && b > 200);
    }
}
