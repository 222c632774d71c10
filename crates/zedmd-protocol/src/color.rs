/// Expands a 5/6/5-bit RGB565 pixel into an 8/8/8 RGB888 triple using the
/// standard bit-replication rule (fills the low bits with the high bits of
/// the same channel, so `0x1f` maps to `0xff` rather than `0xf8`).
#[must_use]
pub fn rgb565_to_rgb888(pixels: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len() * 3);
    for &px in pixels {
        let r5 = (px >> 11) & 0x1f;
        let g6 = (px >> 5) & 0x3f;
        let b5 = px & 0x1f;

        let r8 = ((r5 << 3) | (r5 >> 2)) as u8;
        let g8 = ((g6 << 2) | (g6 >> 4)) as u8;
        let b8 = ((b5 << 3) | (b5 >> 2)) as u8;

        out.push(r8);
        out.push(g8);
        out.push(b8);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_round_trips_to_full_intensity() {
        let out = rgb565_to_rgb888(&[0xffff]);
        assert_eq!(out, vec![0xff, 0xff, 0xff]);
    }

    #[test]
    fn black_stays_black() {
        let out = rgb565_to_rgb888(&[0x0000]);
        assert_eq!(out, vec![0, 0, 0]);
    }

    #[test]
    fn pure_red_channel_only() {
        // top 5 bits set, rest zero.
        let out = rgb565_to_rgb888(&[0b1111_1000_0000_0000]);
        assert_eq!(out, vec![0xff, 0, 0]);
    }
}
