/// Rearranges a buffer of `width * height` palette-indexed pixels into
/// `bitlen` bit planes, one plane per bit of the pixel value, MSB-first
/// within each 8-pixel run.
///
/// Each output plane is `width * height / 8` bytes; the planes are
/// concatenated in `pPlanes[i * plane_size + pos]` order, matching what the
/// device firmware expects to unpack.
#[must_use]
pub fn split(frame: &[u8], width: u16, height: u16, bitlen: u8) -> Vec<u8> {
    let width = width as usize;
    let height = height as usize;
    let plane_size = width * height / 8;
    let bitlen = bitlen as usize;
    let mut planes = vec![0u8; plane_size * bitlen];
    let mut bd = vec![0u8; bitlen];
    let mut pos = 0usize;

    for y in 0..height {
        let mut x = 0usize;
        while x < width {
            bd.iter_mut().for_each(|b| *b = 0);

            for v in (0..8).rev() {
                let pixel = frame[y * width + x + v];
                for (i, b) in bd.iter_mut().enumerate() {
                    *b <<= 1;
                    if pixel & (1 << i) != 0 {
                        *b |= 1;
                    }
                }
            }

            for (i, &b) in bd.iter().enumerate() {
                planes[i * plane_size + pos] = b;
            }

            pos += 1;
            x += 8;
        }
    }

    planes
}

/// Inverse of [`split`]: reconstructs indexed pixels from `bitlen` bit
/// planes. Exists for test round-trip coverage; the device side does this
/// unpacking, not this library.
#[must_use]
#[cfg(test)]
pub fn join(planes: &[u8], width: u16, height: u16, bitlen: u8) -> Vec<u8> {
    let width = width as usize;
    let height = height as usize;
    let plane_size = width * height / 8;
    let bitlen = bitlen as usize;
    let mut frame = vec![0u8; width * height];
    let mut pos = 0usize;

    for y in 0..height {
        let mut x = 0usize;
        while x < width {
            let bytes: Vec<u8> = (0..bitlen).map(|i| planes[i * plane_size + pos]).collect();
            for v in 0..8 {
                let bit_index = 7 - v;
                let mut pixel = 0u8;
                for (i, &b) in bytes.iter().enumerate() {
                    if (b >> bit_index) & 1 != 0 {
                        pixel |= 1 << i;
                    }
                }
                frame[y * width + x + v] = pixel;
            }
            pos += 1;
            x += 8;
        }
    }

    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_indexed_frame() {
        let width = 16u16;
        let height = 8u16;
        let bitlen = 4u8;
        let frame: Vec<u8> =
            (0..(width as usize * height as usize)).map(|i| (i % 16) as u8).collect();

        let planes = split(&frame, width, height, bitlen);
        assert_eq!(planes.len(), width as usize * height as usize / 8 * bitlen as usize);

        let back = join(&planes, width, height, bitlen);
        assert_eq!(back, frame);
    }

    #[test]
    fn single_plane_is_msb_packed() {
        // one 8-pixel run, values chosen so bit 0 alternates 1,0,1,0,1,0,1,0
        let frame: Vec<u8> = vec![1, 0, 1, 0, 1, 0, 1, 0];
        let planes = split(&frame, 8, 1, 1);
        assert_eq!(planes.len(), 1);
        // v iterates 7..=0, so pixel at index 7 becomes the MSB of the byte
        assert_eq!(planes[0], 0b0101_0101);
    }
}
