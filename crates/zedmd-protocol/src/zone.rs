use twox_hash::XxHash64;
use std::hash::Hasher;

use crate::{
    command::Command,
    frame::{Frame, StreamId},
};

/// Splits a whole-image buffer into a fixed grid of zones, hashes each zone,
/// and emits only the zones whose hash changed since the last frame.
///
/// One instance is owned by each transport worker; the hash table (one
/// `u64` per zone, up to 128 zones) is never touched outside that worker's
/// thread, so no locking is needed here.
pub struct ZoneDiffer {
    width: u16,
    height: u16,
    zone_width: u8,
    zone_height: u8,
    hashes: Vec<u64>,
    stream_id: StreamId,
}

impl ZoneDiffer {
    #[must_use]
    pub fn new(width: u16, height: u16, zone_width: u8, zone_height: u8) -> Self {
        let zones_x = width as usize / zone_width.max(1) as usize;
        let zones_y = height as usize / zone_height.max(1) as usize;
        Self {
            width,
            height,
            zone_width,
            zone_height,
            hashes: vec![0u64; zones_x * zones_y],
            stream_id: StreamId::NONE,
        }
    }

    /// Zeroes every zone hash so that the next call to [`Self::diff`] emits
    /// every zone unconditionally. Required before a delayed (complete)
    /// generation, per the queue overflow recovery path.
    pub fn clear(&mut self) {
        self.hashes.iter_mut().for_each(|h| *h = 0);
    }

    /// Partitions `pixels` (row-major, `bytes_per_pixel` bytes per pixel, no
    /// stride padding) into zones, hashes each, and packs the changed ones
    /// into one or more frames no larger than `bytes_limit`. Returns an
    /// empty vec if nothing changed.
    pub fn diff(
        &mut self,
        pixels: &[u8],
        bytes_per_pixel: usize,
        command: Command,
        bytes_limit: usize,
    ) -> Vec<Frame> {
        self.stream_id = self.stream_id.next();

        let zone_bytes = self.zone_width as usize * self.zone_height as usize * bytes_per_pixel;
        let mut zone_buf = vec![0u8; zone_bytes];
        let mut frames = Vec::new();
        let mut current = Vec::with_capacity(bytes_limit.min(1 << 16));
        let mut idx = 0usize;

        let mut y = 0u16;
        while y < self.height {
            let mut x = 0u16;
            while x < self.width {
                for row in 0..self.zone_height {
                    let src_row = (y + u16::from(row)) as usize;
                    let src_off = (src_row * self.width as usize + x as usize) * bytes_per_pixel;
                    let row_bytes = self.zone_width as usize * bytes_per_pixel;
                    let dst_off = row as usize * row_bytes;
                    zone_buf[dst_off..dst_off + row_bytes]
                        .copy_from_slice(&pixels[src_off..src_off + row_bytes]);
                }

                let mut hasher = XxHash64::with_seed(0);
                hasher.write(&zone_buf);
                let hash = hasher.finish();

                if hash != self.hashes[idx] {
                    self.hashes[idx] = hash;

                    current.push(u8::try_from(idx).unwrap_or(u8::MAX));
                    current.extend_from_slice(&zone_buf);

                    if current.len() >= bytes_limit {
                        frames.push(Frame::streamed(command, std::mem::take(&mut current), self.stream_id));
                        current = Vec::with_capacity(bytes_limit.min(1 << 16));
                    }
                }

                idx += 1;
                x += u16::from(self.zone_width);
            }
            y += u16::from(self.zone_height);
        }

        if !current.is_empty() {
            frames.push(Frame::streamed(command, current, self.stream_id));
        }

        frames
    }

    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }
}

/// Byte budget for one USB zone-streaming frame (spec §4.7.3 step 3): the
/// device's configured USB package size, rounded up to the nearest multiple
/// of one zone-plus-index-byte unit, or — absent an explicit package size —
/// one display row's worth of zone data plus slack.
#[must_use]
pub fn usb_zone_bytes_limit(zone_width: u8, zone_height: u8, width: u16, configured: Option<u16>) -> usize {
    let unit = zone_width as usize * zone_height as usize * 3 + 1;
    match configured {
        Some(limit) if limit > 0 => {
            let mut bytes_limit = 0usize;
            while bytes_limit < limit as usize {
                bytes_limit += unit;
            }
            bytes_limit
        }
        _ => width as usize * zone_height as usize * 3 + 16,
    }
}

/// Byte budget for one UDP zone-streaming datagram (spec §4.7.3 step 3):
/// the largest multiple of one zone-plus-index-byte unit that still fits
/// inside the MTU budget, so the datagram after DEFLATE and the 4-byte
/// header never exceeds it.
#[must_use]
pub fn udp_zone_bytes_limit(zone_width: u8, zone_height: u8, mtu_budget: usize) -> usize {
    let unit = zone_width as usize * zone_height as usize * 3 + 1;
    (mtu_budget / unit).max(1) * unit
}

#[cfg(test)]
mod budget_tests {
    use super::*;

    #[test]
    fn usb_limit_defaults_to_one_row_plus_slack() {
        assert_eq!(usb_zone_bytes_limit(8, 4, 128, None), 128 * 4 * 3 + 16);
    }

    #[test]
    fn usb_limit_rounds_configured_value_up_to_zone_unit() {
        let unit = 8 * 4 * 3 + 1;
        let limit = usb_zone_bytes_limit(8, 4, 128, Some(100));
        assert_eq!(limit % unit, 0);
        assert!(limit >= 100);
    }

    #[test]
    fn udp_limit_fits_within_mtu_budget() {
        let unit = 8 * 4 * 3 + 1;
        let limit = udp_zone_bytes_limit(8, 4, 1460);
        assert!(limit <= 1460);
        assert_eq!(limit % unit, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u16, height: u16, value: u8) -> Vec<u8> {
        vec![value; width as usize * height as usize * 3]
    }

    #[test]
    fn first_frame_emits_every_zone() {
        let mut differ = ZoneDiffer::new(16, 8, 8, 4);
        let frame = solid(16, 8, 0x11);
        let frames = differ.diff(&frame, 3, Command::Rgb24ZonesStream, 4096);
        assert_eq!(frames.len(), 1);
        // 4 zones (2x2 grid), each tagged with a 1-byte index + 8*4*3 bytes
        assert_eq!(frames[0].payload.len(), 4 * (1 + 8 * 4 * 3));
    }

    #[test]
    fn unchanged_frame_emits_nothing() {
        let mut differ = ZoneDiffer::new(16, 8, 8, 4);
        let frame = solid(16, 8, 0x22);
        differ.diff(&frame, 3, Command::Rgb24ZonesStream, 4096);
        let frames = differ.diff(&frame, 3, Command::Rgb24ZonesStream, 4096);
        assert!(frames.is_empty());
    }

    #[test]
    fn partial_change_emits_only_changed_zones() {
        let mut differ = ZoneDiffer::new(16, 8, 8, 4);
        let mut frame = solid(16, 8, 0x33);
        differ.diff(&frame, 3, Command::Rgb24ZonesStream, 4096);

        // perturb a single pixel in the top-left zone only.
        frame[0] = 0xff;
        let frames = differ.diff(&frame, 3, Command::Rgb24ZonesStream, 4096);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.len(), 1 + 8 * 4 * 3);
        assert_eq!(frames[0].payload[0], 0);
    }

    #[test]
    fn clear_forces_full_resend() {
        let mut differ = ZoneDiffer::new(16, 8, 8, 4);
        let frame = solid(16, 8, 0x44);
        differ.diff(&frame, 3, Command::Rgb24ZonesStream, 4096);
        differ.clear();
        let frames = differ.diff(&frame, 3, Command::Rgb24ZonesStream, 4096);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.len(), 4 * (1 + 8 * 4 * 3));
    }

    #[test]
    fn stream_id_wraps_after_64() {
        let mut differ = ZoneDiffer::new(16, 8, 8, 4);
        let frame = solid(16, 8, 0x55);
        for _ in 0..66 {
            differ.diff(&frame, 3, Command::Rgb24ZonesStream, 4096);
            differ.clear();
        }
        assert_eq!(differ.stream_id().get(), 0);
    }
}
