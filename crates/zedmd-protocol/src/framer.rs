//! Frame preparation (spec §4.7): decides between the whole-image and
//! zone-streaming render paths, applies the scaler, short-circuits on an
//! unchanged frame, and composes the final command payload. Pure and
//! synchronous — the caller (the `zedmd` facade) is responsible for handing
//! the resulting [`Frame`]s to a transport queue.

use crate::{
    bitplane,
    command::Command,
    frame::Frame,
    scale::{self, ScaleMode},
    zone::ZoneDiffer,
};

/// Owns the per-render caches (for whole-image duplicate suppression, P2)
/// and the zone hash table (for differential zone streaming, P3) for one
/// connected device. One instance per open transport.
pub struct Framer {
    device_width: u16,
    device_height: u16,
    logical_width: u16,
    logical_height: u16,
    zone_width: u8,
    zone_height: u8,
    rgb_differ: ZoneDiffer,
    last_gray2: Option<(Vec<u8>, [u8; 12])>,
    last_gray4: Option<(Vec<u8>, [u8; 48])>,
    last_gray6: Option<(Vec<u8>, [u8; 192], [u8; 24])>,
    last_rgb24_whole: Option<Vec<u8>>,
    last_rgb24_stream: Option<Vec<u8>>,
    client_scaling: bool,
}

impl Framer {
    #[must_use]
    pub fn new(device_width: u16, device_height: u16, zone_width: u8, zone_height: u8) -> Self {
        Self {
            device_width,
            device_height,
            logical_width: device_width,
            logical_height: device_height,
            zone_width,
            zone_height,
            rgb_differ: ZoneDiffer::new(device_width, device_height, zone_width, zone_height),
            last_gray2: None,
            last_gray4: None,
            last_gray6: None,
            last_rgb24_whole: None,
            last_rgb24_stream: None,
            client_scaling: true,
        }
    }

    /// Toggles whether [`Self::scale`] runs at all (spec §4.10's
    /// `EnableUpscaling`/`DisableUpscaling`): when the device's own firmware
    /// upscaler is in use instead, the client should send frames through
    /// unscaled rather than duplicate the work.
    pub fn set_client_scaling(&mut self, enabled: bool) {
        self.client_scaling = enabled;
    }

    /// Declares the dimensions of frames the caller will hand in from now
    /// on (spec §4.1.1's `SetFrameSize`); invalidates every cache, since a
    /// resolution change means the next frame of any kind must be sent in
    /// full.
    pub fn set_frame_size(&mut self, width: u16, height: u16) {
        self.logical_width = width;
        self.logical_height = height;
        self.clear();
    }

    /// Resets every duplicate-suppression cache and the zone hash table, so
    /// the next render of any kind is emitted in full. Used on first
    /// connect, on a resolution change, and before staging a delayed
    /// zone-streaming generation (spec §4.7.4).
    pub fn clear(&mut self) {
        self.rgb_differ.clear();
        self.last_gray2 = None;
        self.last_gray4 = None;
        self.last_gray6 = None;
        self.last_rgb24_whole = None;
        self.last_rgb24_stream = None;
    }

    fn scale_mode(&self) -> ScaleMode {
        scale::decide_mode(self.logical_width, self.logical_height, self.device_width, self.device_height)
    }

    fn scale(&self, src: &[u8], bpp: u8) -> Vec<u8> {
        if !self.client_scaling {
            return src.to_vec();
        }
        match self.scale_mode() {
            ScaleMode::NoOp => src.to_vec(),
            ScaleMode::Center => {
                scale::center(src, self.logical_width, self.logical_height, self.device_width, self.device_height, bpp)
            }
            ScaleMode::HalfScale => {
                scale::half_scale(src, self.logical_width, self.logical_height, self.device_width, self.device_height, bpp)
            }
            ScaleMode::Scale2x => scale::scale2x(src, self.logical_width, self.logical_height, bpp),
        }
    }

    /// Whole-image 2-bit indexed render (spec §4.7.1): palette(12) + 2
    /// bit-planes under [`Command::Gray2`]. `None` if the frame and palette
    /// are unchanged since the last call (P2).
    pub fn render_gray2(&mut self, frame: &[u8], palette: &[u8; 12]) -> Option<Frame> {
        if self.last_gray2.as_ref().is_some_and(|(f, p)| f == frame && p == palette) {
            return None;
        }
        self.last_gray2 = Some((frame.to_vec(), *palette));

        let scaled = self.scale(frame, 1);
        let planes = bitplane::split(&scaled, self.device_width, self.device_height, 2);

        let mut payload = Vec::with_capacity(palette.len() + planes.len());
        payload.extend_from_slice(palette);
        payload.extend_from_slice(&planes);
        Some(Frame::new(Command::Gray2, payload))
    }

    /// Whole-image 4-bit colored-gray render: palette(48) + 4 bit-planes
    /// under [`Command::ColGray4`].
    pub fn render_col_gray4(&mut self, frame: &[u8], palette: &[u8; 48]) -> Option<Frame> {
        if self.last_gray4.as_ref().is_some_and(|(f, p)| f == frame && p == palette) {
            return None;
        }
        self.last_gray4 = Some((frame.to_vec(), *palette));

        let scaled = self.scale(frame, 1);
        let planes = bitplane::split(&scaled, self.device_width, self.device_height, 4);

        let mut payload = Vec::with_capacity(palette.len() + planes.len());
        payload.extend_from_slice(palette);
        payload.extend_from_slice(&planes);
        Some(Frame::new(Command::ColGray4, payload))
    }

    /// Whole-image 6-bit colored-gray render: palette(192) + 6 bit-planes +
    /// a 24-byte rotation descriptor, under [`Command::ColGray6`].
    pub fn render_col_gray6(&mut self, frame: &[u8], palette: &[u8; 192], rotations: Option<&[u8; 24]>) -> Option<Frame> {
        let rotations = *rotations.unwrap_or(&[0xffu8; 24]);
        if self.last_gray6.as_ref().is_some_and(|(f, p, r)| f == frame && p == palette && r == &rotations) {
            return None;
        }
        self.last_gray6 = Some((frame.to_vec(), *palette, rotations));

        let scaled = self.scale(frame, 1);
        let planes = bitplane::split(&scaled, self.device_width, self.device_height, 6);

        let mut payload = Vec::with_capacity(palette.len() + planes.len() + rotations.len());
        payload.extend_from_slice(palette);
        payload.extend_from_slice(&planes);
        payload.extend_from_slice(&rotations);
        Some(Frame::new(Command::ColGray6, payload))
    }

    /// Whole-image RGB24 render (spec §4.7.2): no palette, no bit-plane
    /// split, emitted as a single [`Command::Rgb24`] frame. Used by
    /// [`Self::clear`]-sensitive callers that want one full frame rather
    /// than a zone-streamed diff (e.g. the LED self-test sequence).
    pub fn render_rgb24_whole(&mut self, frame: &[u8]) -> Option<Frame> {
        if self.last_rgb24_whole.as_deref() == Some(frame) {
            return None;
        }
        self.last_rgb24_whole = Some(frame.to_vec());

        let scaled = self.scale(frame, 3);
        Some(Frame::new(Command::Rgb24, scaled))
    }

    /// Zone-streamed RGB24 render (spec §4.7.3): the normal path for
    /// `render_rgb888`/`render_rgb565` per §4.11. Short-circuits on a
    /// byte-identical incoming buffer before scaling or touching the zone
    /// hash table at all (the same P2 check §4.7.1 applies to whole-image
    /// renders, folded in here per upstream's `UpdateFrameBuffer888`); once
    /// past that, each zone is diffed against the hash table rather than
    /// compared wholesale.
    pub fn render_rgb24_stream(&mut self, frame: &[u8], bytes_limit: usize) -> Vec<Frame> {
        if self.last_rgb24_stream.as_deref() == Some(frame) {
            return Vec::new();
        }
        self.last_rgb24_stream = Some(frame.to_vec());

        let scaled = self.scale(frame, 3);
        self.rgb_differ.diff(&scaled, 3, Command::Rgb24ZonesStream, bytes_limit)
    }

    #[must_use]
    pub fn zone_width(&self) -> u8 {
        self.zone_width
    }

    #[must_use]
    pub fn zone_height(&self) -> u8 {
        self.zone_height
    }

    #[must_use]
    pub fn device_width(&self) -> u16 {
        self.device_width
    }

    #[must_use]
    pub fn device_height(&self) -> u16 {
        self.device_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_indexed(w: u16, h: u16, value: u8) -> Vec<u8> {
        vec![value; w as usize * h as usize]
    }

    fn solid_rgb(w: u16, h: u16, rgb: [u8; 3]) -> Vec<u8> {
        rgb.iter().copied().cycle().take(w as usize * h as usize * 3).collect()
    }

    #[test]
    fn gray2_duplicate_frame_and_palette_short_circuits() {
        let mut framer = Framer::new(16, 8, 8, 4);
        let frame = solid_indexed(16, 8, 0b01);
        let palette = [0u8; 12];

        assert!(framer.render_gray2(&frame, &palette).is_some());
        assert!(framer.render_gray2(&frame, &palette).is_none());
    }

    #[test]
    fn gray2_palette_change_forces_resend_even_if_frame_unchanged() {
        let mut framer = Framer::new(16, 8, 8, 4);
        let frame = solid_indexed(16, 8, 0b01);

        assert!(framer.render_gray2(&frame, &[0u8; 12]).is_some());
        assert!(framer.render_gray2(&frame, &[1u8; 12]).is_some());
    }

    #[test]
    fn rgb24_whole_emits_exactly_one_frame_per_change() {
        let mut framer = Framer::new(128, 32, 8, 4);
        let red = solid_rgb(128, 32, [0xff, 0, 0]);

        let first = framer.render_rgb24_whole(&red).unwrap();
        assert_eq!(first.command, Command::Rgb24);
        assert_eq!(first.payload.len(), 128 * 32 * 3);
        assert!(framer.render_rgb24_whole(&red).is_none());
    }

    #[test]
    fn rgb24_stream_only_sends_changed_zones() {
        let mut framer = Framer::new(16, 8, 8, 4);
        let mut frame = solid_rgb(16, 8, [1, 2, 3]);

        let first = framer.render_rgb24_stream(&frame, 4096);
        assert_eq!(first.len(), 1);

        frame[0] = 0xff;
        let second = framer.render_rgb24_stream(&frame, 4096);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].payload.len(), 1 + 8 * 4 * 3);
    }

    #[test]
    fn rgb24_stream_short_circuits_on_identical_buffer() {
        let mut framer = Framer::new(16, 8, 8, 4);
        let frame = solid_rgb(16, 8, [1, 2, 3]);

        assert_eq!(framer.render_rgb24_stream(&frame, 4096).len(), 1);
        assert!(framer.render_rgb24_stream(&frame, 4096).is_empty());
    }

    #[test]
    fn clear_forces_full_resend_of_every_cache() {
        let mut framer = Framer::new(16, 8, 8, 4);
        let frame = solid_indexed(16, 8, 0b10);
        let palette = [5u8; 12];

        framer.render_gray2(&frame, &palette);
        framer.clear();
        assert!(framer.render_gray2(&frame, &palette).is_some());
    }

    #[test]
    fn disabling_client_scaling_passes_frame_through_unscaled() {
        let mut framer = Framer::new(256, 128, 16, 16);
        framer.set_client_scaling(false);
        framer.set_frame_size(128, 64);
        let frame = solid_rgb(128, 64, [9, 9, 9]);

        let rendered = framer.render_rgb24_whole(&frame).unwrap();
        assert_eq!(rendered.payload.len(), 128 * 64 * 3);
    }

    #[test]
    fn set_frame_size_invalidates_caches() {
        let mut framer = Framer::new(16, 8, 8, 4);
        let frame = solid_indexed(16, 8, 0b11);
        let palette = [2u8; 12];

        framer.render_gray2(&frame, &palette);
        framer.set_frame_size(16, 8);
        assert!(framer.render_gray2(&frame, &palette).is_some());
    }
}
