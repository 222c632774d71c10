//! Public facade for the ZeDMD pinball dot-matrix display driver: the
//! surface the upstream `ZeDMD` C++ class exposes (open/close, the render
//! calls, the settings getters/setters), backed by `zedmd-protocol`'s pure
//! frame preparation and `zedmd-transport`'s background-thread transports.
//!
//! ```no_run
//! let mut zedmd = zedmd::Zedmd::new();
//! zedmd.open()?;
//! zedmd.clear_screen()?;
//! # Ok::<(), zedmd_protocol::ZedmdError>(())
//! ```

mod log;
mod settings;
mod transport;

use tracing::info;
use zedmd_protocol::{
    Command, DeviceSettings, Frame, Framer, PanelDriver, RgbOrder, TransportKind, ZedmdError,
    rgb565_to_rgb888,
};
use zedmd_transport::{SpiTransport, TcpTransport, UdpTransport, UsbTransport};

pub use log::LogCallback;
pub use zedmd_protocol::DeviceSettings as Settings;

use crate::{log::LogSink, transport::Transport};

/// Canvas assumed before any transport with its own discovery handshake
/// (today, only USB) has connected. UDP, TCP and SPI have no handshake to
/// learn this from, so callers opening over one of those must pass the
/// real dimensions to `open_wifi_udp`/`open_wifi_tcp`/`open_spi`.
const DEFAULT_WIDTH: u16 = 128;
const DEFAULT_HEIGHT: u16 = 32;

fn zone_dims(width: u16, height: u16) -> (u8, u8) {
    ((width / 16) as u8, (height / 8) as u8)
}

/// One connected (or not-yet-connected) device. Not `Sync`: the framer's
/// caches and the zone hash table are caller-thread-only by design (spec
/// §5), so a `Zedmd` should live on whichever thread prepares frames.
pub struct Zedmd {
    transport: Option<Transport>,
    framer: Framer,
    settings: DeviceSettings,
    log: LogSink,
    ignored_devices: Vec<String>,
}

impl Default for Zedmd {
    fn default() -> Self {
        Self::new()
    }
}

impl Zedmd {
    #[must_use]
    pub fn new() -> Self {
        let (zone_width, zone_height) = zone_dims(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        Self {
            transport: None,
            framer: Framer::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, zone_width, zone_height),
            settings: DeviceSettings::default(),
            log: LogSink::default(),
            ignored_devices: Vec::new(),
        }
    }

    /// Excludes a serial device path from future [`Self::open`] calls (spec
    /// §4.3.3) — for ports known to belong to some other attached device.
    pub fn ignore_device(&mut self, path: impl Into<String>) {
        self.ignored_devices.push(path.into());
    }

    /// Probes the platform's conventional USB serial paths and connects to
    /// the first one that completes the handshake.
    pub fn open(&mut self) -> Result<(), ZedmdError> {
        let usb = UsbTransport::autodiscover_except(&self.ignored_devices)?;
        self.adopt_usb(usb);
        Ok(())
    }

    /// Connects to a specific USB serial device path, skipping
    /// autodiscovery.
    pub fn open_device(&mut self, path: &str) -> Result<(), ZedmdError> {
        let usb = UsbTransport::open(path)?;
        self.adopt_usb(usb);
        Ok(())
    }

    fn adopt_usb(&mut self, usb: UsbTransport) {
        self.framer = Framer::new(usb.width(), usb.height(), usb.zone_width(), usb.zone_height());
        self.transport = Some(Transport::Usb(usb));
        self.announce("zedmd connected over usb");
    }

    /// Connects over WiFi via UDP. Unlike USB, there is no discovery
    /// handshake to learn the panel's dimensions, so the caller supplies
    /// them directly.
    pub fn open_wifi_udp(&mut self, addr: &str, port: u16, width: u16, height: u16) -> Result<(), ZedmdError> {
        let (zone_width, zone_height) = zone_dims(width, height);
        let udp = UdpTransport::open(addr, port, zone_width, zone_height)?;
        self.framer = Framer::new(width, height, zone_width, zone_height);
        self.transport = Some(Transport::Udp(udp));
        self.announce("zedmd connected over udp");
        Ok(())
    }

    /// Connects over WiFi via TCP.
    pub fn open_wifi_tcp(&mut self, addr: &str, port: u16, width: u16, height: u16) -> Result<(), ZedmdError> {
        let tcp = TcpTransport::open(addr, port)?;
        let (zone_width, zone_height) = zone_dims(width, height);
        self.framer = Framer::new(width, height, zone_width, zone_height);
        self.transport = Some(Transport::Tcp(tcp));
        self.announce("zedmd connected over tcp");
        Ok(())
    }

    /// Connects over the local SPI bus. Only available when running on a
    /// Raspberry Pi (spec §4.6); fails with
    /// [`ZedmdError::PlatformUnsupported`] everywhere else.
    pub fn open_spi(&mut self, width: u16, height: u16, speed_hz: Option<u32>) -> Result<(), ZedmdError> {
        let spi = SpiTransport::open(width, height, speed_hz)?;
        let (zone_width, zone_height) = zone_dims(width, height);
        self.framer = Framer::new(width, height, zone_width, zone_height);
        self.transport = Some(Transport::Spi(spi));
        self.announce("zedmd connected over spi");
        Ok(())
    }

    /// Drops the transport, joining its worker thread.
    pub fn close(&mut self) {
        self.transport = None;
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(Transport::is_connected)
    }

    /// Declares the dimensions of frames that will be passed to the render
    /// methods from now on (spec §4.1.1's `SetFrameSize`). Independent of
    /// the device's own canvas size; the scaler bridges the two.
    pub fn set_frame_size(&mut self, width: u16, height: u16) {
        self.framer.set_frame_size(width, height);
    }

    /// Registers (or clears, with `None`) a legacy log callback alongside
    /// the `tracing` events every call site already emits.
    pub fn set_log_callback(&self, callback: Option<LogCallback>) {
        self.log.set(callback);
    }

    fn announce(&self, message: &str) {
        info!("{message}");
        self.log.forward(message);
    }

    fn enqueue(&mut self, frame: Frame) -> Result<(), ZedmdError> {
        self.transport.as_mut().ok_or(ZedmdError::TransportUnavailable)?.enqueue(frame);
        Ok(())
    }

    // --- renders (spec §4.7) ---

    /// Whole-image 2-bit indexed render.
    pub fn render_gray2(&mut self, frame: &[u8], palette: &[u8; 12]) -> Result<(), ZedmdError> {
        match self.framer.render_gray2(frame, palette) {
            Some(rendered) => self.enqueue(rendered),
            None => Ok(()),
        }
    }

    /// Whole-image 4-bit colored-gray render.
    pub fn render_col_gray4(&mut self, frame: &[u8], palette: &[u8; 48]) -> Result<(), ZedmdError> {
        match self.framer.render_col_gray4(frame, palette) {
            Some(rendered) => self.enqueue(rendered),
            None => Ok(()),
        }
    }

    /// Whole-image 6-bit colored-gray render, with an optional 24-byte
    /// rotation descriptor.
    pub fn render_col_gray6(
        &mut self,
        frame: &[u8],
        palette: &[u8; 192],
        rotations: Option<&[u8; 24]>,
    ) -> Result<(), ZedmdError> {
        match self.framer.render_col_gray6(frame, palette, rotations) {
            Some(rendered) => self.enqueue(rendered),
            None => Ok(()),
        }
    }

    /// Whole-image RGB24 render: one `Rgb24` frame, no zone diffing. Used
    /// internally by [`Self::led_test`]; exposed for callers who want the
    /// upstream `RenderRgb24` behavior instead of the always-zone-streamed
    /// `render_rgb888`.
    pub fn render_rgb24_whole(&mut self, frame: &[u8]) -> Result<(), ZedmdError> {
        match self.framer.render_rgb24_whole(frame) {
            Some(rendered) => self.enqueue(rendered),
            None => Ok(()),
        }
    }

    /// Zone-streamed 24-bit RGB render (spec §4.11): the normal path for
    /// continuous frame delivery.
    pub fn render_rgb888(&mut self, frame: &[u8]) -> Result<(), ZedmdError> {
        self.stream_rgb24(frame)
    }

    /// Zone-streamed RGB565 render. There is no dedicated wire command for
    /// 16-bit color; the frame is expanded to RGB24 first and sent down the
    /// same zone-streaming path as [`Self::render_rgb888`], matching
    /// upstream.
    pub fn render_rgb565(&mut self, frame: &[u16]) -> Result<(), ZedmdError> {
        let expanded = rgb565_to_rgb888(frame);
        self.stream_rgb24(&expanded)
    }

    fn stream_rgb24(&mut self, frame: &[u8]) -> Result<(), ZedmdError> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(ZedmdError::TransportUnavailable);
        };

        // §4.7.4: a pending/near-full queue means this generation must be
        // staged as delayed and self-contained, so the zone hash table (and
        // the whole-buffer short-circuit riding alongside it) is cleared
        // before diffing rather than after.
        let delay = transport.should_delay();
        if delay {
            self.framer.clear();
            // Start this generation's staging area clean: a stale delayed
            // generation left pending from an earlier call (e.g. one that
            // was never drained before the queue backed up again) must not
            // mix its zones with this one's.
            transport.begin_delayed_streamed();
        }

        zedmd_util::safe_assert!(
            self.framer.zone_width() > 0 && self.framer.zone_height() > 0,
            "zone-streamed render with a zero-sized zone grid; did open() run before the handshake completed?",
        );

        let bytes_limit = transport.zone_bytes_limit(
            self.framer.zone_width(),
            self.framer.zone_height(),
            self.framer.device_width(),
            Some(self.settings.usb_package_size),
        );

        let frames = self.framer.render_rgb24_stream(frame, bytes_limit);
        if frames.is_empty() {
            return Ok(());
        }

        for rendered in frames {
            if delay {
                transport.enqueue_delayed_streamed(rendered);
            } else {
                transport.enqueue(rendered);
            }
        }
        if delay {
            transport.mark_delayed_ready();
        }

        Ok(())
    }

    pub fn clear_screen(&mut self) -> Result<(), ZedmdError> {
        self.enqueue(Frame::command_only(Command::ClearScreen))
    }

    /// Runs the upstream self-test sequence: full red, then full green,
    /// then full blue, one whole-image `Rgb24` frame per color.
    pub fn led_test(&mut self) -> Result<(), ZedmdError> {
        let width = usize::from(self.framer.device_width());
        let height = usize::from(self.framer.device_height());
        for color in [[0xff, 0, 0], [0, 0xff, 0], [0, 0, 0xff]] {
            let frame: Vec<u8> = color.iter().copied().cycle().take(width * height * 3).collect();
            self.render_rgb24_whole(&frame)?;
        }
        Ok(())
    }

    /// Toggles whether this library's own scaler (§4.9) runs before a
    /// render is sent, independent of the device's own firmware upscaler
    /// (`Command::EnableUpscaling`/`DisableUpscaling`).
    pub fn set_client_side_scaling(&mut self, enabled: bool) {
        self.framer.set_client_scaling(enabled);
    }

    pub fn enable_upscaling(&mut self) -> Result<(), ZedmdError> {
        self.enqueue(Frame::command_only(Command::EnableUpscaling))
    }

    pub fn disable_upscaling(&mut self) -> Result<(), ZedmdError> {
        self.enqueue(Frame::command_only(Command::DisableUpscaling))
    }

    pub fn enable_debug(&mut self) -> Result<(), ZedmdError> {
        self.enqueue(Frame::command_only(Command::EnableDebug))
    }

    pub fn disable_debug(&mut self) -> Result<(), ZedmdError> {
        self.enqueue(Frame::command_only(Command::DisableDebug))
    }

    // --- device settings (spec §4.10) ---

    #[must_use]
    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    pub fn set_brightness(&mut self, value: u8) -> Result<(), ZedmdError> {
        self.settings.brightness = value.min(15);
        self.enqueue(settings::brightness(value))
    }

    pub fn set_rgb_order(&mut self, value: RgbOrder) -> Result<(), ZedmdError> {
        self.settings.rgb_order = value;
        self.enqueue(settings::rgb_order(value))
    }

    pub fn set_panel_driver(&mut self, value: PanelDriver) -> Result<(), ZedmdError> {
        self.settings.panel_driver = value;
        self.enqueue(settings::panel_driver(value))
    }

    pub fn set_panel_clock_phase(&mut self, value: bool) -> Result<(), ZedmdError> {
        self.settings.panel_clock_phase = value;
        self.enqueue(settings::panel_clock_phase(value))
    }

    pub fn set_panel_i2s_speed(&mut self, value: u8) -> Result<(), ZedmdError> {
        self.settings.panel_i2s_speed = value;
        self.enqueue(settings::panel_i2s_speed(value))
    }

    pub fn set_panel_latch_blanking(&mut self, value: u8) -> Result<(), ZedmdError> {
        self.settings.panel_latch_blanking = value.min(4);
        self.enqueue(settings::panel_latch_blanking(value))
    }

    pub fn set_panel_min_refresh_rate(&mut self, value: u8) -> Result<(), ZedmdError> {
        self.settings.panel_min_refresh_rate = value.clamp(30, 120);
        self.enqueue(settings::panel_min_refresh_rate(value))
    }

    pub fn set_transport_kind(&mut self, value: TransportKind) -> Result<(), ZedmdError> {
        self.settings.transport_kind = value;
        self.enqueue(settings::transport_kind(value))
    }

    pub fn set_udp_delay(&mut self, value: u8) -> Result<(), ZedmdError> {
        self.settings.udp_delay = value.min(9);
        self.enqueue(settings::udp_delay(value))
    }

    pub fn set_usb_package_size(&mut self, value: u16) -> Result<(), ZedmdError> {
        self.settings.usb_package_size = value.clamp(32, 1920) / 32 * 32;
        self.enqueue(settings::usb_package_size(value))
    }

    pub fn set_y_offset(&mut self, value: u8) -> Result<(), ZedmdError> {
        self.settings.y_offset = value.min(32);
        self.enqueue(settings::y_offset(value))
    }

    pub fn set_wifi_ssid(&mut self, ssid: &str) -> Result<(), ZedmdError> {
        self.settings.wifi_ssid = Some(ssid.to_string());
        self.enqueue(settings::wifi_ssid(ssid))
    }

    pub fn set_wifi_password(&mut self, password: &str) -> Result<(), ZedmdError> {
        self.settings.wifi_password = Some(password.to_string());
        self.enqueue(settings::wifi_password(password))
    }

    pub fn set_wifi_port(&mut self, port: u16) -> Result<(), ZedmdError> {
        self.settings.wifi_port = Some(port);
        self.enqueue(settings::wifi_port(port))
    }

    /// Persists every setting sent so far to the device's own storage.
    pub fn save_settings(&mut self) -> Result<(), ZedmdError> {
        self.enqueue(Frame::command_only(Command::SaveSettings))
    }

    pub fn reset(&mut self) -> Result<(), ZedmdError> {
        self.enqueue(Frame::command_only(Command::Reset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_device_starts_disconnected() {
        let zedmd = Zedmd::new();
        assert!(!zedmd.is_connected());
    }

    #[test]
    fn renders_without_a_transport_report_unavailable() {
        let mut zedmd = Zedmd::new();
        let frame = vec![0u8; usize::from(DEFAULT_WIDTH) * usize::from(DEFAULT_HEIGHT) * 3];
        assert!(matches!(zedmd.render_rgb888(&frame), Err(ZedmdError::TransportUnavailable)));
    }

    #[test]
    fn ignore_device_accumulates_paths() {
        let mut zedmd = Zedmd::new();
        zedmd.ignore_device("/dev/ttyUSB0");
        zedmd.ignore_device("/dev/ttyUSB1");
        assert_eq!(zedmd.ignored_devices, vec!["/dev/ttyUSB0", "/dev/ttyUSB1"]);
    }

    #[test]
    fn set_brightness_updates_local_settings_mirror() {
        let mut zedmd = Zedmd::new();
        // No transport: the enqueue fails, but the local settings mirror is
        // meant to reflect what was *requested* regardless of link state.
        let _ = zedmd.set_brightness(12);
        assert_eq!(zedmd.settings().brightness, 12);
    }
}
