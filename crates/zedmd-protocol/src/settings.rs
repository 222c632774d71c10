/// Panel driver chip the device is wired for (`PanelDriver::SetPanelDriver`
/// wire command).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PanelDriver {
    ShiftReg = 0,
    Fm6124 = 1,
    Fm6126A = 2,
    Icn2038S = 3,
    Mbi5124 = 4,
    Sm5266P = 5,
    Dp3246Sm5368 = 6,
}

/// Byte order the panel expects pixel data in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RgbOrder {
    Rgb = 0,
    Rbg = 1,
    Grb = 2,
    Gbr = 3,
    Brg = 4,
    Bgr = 5,
}

/// Which wire transport the device should listen on. This is a device
/// *setting* (persisted on the device), independent of which transport this
/// process happens to connect over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransportKind {
    Usb = 0,
    Udp = 1,
    Tcp = 2,
    Spi = 3,
}

/// Mirrors the settings the upstream client exposes getters/setters for.
/// Each setter queues a single-byte (or short) USB command; persistence to
/// the device's own storage happens only on an explicit `save()` call
/// (`Command::SaveSettings`).
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub brightness: u8,
    pub rgb_order: RgbOrder,
    pub panel_driver: PanelDriver,
    pub panel_clock_phase: bool,
    pub panel_i2s_speed: u8,
    pub panel_latch_blanking: u8,
    pub panel_min_refresh_rate: u8,
    pub transport_kind: TransportKind,
    pub udp_delay: u8,
    pub usb_package_size: u16,
    pub y_offset: u8,
    pub wifi_ssid: Option<String>,
    pub wifi_password: Option<String>,
    pub wifi_port: Option<u16>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            brightness: 8,
            rgb_order: RgbOrder::Rgb,
            panel_driver: PanelDriver::ShiftReg,
            panel_clock_phase: false,
            panel_i2s_speed: 8,
            panel_latch_blanking: 1,
            panel_min_refresh_rate: 60,
            transport_kind: TransportKind::Usb,
            udp_delay: 0,
            usb_package_size: 1920,
            y_offset: 0,
            wifi_ssid: None,
            wifi_password: None,
            wifi_port: None,
        }
    }
}
