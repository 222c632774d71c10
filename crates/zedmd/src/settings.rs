//! Translates [`DeviceSettings`] mutators into the single-byte (or short)
//! USB commands the device expects (spec §4.10). Every setter here just
//! builds a [`Frame`]; persistence to the device's own storage only
//! happens when the caller explicitly sends [`Command::SaveSettings`].

use zedmd_protocol::{Command, Frame, PanelDriver, RgbOrder, TransportKind};

#[must_use]
pub(crate) fn brightness(value: u8) -> Frame {
    Frame::new(Command::Brightness, vec![value.min(15)])
}

#[must_use]
pub(crate) fn rgb_order(value: RgbOrder) -> Frame {
    Frame::new(Command::RgbOrder, vec![value as u8])
}

#[must_use]
pub(crate) fn panel_driver(value: PanelDriver) -> Frame {
    Frame::new(Command::SetPanelDriver, vec![value as u8])
}

#[must_use]
pub(crate) fn panel_clock_phase(value: bool) -> Frame {
    Frame::new(Command::SetPanelClockPhase, vec![u8::from(value)])
}

#[must_use]
pub(crate) fn panel_i2s_speed(value: u8) -> Frame {
    Frame::new(Command::SetPanelI2sSpeed, vec![value])
}

#[must_use]
pub(crate) fn panel_latch_blanking(value: u8) -> Frame {
    Frame::new(Command::SetPanelLatchBlanking, vec![value.min(4)])
}

#[must_use]
pub(crate) fn panel_min_refresh_rate(value: u8) -> Frame {
    Frame::new(Command::SetPanelMinRefreshRate, vec![value.clamp(30, 120)])
}

#[must_use]
pub(crate) fn transport_kind(value: TransportKind) -> Frame {
    Frame::new(Command::SetTransport, vec![value as u8])
}

#[must_use]
pub(crate) fn udp_delay(value: u8) -> Frame {
    Frame::new(Command::SetUdpDelay, vec![value.min(9)])
}

#[must_use]
pub(crate) fn usb_package_size(value: u16) -> Frame {
    let value = value.clamp(32, 1920) / 32 * 32;
    Frame::new(Command::SetUsbPackageSize, vec![(value >> 8) as u8, (value & 0xff) as u8])
}

#[must_use]
pub(crate) fn y_offset(value: u8) -> Frame {
    Frame::new(Command::SetYOffset, vec![value.min(32)])
}

#[must_use]
pub(crate) fn wifi_ssid(ssid: &str) -> Frame {
    Frame::new(Command::SetWifiSsid, ssid.as_bytes().to_vec())
}

#[must_use]
pub(crate) fn wifi_password(password: &str) -> Frame {
    Frame::new(Command::SetWifiPassword, password.as_bytes().to_vec())
}

#[must_use]
pub(crate) fn wifi_port(port: u16) -> Frame {
    Frame::new(Command::SetWifiPort, vec![(port >> 8) as u8, (port & 0xff) as u8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_clamps_to_device_range() {
        assert_eq!(brightness(200).payload, vec![15]);
    }

    #[test]
    fn usb_package_size_rounds_down_to_multiple_of_32() {
        let frame = usb_package_size(100);
        let value = (u16::from(frame.payload[0]) << 8) | u16::from(frame.payload[1]);
        assert_eq!(value % 32, 0);
        assert!(value >= 32 && value <= 1920);
    }

    #[test]
    fn udp_delay_clamps_to_device_range() {
        assert_eq!(udp_delay(255).payload, vec![9]);
    }
}
