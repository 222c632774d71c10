use std::{io::Read as _, io::Write as _, time::Duration};

use serialport::SerialPort;
use zedmd_protocol::{
    ZedmdError,
    command::{BAUD_RATE, SERIAL_READ_TIMEOUT_MS, SERIAL_WRITE_TIMEOUT_MS},
};

use crate::port::Port;

/// A platform-abstracted serial port, opened at the device's fixed baud
/// rate and byte framing. Thin wrapper around the `serialport` crate's
/// blocking `SerialPort` trait object; exists so the rest of the USB
/// transport never has to think about the underlying OS handle.
pub struct SerialLine {
    port: Box<dyn SerialPort>,
}

impl SerialLine {
    pub fn open(path: &str) -> Result<Self, ZedmdError> {
        let port = serialport::new(path, BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(SERIAL_READ_TIMEOUT_MS))
            .open()
            .map_err(|_| ZedmdError::TransportUnavailable)?;

        Ok(Self { port })
    }

    /// Enumerates the candidate device paths to probe during autodiscovery,
    /// platform-appropriate (`/dev/ttyUSB*` on Linux, `COM*` on Windows,
    /// `/dev/cu.usbserial-*` on macOS).
    #[must_use]
    pub fn candidate_paths() -> Vec<String> {
        (0..7)
            .map(|i| {
                if cfg!(target_os = "windows") {
                    format!("COM{}", i + 1)
                } else if cfg!(target_os = "macos") {
                    format!("/dev/cu.usbserial-{i:04}")
                } else {
                    format!("/dev/ttyUSB{i}")
                }
            })
            .collect()
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), ZedmdError> {
        self.port.set_timeout(timeout).map_err(|_| ZedmdError::TransportUnavailable)
    }

    #[must_use]
    pub fn write_timeout() -> Duration {
        Duration::from_millis(SERIAL_WRITE_TIMEOUT_MS)
    }
}

impl Port for SerialLine {
    /// Toggles DTR/RTS to reset the device, matching the two 200ms pulses
    /// the upstream driver uses.
    fn reset(&mut self) {
        let _ = self.port.write_data_terminal_ready(false);
        let _ = self.port.write_request_to_send(true);
        std::thread::sleep(Duration::from_millis(200));

        let _ = self.port.write_request_to_send(false);
        let _ = self.port.write_data_terminal_ready(false);
        std::thread::sleep(Duration::from_millis(200));
    }

    fn drain_available(&mut self) {
        let mut scratch = [0u8; 8];
        while self.port.bytes_to_read().unwrap_or(0) > 0 {
            if self.port.read(&mut scratch).is_err() {
                break;
            }
        }
    }

    /// Reads one byte, or `0` on a read timeout (matching the upstream
    /// `ReadByte()` contract that callers rely on to distinguish "no data
    /// yet" from a real protocol byte).
    fn read_byte(&mut self) -> u8 {
        let mut buf = [0u8; 1];
        match self.port.read_exact(&mut buf) {
            Ok(()) => buf[0],
            Err(_) => 0,
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> bool {
        std::io::Read::read_exact(&mut self.port, buf).is_ok()
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), ZedmdError> {
        self.port.write_all(data).map_err(|_| ZedmdError::WireTimeout)
    }
}
