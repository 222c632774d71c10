//! SPI transport: a write-only sink over a Linux SPI device
//! (`/dev/spidevX.Y`). Only runs on a Raspberry Pi, matching the upstream
//! driver's platform gate — the device's firmware only speaks SPI on that
//! board. Currently only [`Command::ClearScreen`] is mapped to a wire
//! transfer; every other command is dropped, exactly as upstream.

use zedmd_protocol::{Command, Frame, ZedmdError};

#[cfg(target_os = "linux")]
mod linux {
    use std::{fs, time::Duration};

    use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
    use tracing::warn;
    use zedmd_protocol::ZedmdError;

    const SPI_DEVICE: &str = "/dev/spidev1.0";
    const SPI_DEFAULT_SPEED_HZ: u32 = 12_000_000;
    const SPI_BUFSIZE_PATH: &str = "/sys/module/spidev/parameters/bufsiz";
    const SPI_BUFSIZE_FALLBACK: usize = 4096;

    /// `/proc/device-tree/model` only exists on device-tree platforms; SPI
    /// is gated to boards that report themselves as a Raspberry Pi, since
    /// that's the only board the firmware's SPI mode targets.
    pub fn is_supported_platform() -> bool {
        fs::read_to_string("/proc/device-tree/model")
            .map(|model| model.contains("Raspberry Pi"))
            .unwrap_or(false)
    }

    fn kernel_bufsize() -> usize {
        fs::read_to_string(SPI_BUFSIZE_PATH)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(SPI_BUFSIZE_FALLBACK)
    }

    pub struct SpiHandle {
        dev: Spidev,
        bufsize: usize,
    }

    impl SpiHandle {
        pub fn open(speed_hz: Option<u32>) -> Result<Self, ZedmdError> {
            if !is_supported_platform() {
                return Err(ZedmdError::PlatformUnsupported("SPI transport requires a Raspberry Pi"));
            }

            let mut dev = Spidev::open(SPI_DEVICE).map_err(|_| ZedmdError::TransportUnavailable)?;
            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(speed_hz.unwrap_or(SPI_DEFAULT_SPEED_HZ))
                .mode(SpiModeFlags::SPI_MODE_0)
                .build();
            dev.configure(&options).map_err(|_| ZedmdError::TransportUnavailable)?;

            let mut handle = Self { dev, bufsize: kernel_bufsize() };

            // A short CS pulse switches the device from loopback into SPI mode.
            if !handle.send_chunks(&[0u8; 4]) {
                return Err(ZedmdError::TransportUnavailable);
            }

            Ok(handle)
        }

        pub fn send_chunks(&mut self, data: &[u8]) -> bool {
            std::thread::sleep(Duration::from_micros(10));

            let transfers: Vec<SpidevTransfer> =
                data.chunks(self.bufsize).map(SpidevTransfer::write).collect();

            let result = if transfers.len() == 1 {
                self.dev.transfer(&mut transfers.into_iter().next().unwrap())
            } else {
                let mut transfers = transfers;
                self.dev.transfer_multiple(&mut transfers)
            };

            if let Err(err) = result {
                warn!(%err, "spi write failed");
                std::thread::sleep(Duration::from_micros(100));
                return false;
            }

            std::thread::sleep(Duration::from_micros(100));
            true
        }
    }
}

/// Handle to an open SPI link. Non-Linux builds can construct the type but
/// [`SpiTransport::open`] always fails with [`ZedmdError::PlatformUnsupported`].
pub struct SpiTransport {
    #[cfg(target_os = "linux")]
    handle: linux::SpiHandle,
    width: u16,
    height: u16,
    inter_frame_pause: std::time::Duration,
}

impl SpiTransport {
    #[cfg(target_os = "linux")]
    pub fn open(width: u16, height: u16, speed_hz: Option<u32>) -> Result<Self, ZedmdError> {
        Ok(Self {
            handle: linux::SpiHandle::open(speed_hz)?,
            width,
            height,
            inter_frame_pause: std::time::Duration::ZERO,
        })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn open(_width: u16, _height: u16, _speed_hz: Option<u32>) -> Result<Self, ZedmdError> {
        Err(ZedmdError::PlatformUnsupported("SPI transport is only implemented for Linux"))
    }

    /// Sets an extra pause inserted after every write, on top of the fixed
    /// ≥100µs settle time `send_chunks` always applies. Lets a caller slow
    /// an overwhelmed device down further.
    pub fn set_inter_frame_pause(&mut self, pause: std::time::Duration) {
        self.inter_frame_pause = pause;
    }

    /// Sends a frame if it's one SPI currently understands. Everything but
    /// `ClearScreen` is dropped — there is no zone-streaming or RGB24 path
    /// over SPI yet.
    pub fn send(&mut self, frame: &Frame) -> Result<(), ZedmdError> {
        let result = match frame.command {
            Command::ClearScreen => {
                let blank = vec![0u8; self.width as usize * self.height as usize * 2];
                self.send_rgb565_blank(&blank)
            }
            _ => {
                tracing::trace!(?frame.command, "dropping command unsupported over SPI");
                Ok(())
            }
        };

        if !self.inter_frame_pause.is_zero() {
            std::thread::sleep(self.inter_frame_pause);
        }

        result
    }

    #[cfg(target_os = "linux")]
    fn send_rgb565_blank(&mut self, blank: &[u8]) -> Result<(), ZedmdError> {
        if self.handle.send_chunks(blank) {
            Ok(())
        } else {
            Err(ZedmdError::TransportUnavailable)
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn send_rgb565_blank(&mut self, _blank: &[u8]) -> Result<(), ZedmdError> {
        Err(ZedmdError::PlatformUnsupported("SPI transport is only implemented for Linux"))
    }
}
