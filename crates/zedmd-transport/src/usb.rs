use std::{
    marker::PhantomData,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::Duration,
};

use tracing::{debug, info, warn};
use zedmd_protocol::{
    Command, Frame, ZedmdError,
    command::{DEFAULT_MAX_SERIAL_WRITE_AT_ONCE, HEADER},
};

use crate::{frame_queue::FrameQueue, port::Port, serial_line::SerialLine, wire};

/// A connected USB serial link: the discovery/compression/chunking/flow-
/// control handshake has already completed by the time this value exists.
///
/// Generic over the byte-oriented [`Port`] it rides on so the handshake and
/// send-loop logic can be driven against an in-memory mock in tests; the
/// public API only ever names the default, [`SerialLine`]-backed transport.
pub struct UsbTransport<P: Port = SerialLine> {
    queue: Arc<FrameQueue>,
    connected: Arc<AtomicBool>,
    width: u16,
    height: u16,
    zone_width: u8,
    zone_height: u8,
    worker: Option<JoinHandle<()>>,
    _port: PhantomData<P>,
}

struct HandshakeResult {
    width: u16,
    height: u16,
    zone_width: u8,
    zone_height: u8,
    flow_control_counter: u8,
}

impl UsbTransport<SerialLine> {
    /// Opens a specific device path and runs the full handshake
    /// synchronously, returning once the link is ready to stream frames.
    pub fn open(path: &str) -> Result<Self, ZedmdError> {
        let mut line = SerialLine::open(path)?;
        let handshake = Self::handshake(&mut line, Some(path))?;
        Ok(Self::spawn(line, handshake))
    }

    /// Probes the platform's conventional USB serial device paths in turn,
    /// returning the first one that completes the handshake.
    pub fn autodiscover() -> Result<Self, ZedmdError> {
        Self::autodiscover_except(&[])
    }

    /// Same as [`Self::autodiscover`], skipping any path present in
    /// `ignored` (spec §4.3.3's configurable ignore list, for serial ports
    /// known to belong to other attached devices).
    pub fn autodiscover_except(ignored: &[String]) -> Result<Self, ZedmdError> {
        for path in SerialLine::candidate_paths() {
            if ignored.iter().any(|i| i == &path) {
                continue;
            }
            match SerialLine::open(&path) {
                Ok(mut line) => {
                    if let Ok(handshake) = Self::handshake(&mut line, Some(&path)) {
                        return Ok(Self::spawn(line, handshake));
                    }
                }
                Err(_) => continue,
            }
        }
        Err(ZedmdError::TransportUnavailable)
    }
}

impl<P: Port + 'static> UsbTransport<P> {
    /// Runs the full discovery/compression/chunking/flow-control handshake
    /// over an already-open port, then spawns the send-loop worker. Exposed
    /// so tests can drive the handshake against a mock [`Port`].
    pub fn open_with_port(mut port: P, path: Option<&str>) -> Result<Self, ZedmdError> {
        let handshake = Self::handshake(&mut port, path)?;
        Ok(Self::spawn(port, handshake))
    }

    fn handshake(line: &mut P, path: Option<&str>) -> Result<HandshakeResult, ZedmdError> {
        line.reset();

        // Android in general, but also ZeDMD HD, need some time after opening.
        std::thread::sleep(Duration::from_millis(1000));
        line.drain_available();

        let mut hello = HEADER.to_vec();
        hello.push(Command::Handshake as u8);
        line.write_all(&hello)?;
        std::thread::sleep(Duration::from_millis(200));

        let mut data = [0u8; 8];
        if !line.read_exact(&mut data) {
            return Err(ZedmdError::WireTimeout);
        }
        if data[..4] != HEADER[..4] {
            return Err(ZedmdError::WireProtocolViolation { expected: HEADER[0], got: data[0] });
        }

        let width = u16::from(data[4]) + u16::from(data[5]) * 256;
        let height = u16::from(data[6]) + u16::from(data[7]) * 256;
        let zone_width = (width / 16) as u8;
        let zone_height = (height / 8) as u8;

        if line.read_byte() != b'R' {
            return Err(ZedmdError::WireProtocolViolation { expected: b'R', got: 0 });
        }

        Self::send_header(line, Command::EnableCompression)?;
        std::thread::sleep(Duration::from_millis(4));
        Self::expect(line, b'A')?;
        Self::expect(line, b'R')?;

        let mut chunk_cmd = HEADER.to_vec();
        chunk_cmd.push(Command::Chunk as u8);
        chunk_cmd.push((DEFAULT_MAX_SERIAL_WRITE_AT_ONCE / 256) as u8);
        line.write_all(&chunk_cmd)?;
        std::thread::sleep(Duration::from_millis(4));
        Self::expect(line, b'A')?;
        Self::expect(line, b'R')?;

        Self::send_header(line, Command::EnableFlowControlV2)?;
        std::thread::sleep(Duration::from_millis(4));
        Self::expect(line, b'A')?;

        info!(?path, width, height, "zedmd found");

        Ok(HandshakeResult { width, height, zone_width, zone_height, flow_control_counter: 1 })
    }

    fn send_header(line: &mut P, command: Command) -> Result<(), ZedmdError> {
        let mut out = HEADER.to_vec();
        out.push(command as u8);
        line.write_all(&out)
    }

    fn expect(line: &mut P, expected: u8) -> Result<(), ZedmdError> {
        let got = line.read_byte();
        if got == expected {
            Ok(())
        } else {
            Err(ZedmdError::WireProtocolViolation { expected, got })
        }
    }

    fn spawn(line: P, handshake: HandshakeResult) -> Self {
        let queue = Arc::new(FrameQueue::new());
        let connected = Arc::new(AtomicBool::new(true));

        let worker_queue = queue.clone();
        let worker_connected = connected.clone();
        let worker = std::thread::spawn(move || {
            Self::run(line, worker_queue, worker_connected, handshake.flow_control_counter);
        });

        Self {
            queue,
            connected,
            width: handshake.width,
            height: handshake.height,
            zone_width: handshake.zone_width,
            zone_height: handshake.zone_height,
            worker: Some(worker),
            _port: PhantomData,
        }
    }

    fn run(mut line: P, queue: Arc<FrameQueue>, connected: Arc<AtomicBool>, mut fc: u8) {
        debug!("usb worker thread starting");

        while connected.load(Ordering::Acquire) {
            let Some(frame) = queue.pop(Duration::from_millis(50)) else {
                continue;
            };

            let mut success = Self::stream_frame(&mut line, &frame, &mut fc);
            if !success && frame.is_command_sized() {
                std::thread::sleep(Duration::from_millis(8));
                success = Self::stream_frame(&mut line, &frame, &mut fc);
            }

            if !success {
                std::thread::sleep(Duration::from_millis(2));
            }
        }

        debug!("usb worker thread finished");
    }

    /// Sends one wire-encoded frame, waiting for the flow-control ready
    /// signal first and chunk-acking every write along the way. Mirrors the
    /// upstream `StreamBytes` contract byte-for-byte.
    fn stream_frame(line: &mut P, frame: &Frame, fc: &mut u8) -> bool {
        let Ok(data) = wire::encode(frame.command, &frame.payload) else {
            warn!("failed to encode frame for transmission");
            return false;
        };

        // Zero bytes are read timeouts, not protocol bytes; keep polling
        // past them. Any other value either matches `fc` (ready) or fails
        // the frame outright.
        let mut flow_byte;
        loop {
            flow_byte = line.read_byte();
            if flow_byte != 0 {
                break;
            }
        }

        if flow_byte != *fc {
            warn!("no ready signal from device");
            return false;
        }

        let mut position = 0usize;
        let mut success = true;
        while position < data.len() && success {
            let end = (position + DEFAULT_MAX_SERIAL_WRITE_AT_ONCE).min(data.len());
            if line.write_all(&data[position..end]).is_err() {
                success = false;
                break;
            }

            let mut response;
            loop {
                response = line.read_byte();
                if response != *fc {
                    break;
                }
            }

            if response == b'A' {
                position += DEFAULT_MAX_SERIAL_WRITE_AT_ONCE;
            } else {
                success = false;
                warn!(response, "write bytes failure");
            }
        }

        *fc = if *fc < 32 { *fc + 1 } else { 1 };

        success
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
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
    pub fn queue(&self) -> &FrameQueue {
        &self.queue
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl<P: Port> Drop for UsbTransport<P> {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
