use std::{
    net::UdpSocket,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::Duration,
};

use tracing::{debug, warn};
use zedmd_protocol::{Frame, ZedmdError, command::FRAME_SIZE_COMMAND_LIMIT, compress::deflate};

use crate::frame_queue::FrameQueue;

/// Sends frames as UDP datagrams to a device listening on WiFi. Small
/// (command-sized) frames are sent uncompressed, three times in a row with
/// a 10ms gap, to tolerate datagram loss; larger frames are sent once,
/// compressed, with the originating zone count folded into the flags byte.
pub struct UdpTransport {
    queue: Arc<FrameQueue>,
    connected: Arc<AtomicBool>,
    zone_width: u8,
    zone_height: u8,
    worker: Option<JoinHandle<()>>,
}

impl UdpTransport {
    pub fn open(addr: &str, port: u16, zone_width: u8, zone_height: u8) -> Result<Self, ZedmdError> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(|_| ZedmdError::TransportUnavailable)?;
        socket
            .connect((addr, port))
            .map_err(|_| ZedmdError::TransportUnavailable)?;

        let queue = Arc::new(FrameQueue::new());
        let connected = Arc::new(AtomicBool::new(true));

        let worker_queue = queue.clone();
        let worker_connected = connected.clone();
        let zone_byte_unit = zone_width as usize * zone_height as usize * 3 + 1;
        let worker = std::thread::spawn(move || {
            Self::run(socket, worker_queue, worker_connected, zone_byte_unit);
        });

        Ok(Self { queue, connected, zone_width, zone_height, worker: Some(worker) })
    }

    fn run(socket: UdpSocket, queue: Arc<FrameQueue>, connected: Arc<AtomicBool>, zone_byte_unit: usize) {
        debug!("udp worker thread starting");

        while connected.load(Ordering::Acquire) {
            let Some(frame) = queue.pop(Duration::from_millis(50)) else {
                continue;
            };

            if let Err(err) = Self::send(&socket, &frame, zone_byte_unit) {
                warn!(%err, "udp send failed");
            }
        }

        debug!("udp worker thread finished");
    }

    fn send(socket: &UdpSocket, frame: &Frame, zone_byte_unit: usize) -> Result<(), ZedmdError> {
        if frame.payload.len() < FRAME_SIZE_COMMAND_LIMIT {
            let mut datagram = Vec::with_capacity(4 + frame.payload.len());
            datagram.push(frame.command as u8);
            datagram.push(0);
            let len = frame.payload.len() as u16;
            datagram.push((len >> 8) as u8);
            datagram.push((len & 0xff) as u8);
            datagram.extend_from_slice(&frame.payload);

            for _ in 0..3 {
                socket
                    .send(&datagram)
                    .map_err(|_| ZedmdError::TransportUnavailable)?;
                std::thread::sleep(Duration::from_millis(10));
            }
            return Ok(());
        }

        let compressed = deflate(&frame.payload)?;
        let zone_count = frame.payload.len() / zone_byte_unit.max(1);
        let flags = 0x80 | u8::try_from(zone_count).unwrap_or(0x7f);

        let mut datagram = Vec::with_capacity(4 + compressed.len());
        datagram.push(frame.command as u8);
        datagram.push(flags);
        let len = u16::try_from(compressed.len()).unwrap_or(u16::MAX);
        datagram.push((len >> 8) as u8);
        datagram.push((len & 0xff) as u8);
        datagram.extend_from_slice(&compressed);

        socket.send(&datagram).map_err(|_| ZedmdError::TransportUnavailable)?;
        Ok(())
    }

    #[must_use]
    pub fn queue(&self) -> &FrameQueue {
        &self.queue
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
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
