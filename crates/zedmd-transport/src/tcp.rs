use std::{
    io::Write as _,
    net::TcpStream,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::Duration,
};

use tracing::{debug, warn};
use zedmd_protocol::{ZedmdError, command::HEADER};
use zedmd_util::Repeater;

use crate::{frame_queue::FrameQueue, wire};

const KEEPALIVE_INTERVAL: Duration = Duration::from_millis(100);

/// Sends frames over an ordered TCP stream using the same
/// header/command/compressed-payload framing as the USB transport, but
/// without USB's flow-control ack loop — TCP's own ordering and backpressure
/// replace it. An idle connection is kept alive with a bare header ping
/// every [`KEEPALIVE_INTERVAL`].
pub struct TcpTransport {
    queue: Arc<FrameQueue>,
    connected: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl TcpTransport {
    pub fn open(addr: &str, port: u16) -> Result<Self, ZedmdError> {
        let stream = TcpStream::connect((addr, port)).map_err(|_| ZedmdError::TransportUnavailable)?;
        stream.set_nodelay(true).map_err(|_| ZedmdError::TransportUnavailable)?;

        let queue = Arc::new(FrameQueue::new());
        let connected = Arc::new(AtomicBool::new(true));

        let worker_queue = queue.clone();
        let worker_connected = connected.clone();
        let worker = std::thread::spawn(move || {
            Self::run(stream, worker_queue, worker_connected);
        });

        Ok(Self { queue, connected, worker: Some(worker) })
    }

    fn run(mut stream: TcpStream, queue: Arc<FrameQueue>, connected: Arc<AtomicBool>) {
        debug!("tcp worker thread starting");
        let mut keepalive = Repeater::every(KEEPALIVE_INTERVAL);

        while connected.load(Ordering::Acquire) {
            match queue.pop(KEEPALIVE_INTERVAL) {
                Some(frame) => {
                    match wire::encode(frame.command, &frame.payload) {
                        Ok(data) => {
                            if stream.write_all(&data).is_err() {
                                warn!("tcp write failed");
                                connected.store(false, Ordering::Release);
                            }
                        }
                        Err(err) => warn!(%err, "failed to encode frame for transmission"),
                    }
                    keepalive.reset();
                }
                None => {
                    if keepalive.fired() && stream.write_all(&HEADER).is_err() {
                        warn!("tcp keepalive failed");
                        connected.store(false, Ordering::Release);
                    }
                }
            }
        }

        debug!("tcp worker thread finished");
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

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
