//! Exercises the USB handshake and send loop against an in-memory mock
//! [`Port`], standing in for the mock serial device described alongside the
//! protocol since no real hardware is available in CI.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use zedmd_protocol::{Command, Frame, ZedmdError, command::HEADER};
use zedmd_transport::{Port, UsbTransport};

/// A duplex byte pipe: `inbound` is drained by `read_byte`/`read_exact`
/// (pre-loaded by the test with the bytes the mock device "sends"),
/// `outbound` accumulates everything the transport writes so the test can
/// assert on it afterwards.
#[derive(Clone)]
struct MockPort {
    inbound: Arc<Mutex<VecDeque<u8>>>,
    outbound: Arc<Mutex<Vec<u8>>>,
}

impl MockPort {
    fn new() -> Self {
        Self { inbound: Arc::new(Mutex::new(VecDeque::new())), outbound: Arc::new(Mutex::new(Vec::new())) }
    }

    fn push_inbound(&self, bytes: &[u8]) {
        self.inbound.lock().unwrap().extend(bytes.iter().copied());
    }
}

impl Port for MockPort {
    fn reset(&mut self) {}

    fn drain_available(&mut self) {
        self.inbound.lock().unwrap().clear();
    }

    fn read_byte(&mut self) -> u8 {
        self.inbound.lock().unwrap().pop_front().unwrap_or(0)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> bool {
        let mut inbound = self.inbound.lock().unwrap();
        if inbound.len() < buf.len() {
            return false;
        }
        for slot in buf.iter_mut() {
            *slot = inbound.pop_front().unwrap();
        }
        true
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), ZedmdError> {
        self.outbound.lock().unwrap().extend_from_slice(data);
        Ok(())
    }
}

/// Scripts the full handshake: frame-size reply (128x32), the `R` ready
/// byte, then `A`/`R` for each of compression, chunking, and flow control.
fn script_handshake(port: &MockPort, width: u16, height: u16) {
    let mut frame_size_reply = HEADER.to_vec();
    frame_size_reply.truncate(4);
    frame_size_reply.push((width & 0xff) as u8);
    frame_size_reply.push((width >> 8) as u8);
    frame_size_reply.push((height & 0xff) as u8);
    frame_size_reply.push((height >> 8) as u8);
    port.push_inbound(&frame_size_reply);
    port.push_inbound(b"R");

    port.push_inbound(b"A");
    port.push_inbound(b"R");

    port.push_inbound(b"A");
    port.push_inbound(b"R");

    port.push_inbound(b"A");
}

#[test]
fn handshake_reports_width_height_and_zone_geometry() {
    let port = MockPort::new();
    script_handshake(&port, 128, 32);

    let transport = UsbTransport::open_with_port(port, None).expect("handshake should succeed");

    assert_eq!(transport.width(), 128);
    assert_eq!(transport.height(), 32);
    assert_eq!(transport.zone_width(), 8);
    assert_eq!(transport.zone_height(), 4);
    assert!(transport.is_connected());
}

#[test]
fn handshake_fails_on_bad_header() {
    let port = MockPort::new();
    port.push_inbound(&[0, 0, 0, 0, 128, 0, 32, 0]);
    port.push_inbound(b"R");

    let err = UsbTransport::open_with_port(port, None).unwrap_err();
    assert!(matches!(err, ZedmdError::WireProtocolViolation { .. }));
}

#[test]
fn command_only_frame_is_streamed_after_handshake() {
    let port = MockPort::new();
    script_handshake(&port, 128, 32);
    let outbound = port.outbound.clone();

    // fc starts at 1 after the handshake: one ready byte, one ack per chunk.
    port.push_inbound(&[1]);
    port.push_inbound(b"A");

    let transport = UsbTransport::open_with_port(port, None).expect("handshake should succeed");
    let baseline = outbound.lock().unwrap().len();
    transport.queue().push(Frame::command_only(Command::ClearScreen));

    let expected = {
        let mut out = HEADER.to_vec();
        out.push(Command::ClearScreen as u8);
        out
    };

    wait_for(|| outbound.lock().unwrap().len() >= baseline + expected.len());
    assert_eq!(&outbound.lock().unwrap()[baseline..], expected.as_slice());
}

#[test]
fn command_sized_frame_is_retried_once_on_failed_ack() {
    let port = MockPort::new();
    script_handshake(&port, 128, 32);
    let outbound = port.outbound.clone();

    // First attempt: ready (fc=1), then a garbage ack (neither fc nor 'A') -> failure.
    // `fc` advances to 2 even on failure, so the retry's ready byte must be 2.
    port.push_inbound(&[1]);
    port.push_inbound(&[0xff]);
    port.push_inbound(&[2]);
    port.push_inbound(b"A");

    let transport = UsbTransport::open_with_port(port, None).expect("handshake should succeed");
    let baseline = outbound.lock().unwrap().len();
    transport.queue().push(Frame::command_only(Command::Reset));

    let one_copy = {
        let mut out = HEADER.to_vec();
        out.push(Command::Reset as u8);
        out
    };
    let two_copies: Vec<u8> = one_copy.iter().chain(one_copy.iter()).copied().collect();

    wait_for(|| outbound.lock().unwrap().len() >= baseline + two_copies.len());
    assert_eq!(&outbound.lock().unwrap()[baseline..], two_copies.as_slice());
    assert!(transport.is_connected());
}

fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("condition not met within timeout");
}
