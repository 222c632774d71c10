//! Background-thread transports that drain a [`frame_queue::FrameQueue`] and
//! push wire-encoded frames out over USB serial, UDP, TCP, or SPI.

mod frame_queue;
mod port;
mod serial_line;
mod spi;
mod tcp;
mod udp;
mod usb;
mod wire;

pub use frame_queue::FrameQueue;
pub use port::Port;
pub use serial_line::SerialLine;
pub use spi::SpiTransport;
pub use tcp::TcpTransport;
pub use udp::UdpTransport;
pub use usb::UsbTransport;
