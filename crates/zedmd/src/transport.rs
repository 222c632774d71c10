use tracing::warn;
use zedmd_protocol::{
    Frame,
    zone::{udp_zone_bytes_limit, usb_zone_bytes_limit},
};
use zedmd_transport::{SpiTransport, TcpTransport, UdpTransport, UsbTransport};

/// A UDP datagram's practical payload budget, comfortably under a
/// conservative 1500-byte Ethernet MTU once IP/UDP headers are subtracted
/// (spec §4.4).
const UDP_MTU_BUDGET: usize = 1460;

/// Unifies the four wire transports behind one dispatch surface. USB, UDP
/// and TCP hand frames to a background worker via a shared [`FrameQueue`];
/// SPI has no flow-control ack loop and no worker thread (spec.md §4.6), so
/// frames are written synchronously from the caller thread instead.
///
/// [`FrameQueue`]: zedmd_transport::FrameQueue
pub(crate) enum Transport {
    Usb(UsbTransport),
    Udp(UdpTransport),
    Tcp(TcpTransport),
    Spi(SpiTransport),
}

impl Transport {
    /// Enqueues a standalone (non-streamed) frame, or — for SPI, which has
    /// no queue — sends it immediately.
    pub(crate) fn enqueue(&mut self, frame: Frame) {
        match self {
            Self::Usb(t) => t.queue().push(frame),
            Self::Udp(t) => t.queue().push(frame),
            Self::Tcp(t) => t.queue().push(frame),
            Self::Spi(t) => Self::send_spi(t, &frame),
        }
    }

    /// Starts staging a fresh delayed zone-streaming generation, discarding
    /// whatever a previous one left pending. Must be called once before the
    /// first [`Self::enqueue_delayed_streamed`] for a generation. SPI has no
    /// staging area, so this is a no-op there.
    pub(crate) fn begin_delayed_streamed(&self) {
        match self {
            Self::Usb(t) => t.queue().begin_delayed_streamed(),
            Self::Udp(t) => t.queue().begin_delayed_streamed(),
            Self::Tcp(t) => t.queue().begin_delayed_streamed(),
            Self::Spi(_) => {}
        }
    }

    /// Stages a zone-streamed frame belonging to a delayed generation. SPI
    /// has no staging area to speak of; each zone chunk is written straight
    /// through, matching its "only `ClearScreen` matters" contract anyway.
    pub(crate) fn enqueue_delayed_streamed(&mut self, frame: Frame) {
        match self {
            Self::Usb(t) => t.queue().push_delayed_streamed(frame),
            Self::Udp(t) => t.queue().push_delayed_streamed(frame),
            Self::Tcp(t) => t.queue().push_delayed_streamed(frame),
            Self::Spi(t) => Self::send_spi(t, &frame),
        }
    }

    pub(crate) fn mark_delayed_ready(&self) {
        match self {
            Self::Usb(t) => t.queue().mark_delayed_ready(),
            Self::Udp(t) => t.queue().mark_delayed_ready(),
            Self::Tcp(t) => t.queue().mark_delayed_ready(),
            Self::Spi(_) => {}
        }
    }

    #[must_use]
    pub(crate) fn is_connected(&self) -> bool {
        match self {
            Self::Usb(t) => t.is_connected(),
            Self::Udp(t) => t.is_connected(),
            Self::Tcp(t) => t.is_connected(),
            // SPI is a plain fd write with no background health check.
            Self::Spi(_) => true,
        }
    }

    fn send_spi(transport: &mut SpiTransport, frame: &Frame) {
        if let Err(err) = transport.send(frame) {
            warn!(%err, "spi send failed");
        }
    }

    /// True when the next zone-streaming generation should be staged as
    /// delayed rather than queued directly (spec §4.7.4). SPI has no queue
    /// and so never delays.
    #[must_use]
    pub(crate) fn should_delay(&self) -> bool {
        match self {
            Self::Usb(t) => t.queue().should_delay_next_generation(),
            Self::Udp(t) => t.queue().should_delay_next_generation(),
            Self::Tcp(t) => t.queue().should_delay_next_generation(),
            Self::Spi(_) => false,
        }
    }

    /// The zone byte budget this transport's link should chunk streamed
    /// zones to (spec §4.7.3). USB and SPI share the serial-link formula
    /// (a configurable package size rounded to a whole number of zones, or
    /// one display row's worth by default); UDP instead fits as many whole
    /// zones as possible into one datagram's MTU budget; TCP, being an
    /// ordered byte stream with no datagram ceiling, uses the same
    /// row-sized default as USB.
    #[must_use]
    pub(crate) fn zone_bytes_limit(
        &self,
        zone_width: u8,
        zone_height: u8,
        width: u16,
        usb_package_size: Option<u16>,
    ) -> usize {
        match self {
            Self::Usb(_) | Self::Spi(_) => {
                usb_zone_bytes_limit(zone_width, zone_height, width, usb_package_size)
            }
            Self::Tcp(_) => usb_zone_bytes_limit(zone_width, zone_height, width, None),
            Self::Udp(_) => udp_zone_bytes_limit(zone_width, zone_height, UDP_MTU_BUDGET),
        }
    }
}
