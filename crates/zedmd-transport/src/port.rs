use zedmd_protocol::ZedmdError;

/// The byte-oriented operations the USB handshake and send loop need from a
/// serial link. [`crate::serial_line::SerialLine`] implements this over a
/// real OS serial port; tests implement it over an in-memory duplex pipe to
/// stand in for the mock serial port described alongside the protocol.
pub trait Port: Send {
    /// Toggles DTR/RTS to reset the device (spec: two 200ms pulses).
    fn reset(&mut self);

    /// Discards any bytes currently buffered without blocking.
    fn drain_available(&mut self);

    /// Reads one byte, or `0` on a read timeout.
    fn read_byte(&mut self) -> u8;

    /// Fills `buf` entirely, or returns `false` on timeout/error.
    fn read_exact(&mut self, buf: &mut [u8]) -> bool;

    fn write_all(&mut self, data: &[u8]) -> Result<(), ZedmdError>;
}
