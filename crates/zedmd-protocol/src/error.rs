#[derive(Debug, thiserror::Error)]
pub enum ZedmdError {
    #[error("transport unavailable")]
    TransportUnavailable,

    #[error("timed out waiting for a response on the wire")]
    WireTimeout,

    #[error("wire protocol violation: expected byte {expected:#04x}, got {got:#04x}")]
    WireProtocolViolation { expected: u8, got: u8 },

    #[error("compression error: {0}")]
    CompressionError(String),

    #[error("platform does not support this transport: {0}")]
    PlatformUnsupported(&'static str),
}
