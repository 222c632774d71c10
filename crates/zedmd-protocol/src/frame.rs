use crate::command::Command;

/// Position of a zone-streamed frame within its 64-wide generation, or
/// [`StreamId::NONE`] for a frame that isn't part of zone streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamId(i8);

impl StreamId {
    pub const NONE: Self = Self(-1);

    #[must_use]
    pub fn new(v: i8) -> Self {
        Self(v)
    }

    #[must_use]
    pub fn get(self) -> i8 {
        self.0
    }

    #[must_use]
    pub fn is_none(self) -> bool {
        self.0 < 0
    }

    /// Advance to the next id in `0..=64`, wrapping back to `0` once it
    /// would exceed `64`.
    #[must_use]
    pub fn next(self) -> Self {
        if self.is_none() {
            Self(0)
        } else if self.0 >= 64 {
            Self(0)
        } else {
            Self(self.0 + 1)
        }
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::NONE
    }
}

/// A single unit of work handed to a transport's background worker: a
/// command byte, an optional payload, and (for zone-streamed frames) the
/// generation id the payload belongs to.
#[derive(Debug, Clone)]
pub struct Frame {
    pub command: Command,
    pub payload: Vec<u8>,
    pub stream_id: StreamId,
}

impl Frame {
    #[must_use]
    pub fn new(command: Command, payload: Vec<u8>) -> Self {
        Self { command, payload, stream_id: StreamId::NONE }
    }

    #[must_use]
    pub fn streamed(command: Command, payload: Vec<u8>, stream_id: StreamId) -> Self {
        Self { command, payload, stream_id }
    }

    #[must_use]
    pub fn command_only(command: Command) -> Self {
        Self { command, payload: Vec::new(), stream_id: StreamId::NONE }
    }

    #[must_use]
    pub fn is_command_sized(&self) -> bool {
        self.command.is_command_sized(self.payload.len())
    }
}
