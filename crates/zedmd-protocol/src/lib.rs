//! Wire-level data model and pure frame-preparation logic for the ZeDMD
//! pinball dot-matrix display protocol: command codes, the frame and
//! stream-id types, zone diffing, bit-plane splitting, scaling, DEFLATE
//! framing, and the device settings surface. No I/O lives here; transports
//! live in `zedmd-transport`.

pub mod bitplane;
pub mod color;
pub mod command;
pub mod compress;
pub mod error;
pub mod frame;
pub mod framer;
pub mod scale;
pub mod settings;
pub mod zone;

pub use color::rgb565_to_rgb888;
pub use command::Command;
pub use error::ZedmdError;
pub use frame::{Frame, StreamId};
pub use framer::Framer;
pub use settings::{DeviceSettings, PanelDriver, RgbOrder, TransportKind};
pub use zone::ZoneDiffer;
