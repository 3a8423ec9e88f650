//! Bridges BACnet MS/TP serial ports onto local Unix datagram sockets.
//!
//! `mstp-bridge` multiplexes MS/TP traffic between an RS-485 data-link
//! engine and a per-process Unix-domain datagram endpoint, so an external
//! consumer can exchange NPDUs without linking against the serial driver.
//! Every datagram carries a one-byte station address in front of the
//! payload: the destination on the way to the wire (`0xFF` = broadcast),
//! the source on the way back. The consumer listens on a per-device peer
//! socket whose path is derived from the device basename, so many ports
//! multiplex through file-system naming rather than a handshake.
//!
//! The data-link engine itself is consumed through the [`MstpLink`] trait;
//! [`SimulatedLink`] is an in-memory implementation for tests and tooling.
//!
//! # Feature flags
//!
//! - **`serde`** — derives `Serialize`/`Deserialize` on parameter and
//!   stats types.

#![allow(async_fn_in_trait)]

pub mod address;
pub mod bridge;
pub mod endpoint;
pub mod error;
pub mod params;
pub mod registry;
mod relay;
pub mod simulator;
pub mod traits;
pub mod transport;

pub use address::MstpAddress;
pub use bridge::{MstpBridge, PortStats};
pub use endpoint::BridgeEndpoint;
pub use error::BridgeError;
pub use params::{ParamsError, PortParams};
pub use registry::{PortRegistry, PortSlot, DEFAULT_CAPACITY};
pub use simulator::{SegmentHandle, SimulatedLink};
pub use traits::{LinkError, LinkStats, MstpLink, MAX_PDU};
pub use transport::TransportAdapter;
