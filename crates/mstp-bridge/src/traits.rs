use crate::{MstpAddress, PortParams};
use std::time::Duration;
use thiserror::Error;

/// Largest NPDU an MS/TP frame can carry.
pub const MAX_PDU: usize = 501;

/// Errors that can occur at the MS/TP data-link layer.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("link initialization failed: {0}")]
    InitFailed(String),
    #[error("frame too large")]
    FrameTooLarge,
    #[error("link closed")]
    Closed,
}

/// Counters maintained by the data-link engine for one port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkStats {
    pub tokens_received: u64,
    pub receive_errors: u64,
    pub invalid_frames: u64,
    pub bytes_transmitted: u64,
    pub bytes_received: u64,
}

/// Async trait for an MS/TP data-link engine driving one serial port.
///
/// The engine owns token passing, frame validation, and the baud/timing
/// state machine; the bridge only moves NPDUs across this boundary.
/// Implementors include [`SimulatedLink`](crate::SimulatedLink) for tests
/// and tooling.
pub trait MstpLink: Send + Sync {
    /// Applies station parameters and opens the named serial device.
    /// One-shot; called once per port before any traffic moves.
    async fn configure(&self, device: &str, params: &PortParams) -> Result<(), LinkError>;

    /// Waits up to `timeout` for a frame addressed to this station.
    ///
    /// Returns `Ok(Some((len, source_mac)))` with the NPDU copied into
    /// `buf`, or `Ok(None)` when the timeout elapses with no traffic.
    async fn receive(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<(usize, u8)>, LinkError>;

    /// Queues `payload` for transmission to `destination`. Best-effort;
    /// the engine acquires the token and transmits when it can.
    async fn send(&self, destination: MstpAddress, payload: &[u8]) -> Result<(), LinkError>;

    /// The data-link broadcast address.
    fn broadcast_address(&self) -> MstpAddress {
        MstpAddress::Broadcast
    }

    fn stats(&self) -> LinkStats;

    /// Releases the serial device and engine state. Idempotent.
    async fn shutdown(&self);
}
