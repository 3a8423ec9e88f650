//! Lightweight simulated MS/TP data-link.
//!
//! [`SimulatedLink`] stands in for a real serial engine: frames "on the
//! wire" are injected and captured through a [`SegmentHandle`]. Useful for
//! testing and development without RS-485 hardware.

use crate::{LinkError, LinkStats, MstpAddress, MstpLink, PortParams, MAX_PDU};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// A simulated MS/TP data-link engine for one port.
#[derive(Debug)]
pub struct SimulatedLink {
    incoming: Mutex<mpsc::UnboundedReceiver<(u8, Vec<u8>)>>,
    outgoing: mpsc::UnboundedSender<(MstpAddress, Vec<u8>)>,
    configured: std::sync::Mutex<Option<(String, PortParams)>>,
    fail_configure: Arc<AtomicBool>,
    shut_down: Arc<AtomicBool>,
    tokens_received: AtomicU64,
    invalid_frames: AtomicU64,
    bytes_transmitted: AtomicU64,
    bytes_received: AtomicU64,
}

/// The far side of a [`SimulatedLink`]: the wire segment.
#[derive(Debug)]
pub struct SegmentHandle {
    inject_tx: mpsc::UnboundedSender<(u8, Vec<u8>)>,
    sent_rx: mpsc::UnboundedReceiver<(MstpAddress, Vec<u8>)>,
    fail_configure: Arc<AtomicBool>,
    shut_down: Arc<AtomicBool>,
}

impl SegmentHandle {
    /// Puts a frame from station `source` on the wire, to be picked up by
    /// the link's next receive call.
    pub fn inject(&self, source: u8, payload: &[u8]) {
        let _ = self.inject_tx.send((source, payload.to_vec()));
    }

    /// Waits for the next frame the link transmitted.
    pub async fn next_sent(&mut self) -> Option<(MstpAddress, Vec<u8>)> {
        self.sent_rx.recv().await
    }

    /// Makes the link's `configure` fail (or succeed again), simulating a
    /// serial device the engine cannot open.
    pub fn set_configure_failure(&self, fail: bool) {
        self.fail_configure.store(fail, Ordering::Release);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl SimulatedLink {
    pub fn new() -> (Self, SegmentHandle) {
        Self::build(false)
    }

    /// A link whose `configure` always fails, for exercising degraded
    /// registration paths.
    pub fn failing() -> (Self, SegmentHandle) {
        Self::build(true)
    }

    fn build(fail: bool) -> (Self, SegmentHandle) {
        let (inject_tx, incoming) = mpsc::unbounded_channel();
        let (outgoing, sent_rx) = mpsc::unbounded_channel();
        let fail_configure = Arc::new(AtomicBool::new(fail));
        let shut_down = Arc::new(AtomicBool::new(false));
        let link = Self {
            incoming: Mutex::new(incoming),
            outgoing,
            configured: std::sync::Mutex::new(None),
            fail_configure: fail_configure.clone(),
            shut_down: shut_down.clone(),
            tokens_received: AtomicU64::new(0),
            invalid_frames: AtomicU64::new(0),
            bytes_transmitted: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        };
        let segment = SegmentHandle {
            inject_tx,
            sent_rx,
            fail_configure,
            shut_down,
        };
        (link, segment)
    }

    /// The device name and parameters from the last successful configure.
    pub fn configured(&self) -> Option<(String, PortParams)> {
        self.configured.lock().unwrap().clone()
    }
}

impl MstpLink for SimulatedLink {
    async fn configure(&self, device: &str, params: &PortParams) -> Result<(), LinkError> {
        if self.fail_configure.load(Ordering::Acquire) {
            return Err(LinkError::InitFailed(format!(
                "simulated init failure for {device}"
            )));
        }
        *self.configured.lock().unwrap() = Some((device.to_string(), *params));
        Ok(())
    }

    async fn receive(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<(usize, u8)>, LinkError> {
        if self.shut_down.load(Ordering::Acquire) {
            tokio::time::sleep(timeout).await;
            return Ok(None);
        }
        let mut incoming = self.incoming.lock().await;
        match tokio::time::timeout(timeout, incoming.recv()).await {
            Err(_) => Ok(None),
            Ok(None) => {
                // Segment handle dropped; behave like a quiet line.
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
            Ok(Some((source, payload))) => {
                if payload.len() > buf.len() {
                    self.invalid_frames.fetch_add(1, Ordering::Relaxed);
                    return Err(LinkError::FrameTooLarge);
                }
                buf[..payload.len()].copy_from_slice(&payload);
                self.tokens_received.fetch_add(1, Ordering::Relaxed);
                self.bytes_received
                    .fetch_add(payload.len() as u64, Ordering::Relaxed);
                Ok(Some((payload.len(), source)))
            }
        }
    }

    async fn send(&self, destination: MstpAddress, payload: &[u8]) -> Result<(), LinkError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(LinkError::Closed);
        }
        if payload.len() > MAX_PDU {
            return Err(LinkError::FrameTooLarge);
        }
        self.outgoing
            .send((destination, payload.to_vec()))
            .map_err(|_| LinkError::Closed)?;
        self.bytes_transmitted
            .fetch_add(payload.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn stats(&self) -> LinkStats {
        LinkStats {
            tokens_received: self.tokens_received.load(Ordering::Relaxed),
            receive_errors: 0,
            invalid_frames: self.invalid_frames.load(Ordering::Relaxed),
            bytes_transmitted: self.bytes_transmitted.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
    }
}
