use crate::{LinkError, LinkStats, MstpAddress, MstpLink, PortParams};
use std::sync::Mutex;
use std::time::Duration;

/// Owns one port's data-link engine and its configuration.
///
/// Both relay directions call through the adapter; the engine itself is
/// never touched anywhere else.
#[derive(Debug)]
pub struct TransportAdapter<L> {
    link: L,
    configured: Mutex<Option<PortParams>>,
}

impl<L: MstpLink> TransportAdapter<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            configured: Mutex::new(None),
        }
    }

    /// Applies `params` to the engine for `device`. A rejected device is
    /// reported to the caller, which leaves the port degraded rather than
    /// aborting.
    pub async fn configure(&self, device: &str, params: &PortParams) -> Result<(), LinkError> {
        self.link.configure(device, params).await?;
        *self.configured.lock().unwrap() = Some(*params);
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.configured.lock().unwrap().is_some()
    }

    pub fn params(&self) -> Option<PortParams> {
        *self.configured.lock().unwrap()
    }

    /// Waits up to `timeout` for an inbound NPDU; `None` means the line
    /// stayed quiet.
    pub async fn receive(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<(usize, u8)>, LinkError> {
        self.link.receive(buf, timeout).await
    }

    pub async fn send(&self, destination: MstpAddress, payload: &[u8]) -> Result<(), LinkError> {
        self.link.send(destination, payload).await
    }

    /// Maps a wire destination octet to a data-link address, substituting
    /// the engine's broadcast address for the reserved octet.
    pub fn resolve_destination(&self, octet: u8) -> MstpAddress {
        if octet == MstpAddress::BROADCAST_OCTET {
            self.link.broadcast_address()
        } else {
            MstpAddress::Station(octet)
        }
    }

    pub fn stats(&self) -> LinkStats {
        self.link.stats()
    }

    pub async fn shutdown(&self) {
        self.link.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::TransportAdapter;
    use crate::simulator::SimulatedLink;
    use crate::{MstpAddress, PortParams};

    fn params() -> PortParams {
        PortParams {
            mac_address: 5,
            max_master: 127,
            baud_rate: 38400,
            max_info_frames: 1,
        }
    }

    #[tokio::test]
    async fn configure_records_params() {
        let (link, _segment) = SimulatedLink::new();
        let adapter = TransportAdapter::new(link);
        assert!(!adapter.is_configured());

        adapter.configure("/dev/ttyS0", &params()).await.unwrap();
        assert!(adapter.is_configured());
        assert_eq!(adapter.params(), Some(params()));
    }

    #[tokio::test]
    async fn failed_configure_leaves_adapter_unconfigured() {
        let (link, _segment) = SimulatedLink::failing();
        let adapter = TransportAdapter::new(link);
        assert!(adapter.configure("/dev/ttyS0", &params()).await.is_err());
        assert!(!adapter.is_configured());
    }

    #[tokio::test]
    async fn resolves_broadcast_and_station_destinations() {
        let (link, _segment) = SimulatedLink::new();
        let adapter = TransportAdapter::new(link);
        assert_eq!(adapter.resolve_destination(0xFF), MstpAddress::Broadcast);
        assert_eq!(adapter.resolve_destination(0x10), MstpAddress::Station(0x10));
    }
}
