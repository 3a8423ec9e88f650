use crate::{BridgeError, MstpLink, TransportAdapter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Default number of ports a bridge process will carry.
pub const DEFAULT_CAPACITY: usize = 10;

/// One bridged serial port.
///
/// Every field except `active` is written once at registration, before
/// either relay starts; relays only ever read.
#[derive(Debug)]
pub struct PortSlot<L> {
    index: usize,
    device_name: String,
    short_name: String,
    peer_path: PathBuf,
    active: AtomicBool,
    transport: TransportAdapter<L>,
}

impl<L: MstpLink> PortSlot<L> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// The socket path the external consumer listens on for this port.
    pub fn peer_path(&self) -> &Path {
        &self.peer_path
    }

    /// True while the port is configured and its relays should move
    /// traffic. The receive relay exits when this clears; the transmit
    /// relay drops inbound frames instead.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn transport(&self) -> &TransportAdapter<L> {
        &self.transport
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }
}

/// Append-only table of registered ports.
///
/// Indices are handed out monotonically and never recycled; there is no
/// removal path, only deactivation.
#[derive(Debug)]
pub struct PortRegistry<L> {
    capacity: usize,
    slots: Mutex<Vec<Arc<PortSlot<L>>>>,
}

impl<L: MstpLink> PortRegistry<L> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Mutex::new(Vec::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().unwrap().is_empty()
    }

    /// Allocates the next slot. The new slot starts inactive; the caller
    /// flips it after the transport is configured.
    pub fn register(
        &self,
        device_name: &str,
        short_name: &str,
        peer_path: PathBuf,
        transport: TransportAdapter<L>,
    ) -> Result<Arc<PortSlot<L>>, BridgeError> {
        let mut slots = self.slots.lock().unwrap();
        if slots.len() >= self.capacity {
            return Err(BridgeError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let slot = Arc::new(PortSlot {
            index: slots.len(),
            device_name: device_name.to_string(),
            short_name: short_name.to_string(),
            peer_path,
            active: AtomicBool::new(false),
            transport,
        });
        slots.push(slot.clone());
        Ok(slot)
    }

    pub fn lookup(&self, index: usize) -> Result<Arc<PortSlot<L>>, BridgeError> {
        self.slots
            .lock()
            .unwrap()
            .get(index)
            .cloned()
            .ok_or(BridgeError::InvalidIndex(index))
    }

    pub fn find(&self, device_name: &str) -> Option<Arc<PortSlot<L>>> {
        self.slots
            .lock()
            .unwrap()
            .iter()
            .find(|slot| slot.device_name == device_name)
            .cloned()
    }

    pub fn snapshot(&self) -> Vec<Arc<PortSlot<L>>> {
        self.slots.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{PortRegistry, DEFAULT_CAPACITY};
    use crate::simulator::SimulatedLink;
    use crate::{BridgeError, TransportAdapter};
    use std::path::PathBuf;

    fn registry(capacity: usize) -> PortRegistry<SimulatedLink> {
        PortRegistry::with_capacity(capacity)
    }

    fn register(reg: &PortRegistry<SimulatedLink>, device: &str) -> Result<usize, BridgeError> {
        let (link, _segment) = SimulatedLink::new();
        let short = device.rsplit('/').next().unwrap();
        reg.register(
            device,
            short,
            PathBuf::from(format!("/tmp/mstp{short}")),
            TransportAdapter::new(link),
        )
        .map(|slot| slot.index())
    }

    #[test]
    fn indices_are_monotonic() {
        let reg = registry(DEFAULT_CAPACITY);
        assert_eq!(register(&reg, "/dev/ttyS0").unwrap(), 0);
        assert_eq!(register(&reg, "/dev/ttyS1").unwrap(), 1);
        assert_eq!(register(&reg, "/dev/ttyS2").unwrap(), 2);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn register_rejects_when_full() {
        let reg = registry(2);
        register(&reg, "/dev/ttyS0").unwrap();
        register(&reg, "/dev/ttyS1").unwrap();
        let err = register(&reg, "/dev/ttyS2").unwrap_err();
        assert!(matches!(err, BridgeError::CapacityExceeded { capacity: 2 }));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn lookup_rejects_unknown_index() {
        let reg = registry(DEFAULT_CAPACITY);
        assert!(matches!(reg.lookup(0), Err(BridgeError::InvalidIndex(0))));

        register(&reg, "/dev/ttyS0").unwrap();
        assert_eq!(reg.lookup(0).unwrap().device_name(), "/dev/ttyS0");
    }

    #[test]
    fn find_matches_device_name() {
        let reg = registry(DEFAULT_CAPACITY);
        register(&reg, "/dev/ttyS0").unwrap();
        assert!(reg.find("/dev/ttyS0").is_some());
        assert!(reg.find("/dev/ttyS1").is_none());
    }

    #[test]
    fn new_slots_start_inactive() {
        let reg = registry(DEFAULT_CAPACITY);
        register(&reg, "/dev/ttyS0").unwrap();
        let slot = reg.lookup(0).unwrap();
        assert!(!slot.is_active());
        slot.set_active(true);
        assert!(slot.is_active());
    }
}
