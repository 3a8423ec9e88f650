use crate::endpoint::{self, BridgeEndpoint, ENDPOINT_NAME};
use crate::registry::{PortRegistry, PortSlot};
use crate::relay::{run_receive_relay, run_transmit_relay};
use crate::{BridgeError, LinkStats, MstpLink, PortParams, TransportAdapter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Read-only counters for one active port.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortStats {
    pub device_name: String,
    pub link: LinkStats,
}

/// Bridges MS/TP serial ports onto a shared Unix datagram endpoint.
///
/// One bridge per process. Each registered port gets a pair of relay
/// tasks: one republishing received NPDUs to the port's peer socket with
/// a source-address prefix, one forwarding addressed frames from the
/// shared endpoint back to the serial transport.
#[derive(Debug)]
pub struct MstpBridge<L> {
    base_dir: PathBuf,
    endpoint: Arc<BridgeEndpoint>,
    registry: PortRegistry<L>,
    stop_tx: watch::Sender<bool>,
    relay_threads: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl<L: MstpLink + 'static> MstpBridge<L> {
    /// Validates `base_dir`, then binds the shared channel endpoint at
    /// `<base_dir>/mstp-server`. Must be called from within a Tokio
    /// runtime.
    pub fn open(base_dir: impl AsRef<Path>, capacity: usize) -> Result<Self, BridgeError> {
        let base_dir = base_dir.as_ref();
        let is_dir = std::fs::metadata(base_dir)
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(BridgeError::InvalidDirectory {
                path: base_dir.to_path_buf(),
            });
        }
        let base_dir = base_dir.canonicalize()?;
        let endpoint = BridgeEndpoint::bind(base_dir.join(ENDPOINT_NAME))?;
        let (stop_tx, _) = watch::channel(false);

        Ok(Self {
            base_dir,
            endpoint: Arc::new(endpoint),
            registry: PortRegistry::with_capacity(capacity),
            stop_tx,
            relay_threads: Mutex::new(Vec::new()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the shared endpoint the external consumer sends to.
    pub fn endpoint_path(&self) -> &Path {
        self.endpoint.local_path()
    }

    pub fn lookup(&self, index: usize) -> Result<Arc<PortSlot<L>>, BridgeError> {
        self.registry.lookup(index)
    }

    /// Registers a serial port and starts its relay pair.
    ///
    /// Idempotent per device: re-registering an active device returns its
    /// existing index untouched, and re-registering a degraded one only
    /// retries transport configuration (the supplied `link` is dropped in
    /// both cases, the slot keeps the transport it was created with).
    ///
    /// A transport that refuses configuration is not an error: the port is
    /// left inactive with its transmit relay draining and dropping frames,
    /// and the failure is logged.
    pub async fn register_port(
        &self,
        device_name: &str,
        params: PortParams,
        link: L,
    ) -> Result<usize, BridgeError> {
        if let Some(slot) = self.registry.find(device_name) {
            if slot.is_active() {
                log::info!("{device_name}: already registered, nothing to do");
                return Ok(slot.index());
            }
            // Degraded slot: its transmit relay is already running, so
            // only configuration is retried.
            drop(link);
            self.activate(&slot, &params).await?;
            return Ok(slot.index());
        }

        log::info!(
            "{device_name}: registering mac={} max_master={} baud={} max_info_frames={}",
            params.mac_address,
            params.max_master,
            params.baud_rate,
            params.max_info_frames
        );

        let short_name = endpoint::short_device_name(device_name).to_string();
        let peer_path = endpoint::peer_path(&self.base_dir, &short_name);
        let slot = self.registry.register(
            device_name,
            &short_name,
            peer_path,
            TransportAdapter::new(link),
        )?;

        self.spawn_transmit_relay(slot.clone())?;
        self.activate(&slot, &params).await?;
        Ok(slot.index())
    }

    /// The registration entry point as the surrounding process calls it:
    /// `buf` is a packed parameter block (see [`PortParams::from_packed`]).
    pub async fn register_port_packed(
        &self,
        buf: &[u8],
        device_name: &str,
        link: L,
    ) -> Result<usize, BridgeError> {
        let params = PortParams::from_packed(buf)?;
        self.register_port(device_name, params, link).await
    }

    async fn activate(
        &self,
        slot: &Arc<PortSlot<L>>,
        params: &PortParams,
    ) -> Result<(), BridgeError> {
        match slot.transport().configure(slot.device_name(), params).await {
            Ok(()) => {
                log::info!(
                    "{}: peer path {}",
                    slot.device_name(),
                    slot.peer_path().display()
                );
                slot.set_active(true);
                if let Err(err) = self.spawn_receive_relay(slot.clone()) {
                    slot.set_active(false);
                    return Err(err);
                }
            }
            Err(err) => {
                log::error!(
                    "{}: transport configuration failed, port left inactive: {err}",
                    slot.device_name()
                );
            }
        }
        Ok(())
    }

    fn spawn_receive_relay(&self, slot: Arc<PortSlot<L>>) -> Result<(), BridgeError> {
        let handle = Handle::current();
        let endpoint = self.endpoint.clone();
        let stop = self.stop_tx.subscribe();
        let join = thread::Builder::new()
            .name(format!("mstp-rx-{}", slot.short_name()))
            .spawn(move || handle.block_on(run_receive_relay(slot, endpoint, stop)))?;
        self.relay_threads.lock().unwrap().push(join);
        Ok(())
    }

    fn spawn_transmit_relay(&self, slot: Arc<PortSlot<L>>) -> Result<(), BridgeError> {
        let handle = Handle::current();
        let endpoint = self.endpoint.clone();
        let stop = self.stop_tx.subscribe();
        let join = thread::Builder::new()
            .name(format!("mstp-tx-{}", slot.short_name()))
            .spawn(move || handle.block_on(run_transmit_relay(slot, endpoint, stop)))?;
        self.relay_threads.lock().unwrap().push(join);
        Ok(())
    }

    /// Takes a port out of service. Its receive relay exits within one
    /// receive-timeout interval; its transmit relay stays up and drops
    /// whatever still arrives.
    pub fn deactivate(&self, index: usize) -> Result<(), BridgeError> {
        let slot = self.registry.lookup(index)?;
        slot.set_active(false);
        log::info!("{}: deactivated", slot.device_name());
        Ok(())
    }

    /// Counters for every active port. Read-only, no side effects.
    pub fn stats(&self) -> Vec<PortStats> {
        self.registry
            .snapshot()
            .into_iter()
            .filter(|slot| slot.is_active())
            .map(|slot| PortStats {
                device_name: slot.device_name().to_string(),
                link: slot.transport().stats(),
            })
            .collect()
    }

    /// Releases every registered transport. Idempotent. Relay tasks and
    /// the channel endpoint are left running; [`stop`](Self::stop) is the
    /// bounded way to end them.
    pub async fn shutdown_all(&self) {
        for slot in self.registry.snapshot() {
            slot.transport().shutdown().await;
        }
    }

    /// Signals every relay to exit and joins their threads. Both
    /// directions race the signal at their blocking points, so shutdown
    /// does not wait out a receive timeout.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
        let threads = std::mem::take(&mut *self.relay_threads.lock().unwrap());
        for join in threads {
            let _ = join.join();
        }
    }
}

impl<L> Drop for MstpBridge<L> {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}
