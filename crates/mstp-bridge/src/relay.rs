use crate::endpoint::BridgeEndpoint;
use crate::registry::PortSlot;
use crate::{MstpLink, MAX_PDU};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How long one transport receive call blocks before the relay rechecks
/// whether the port is still active.
pub(crate) const RECEIVE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Moves frames from the serial transport to the channel endpoint.
///
/// Emits exactly one channel frame per received NPDU: the source station
/// octet followed by the payload. Runs until the port is deactivated or
/// the bridge stops.
pub(crate) async fn run_receive_relay<L: MstpLink>(
    slot: Arc<PortSlot<L>>,
    endpoint: Arc<BridgeEndpoint>,
    mut stop: watch::Receiver<bool>,
) {
    let mut pdu = vec![0u8; MAX_PDU];
    let mut frame = vec![0u8; MAX_PDU + 1];
    log::debug!("receive relay started for {}", slot.device_name());

    while slot.is_active() && !*stop.borrow() {
        let received = tokio::select! {
            _ = stop.changed() => continue,
            received = slot.transport().receive(&mut pdu, RECEIVE_TIMEOUT) => received,
        };
        match received {
            Ok(Some((len, source))) if len > 0 => {
                frame[0] = source;
                frame[1..=len].copy_from_slice(&pdu[..len]);
                if let Err(err) = endpoint.send_to(&frame[..len + 1], slot.peer_path()).await {
                    log::warn!("{}: channel send failed: {err}", slot.short_name());
                }
            }
            Ok(_) => {} // quiet line
            Err(err) => log::warn!("{}: transport receive failed: {err}", slot.short_name()),
        }
    }
    log::info!("receive relay exited for {}", slot.device_name());
}

/// Moves frames from the channel endpoint to the serial transport.
///
/// Started before the port is configured and not gated on the active
/// flag: frames that arrive while the port is inactive are dropped, so a
/// degraded port drains its peers instead of wedging them. Runs until the
/// bridge stops.
pub(crate) async fn run_transmit_relay<L: MstpLink>(
    slot: Arc<PortSlot<L>>,
    endpoint: Arc<BridgeEndpoint>,
    mut stop: watch::Receiver<bool>,
) {
    let mut frame = vec![0u8; MAX_PDU + 1];
    log::debug!("transmit relay started for {}", slot.device_name());

    while !*stop.borrow() {
        let received = tokio::select! {
            _ = stop.changed() => continue,
            received = endpoint.recv_from(&mut frame) => received,
        };
        let len = match received {
            Ok(len) => len,
            Err(err) => {
                log::warn!("{}: channel receive failed: {err}", slot.short_name());
                continue;
            }
        };
        if len == 0 {
            continue;
        }
        if !slot.is_active() {
            log::warn!("{}: dropping frame for inactive port", slot.short_name());
            continue;
        }

        let destination = slot.transport().resolve_destination(frame[0]);
        if let Err(err) = slot.transport().send(destination, &frame[1..len]).await {
            log::debug!("{}: transport send failed: {err}", slot.short_name());
        }
    }
    log::info!("transmit relay exited for {}", slot.device_name());
}
