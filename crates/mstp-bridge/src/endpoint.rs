use crate::BridgeError;
use std::io;
use std::path::{Path, PathBuf};
use tokio::net::UnixDatagram;

/// File name of the shared bridge socket inside the base directory.
pub const ENDPOINT_NAME: &str = "mstp-server";

/// Prefix of the per-device peer socket path inside the base directory.
pub const PEER_PREFIX: &str = "mstp";

/// Basename of a serial device path, used in peer socket names.
pub fn short_device_name(device: &str) -> &str {
    Path::new(device)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(device)
}

/// Peer socket path the external consumer binds for one device.
///
/// Derived deterministically from the device basename, so the consumer can
/// compute it without asking the bridge.
pub fn peer_path(base_dir: &Path, short_name: &str) -> PathBuf {
    base_dir.join(format!("{PEER_PREFIX}{short_name}"))
}

/// The process-wide datagram socket all port relays share.
///
/// Frames are exchanged with one peer socket per device; the leading byte
/// of every datagram is an MS/TP station address.
#[derive(Debug)]
pub struct BridgeEndpoint {
    socket: UnixDatagram,
    local_path: PathBuf,
}

impl BridgeEndpoint {
    /// Binds the endpoint, removing any stale socket left at `path` by a
    /// previous run. A missing artifact is not an error; any other removal
    /// failure is.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => log::debug!("removed stale endpoint at {}", path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(BridgeError::StaleEndpoint {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
        Self::bind_exclusive(path)
    }

    fn bind_exclusive(path: &Path) -> Result<Self, BridgeError> {
        let socket = UnixDatagram::bind(path).map_err(|source| BridgeError::BindFailed {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("channel endpoint bound at {}", path.display());
        Ok(Self {
            socket,
            local_path: path.to_path_buf(),
        })
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub async fn send_to(&self, frame: &[u8], peer: &Path) -> io::Result<usize> {
        self.socket.send_to(frame, peer).await
    }

    pub async fn recv_from(&self, buf: &mut [u8]) -> io::Result<usize> {
        let (len, _peer) = self.socket.recv_from(buf).await?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::{peer_path, short_device_name, BridgeEndpoint};
    use crate::BridgeError;
    use std::path::Path;
    use tokio::net::UnixDatagram;
    use tokio::time::{timeout, Duration};

    #[test]
    fn short_name_strips_device_directory() {
        assert_eq!(short_device_name("/dev/ttyS0"), "ttyS0");
        assert_eq!(short_device_name("ttyUSB1"), "ttyUSB1");
    }

    #[test]
    fn peer_path_uses_prefix_and_basename() {
        assert_eq!(
            peer_path(Path::new("/var/tmp/bac"), "ttyS0"),
            Path::new("/var/tmp/bac/mstpttyS0")
        );
    }

    #[tokio::test]
    async fn bind_replaces_stale_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mstp-server");
        std::fs::write(&path, b"stale").unwrap();

        let endpoint = BridgeEndpoint::bind(&path).unwrap();
        assert_eq!(endpoint.local_path(), path);
    }

    #[tokio::test]
    async fn second_bind_without_removal_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mstp-server");

        let _first = BridgeEndpoint::bind_exclusive(&path).unwrap();
        let err = BridgeEndpoint::bind_exclusive(&path).unwrap_err();
        assert!(matches!(err, BridgeError::BindFailed { .. }));
    }

    #[tokio::test]
    async fn bind_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("mstp-server");
        let err = BridgeEndpoint::bind(&path).unwrap_err();
        assert!(matches!(err, BridgeError::BindFailed { .. }));
    }

    #[tokio::test]
    async fn frames_round_trip_to_peer() {
        let dir = tempfile::tempdir().unwrap();
        let server = BridgeEndpoint::bind(dir.path().join("mstp-server")).unwrap();
        let peer_path = dir.path().join("mstpttyS0");
        let peer = UnixDatagram::bind(&peer_path).unwrap();

        server.send_to(&[0x03, 0xAA], &peer_path).await.unwrap();
        let mut buf = [0u8; 8];
        let (len, _) = timeout(Duration::from_secs(1), peer.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..len], &[0x03, 0xAA]);

        peer.send_to(&[0xFF, 0x01], server.local_path())
            .await
            .unwrap();
        let mut frame = [0u8; 8];
        let len = timeout(Duration::from_secs(1), server.recv_from(&mut frame))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&frame[..len], &[0xFF, 0x01]);
    }
}
