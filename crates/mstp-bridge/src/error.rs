use crate::ParamsError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{} is not a directory", .path.display())]
    InvalidDirectory { path: PathBuf },
    #[error("failed to remove stale endpoint {}: {source}", .path.display())]
    StaleEndpoint { path: PathBuf, source: io::Error },
    #[error("failed to bind channel endpoint {}: {source}", .path.display())]
    BindFailed { path: PathBuf, source: io::Error },
    #[error("port registry full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },
    #[error("no port registered at index {0}")]
    InvalidIndex(usize),
    #[error("bad port parameters: {0}")]
    Params(#[from] ParamsError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
