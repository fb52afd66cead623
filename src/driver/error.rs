// Thu Feb 19 2026 - Alex

use crate::memory::{Address, MemoryError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Timed out waiting for a response for address {0}")]
    Timeout(Address),
    #[error("Peer reported an error for {command} at {address}")]
    PeerError { command: String, address: Address },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Connection closed by peer")]
    ConnectionClosed,
    #[error("Driver is not connected")]
    NotConnected,
    #[error("Setup failed: {0}")]
    Setup(String),
    #[error("Shared memory error: {0}")]
    SharedMemory(String),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl DriverError {
    /// Errors that only affect a single read and say nothing about the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DriverError::Timeout(_) | DriverError::PeerError { .. } | DriverError::MalformedResponse(_)
        )
    }
}
