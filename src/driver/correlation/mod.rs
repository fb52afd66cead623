// Fri Feb 20 2026 - Alex

//! Text command/response driver. Every read is a `READ_CORE_MEMORY` datagram
//! whose answer is matched back to the caller by command, address and length.

pub mod responses;
pub mod wire;

use crate::config::CorrelationConfig;
use crate::driver::{Driver, DriverError, MemoryBlock};
use crate::memory::{Address, MemoryRange};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub use responses::ResponseTable;
pub use wire::{Payload, Response, ResponseKey, READ_COMMAND, WRITE_COMMAND};

const RECEIVE_POLL: Duration = Duration::from_millis(50);
const MAX_DATAGRAM: usize = 65_536;

/// One socket plus the receiver thread feeding the response table.
struct Session {
    socket: Arc<UdpSocket>,
    running: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
}

impl Session {
    fn open(peer: &str, responses: Arc<ResponseTable>) -> Result<Self, DriverError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(peer)?;
        socket.set_read_timeout(Some(RECEIVE_POLL))?;
        let socket = Arc::new(socket);
        let running = Arc::new(AtomicBool::new(true));

        let receiver = {
            let socket = Arc::clone(&socket);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("correlation-receiver".to_string())
                .spawn(move || Session::receive_loop(socket, running, responses))?
        };

        debug!("Correlation session opened towards {}", peer);
        Ok(Self {
            socket,
            running,
            receiver: Some(receiver),
        })
    }

    fn receive_loop(socket: Arc<UdpSocket>, running: Arc<AtomicBool>, responses: Arc<ResponseTable>) {
        let mut buffer = vec![0u8; MAX_DATAGRAM];

        while running.load(Ordering::SeqCst) {
            match socket.recv(&mut buffer) {
                Ok(size) => {
                    let text = String::from_utf8_lossy(&buffer[..size]);
                    match wire::parse_response(&text) {
                        Ok(response) => responses.publish(response),
                        Err(e) => warn!("Dropping datagram: {}", e),
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                // A connected UDP socket surfaces ICMP port-unreachable here while the peer is down.
                Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                    trace!("Peer unreachable");
                    thread::sleep(RECEIVE_POLL);
                }
                Err(e) => {
                    warn!("Correlation receiver stopping: {}", e);
                    break;
                }
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.socket.peer_addr().is_ok()
            && self.receiver.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.receiver.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct CorrelationDriver {
    config: CorrelationConfig,
    responses: Arc<ResponseTable>,
    session: Mutex<Option<Session>>,
}

impl CorrelationDriver {
    pub fn new(config: CorrelationConfig) -> Self {
        Self {
            config,
            responses: Arc::new(ResponseTable::new()),
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.session.lock().as_ref().map(Session::is_alive).unwrap_or(false)
    }

    /// Send a datagram, recreating the session first if it has gone away and
    /// once more if the send itself fails.
    fn send(&self, datagram: &str) -> Result<(), DriverError> {
        let mut session = self.session.lock();

        if !session.as_ref().map(Session::is_alive).unwrap_or(false) {
            debug!("Correlation session lost, reopening");
            *session = Some(Session::open(&self.config.peer(), Arc::clone(&self.responses))?);
        }

        let socket = match session.as_ref() {
            Some(s) => Arc::clone(&s.socket),
            None => return Err(DriverError::NotConnected),
        };

        trace!("-> {}", datagram);
        match socket.send(datagram.as_bytes()) {
            Ok(_) => Ok(()),
            Err(e) => {
                debug!("Send failed ({}), reopening session", e);
                let fresh = Session::open(&self.config.peer(), Arc::clone(&self.responses))?;
                fresh.socket.send(datagram.as_bytes())?;
                *session = Some(fresh);
                Ok(())
            }
        }
    }

    fn read_chunk(&self, range: MemoryRange) -> Result<Vec<u8>, DriverError> {
        let address = range.start();
        let key = ResponseKey::new(READ_COMMAND, address, Some(range.len()));

        self.responses.forget(&key);
        self.send(&wire::read_command(address, range.len()))?;

        match self.responses.wait(&key, self.config.timeout()) {
            Some(Payload::Bytes(bytes)) => Ok(bytes),
            Some(Payload::Error(reason)) => {
                debug!("Peer rejected read at {}: {}", address, reason);
                Err(DriverError::PeerError {
                    command: READ_COMMAND.to_string(),
                    address,
                })
            }
            None => Err(DriverError::Timeout(address)),
        }
    }

    fn read_range(&self, range: MemoryRange) -> Result<MemoryBlock, DriverError> {
        let chunks = range.chunks(self.config.max_read_length);
        let mut data = Vec::with_capacity(range.len());
        for chunk in chunks {
            data.extend(self.read_chunk(chunk)?);
        }
        Ok(MemoryBlock::new(range.start(), data))
    }
}

impl Driver for CorrelationDriver {
    fn name(&self) -> &str {
        "correlation"
    }

    fn delay(&self) -> Duration {
        self.config.delay()
    }

    fn establish_connection(&self, _ranges: &[MemoryRange]) -> Result<(), DriverError> {
        let mut session = self.session.lock();
        if let Some(mut old) = session.take() {
            old.close();
        }
        self.responses.clear();
        *session = Some(Session::open(&self.config.peer(), Arc::clone(&self.responses))?);
        Ok(())
    }

    /// Ranges are read concurrently; each one is correlated independently.
    fn read_bytes(&self, ranges: &[MemoryRange]) -> Result<Vec<MemoryBlock>, DriverError> {
        if ranges.len() <= 1 {
            return ranges.iter().map(|r| self.read_range(*r)).collect();
        }

        thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .iter()
                .map(|range| scope.spawn(move || self.read_range(*range)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(DriverError::MalformedResponse("reader thread panicked".to_string())))
                })
                .collect()
        })
    }

    fn write_bytes(&self, address: Address, bytes: &[u8]) -> Result<(), DriverError> {
        self.send(&wire::write_command(address, bytes))
    }

    fn disconnect(&self) {
        if let Some(mut session) = self.session.lock().take() {
            session.close();
            debug!("Correlation session closed");
        }
        self.responses.clear();
    }
}

impl Drop for CorrelationDriver {
    fn drop(&mut self) {
        self.disconnect();
    }
}
