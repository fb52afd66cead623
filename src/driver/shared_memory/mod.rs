// Sat Feb 21 2026 - Alex

//! Handshake driver: ranges are negotiated once over a control channel, then the
//! peer streams memory into a shared file which is read without round trips.

pub mod protocol;
pub mod region;

use crate::config::SharedMemoryConfig;
use crate::driver::{Driver, DriverError, MemoryBlock};
use crate::memory::{Address, MemoryRange};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub use protocol::{BlockLayout, Instruction, Opcode};
pub use region::SharedRegion;

const LISTEN_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    AwaitingSetupAck,
    Ready,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::AwaitingSetupAck => "awaiting setup ack",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

struct Session {
    socket: UdpSocket,
    region: SharedRegion,
    blocks: Vec<BlockLayout>,
    running: Arc<AtomicBool>,
    listener: Option<JoinHandle<()>>,
}

impl Session {
    fn stop_listener(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.listener.take() {
            let _ = handle.join();
        }
    }

    fn read(&self, range: MemoryRange) -> Result<Vec<u8>, DriverError> {
        self.blocks
            .iter()
            .find_map(|block| block.offset_of(range.start(), range.len()))
            .and_then(|offset| self.region.read(offset, range.len()))
            .ok_or_else(|| DriverError::SharedMemory(format!("range {} was not negotiated", range)))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_listener();
    }
}

pub struct SharedMemoryDriver {
    config: SharedMemoryConfig,
    state: Arc<Mutex<SessionState>>,
    session: Mutex<Option<Session>>,
}

impl SharedMemoryDriver {
    pub fn new(config: SharedMemoryConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(SessionState::Disconnected)),
            session: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Whether a peer answers a ping on the configured control port.
    pub fn probe(config: &SharedMemoryConfig) -> bool {
        match Self::ping(config) {
            Ok(answered) => answered,
            Err(e) => {
                debug!("Probe failed: {}", e);
                false
            }
        }
    }

    fn ping(config: &SharedMemoryConfig) -> Result<bool, DriverError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(config.peer())?;
        socket.send(&Instruction::Ping.encode())?;
        Ok(await_opcode(&socket, Opcode::Ping, config.probe_timeout())?.is_some())
    }

    fn setup(&self, ranges: &[MemoryRange]) -> Result<Session, DriverError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(self.config.peer())?;

        let blocks = protocol::layout(ranges);
        let total: usize = ranges.iter().map(MemoryRange::len).sum();

        *self.state.lock() = SessionState::AwaitingSetupAck;
        socket.send(&Instruction::Setup {
            frame_skip: self.config.frame_skip,
            blocks: blocks.clone(),
        }
        .encode())?;

        if await_opcode(&socket, Opcode::Setup, self.config.setup_timeout())?.is_none() {
            return Err(DriverError::Setup(format!(
                "no setup acknowledgement from {} within {:?}",
                self.config.peer(),
                self.config.setup_timeout()
            )));
        }

        let region = SharedRegion::open(self.config.memory_path(), total)?;
        if !region.wait_for_content(self.config.liveness_retries, self.config.liveness_interval()) {
            return Err(DriverError::Setup(format!(
                "shared memory {} stayed empty; the mapper may not match the running game",
                region.path().display()
            )));
        }

        *self.state.lock() = SessionState::Ready;
        let running = Arc::new(AtomicBool::new(true));
        let listener = {
            let socket = socket.try_clone()?;
            socket.set_read_timeout(Some(LISTEN_POLL))?;
            let running = Arc::clone(&running);
            let state = Arc::clone(&self.state);
            thread::Builder::new()
                .name("shared-memory-close".to_string())
                .spawn(move || listen_for_close(socket, running, state))?
        };

        Ok(Session {
            socket,
            region,
            blocks,
            running,
            listener: Some(listener),
        })
    }

    fn ensure_ready(&self) -> Result<(), DriverError> {
        match self.state() {
            SessionState::Ready => Ok(()),
            SessionState::Closed => Err(DriverError::ConnectionClosed),
            _ => Err(DriverError::NotConnected),
        }
    }
}

/// Wait for a datagram tagged with `opcode`, ignoring anything else.
fn await_opcode(socket: &UdpSocket, opcode: Opcode, timeout: Duration) -> Result<Option<Vec<u8>>, DriverError> {
    let deadline = Instant::now() + timeout;
    let mut buffer = [0u8; 1024];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        socket.set_read_timeout(Some(remaining))?;

        match socket.recv(&mut buffer) {
            Ok(size) if size > 0 && buffer[0] == opcode as u8 => return Ok(Some(buffer[..size].to_vec())),
            Ok(_) => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                thread::sleep(remaining.min(LISTEN_POLL));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn listen_for_close(socket: UdpSocket, running: Arc<AtomicBool>, state: Arc<Mutex<SessionState>>) {
    let mut buffer = [0u8; 64];

    while running.load(Ordering::SeqCst) {
        match socket.recv(&mut buffer) {
            Ok(size) if size > 0 && buffer[0] == Opcode::Close as u8 => {
                info!("Peer closed the shared memory session");
                *state.lock() = SessionState::Closed;
                break;
            }
            Ok(_) => {}
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => thread::sleep(LISTEN_POLL),
            Err(e) => {
                warn!("Close listener stopping: {}", e);
                break;
            }
        }
    }
}

impl Driver for SharedMemoryDriver {
    fn name(&self) -> &str {
        "shared-memory"
    }

    fn delay(&self) -> Duration {
        self.config.delay()
    }

    fn establish_connection(&self, ranges: &[MemoryRange]) -> Result<(), DriverError> {
        self.disconnect();

        match self.setup(ranges) {
            Ok(session) => {
                debug!(
                    "Shared memory session ready: {} block(s), {} byte(s) at {}",
                    session.blocks.len(),
                    session.region.size(),
                    session.region.path().display()
                );
                *self.session.lock() = Some(session);
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    fn read_bytes(&self, ranges: &[MemoryRange]) -> Result<Vec<MemoryBlock>, DriverError> {
        self.ensure_ready()?;
        let session = self.session.lock();
        let session = session.as_ref().ok_or(DriverError::NotConnected)?;

        ranges
            .iter()
            .map(|range| Ok::<_, DriverError>(MemoryBlock::new(range.start(), session.read(*range)?)))
            .collect()
    }

    fn write_bytes(&self, address: Address, bytes: &[u8]) -> Result<(), DriverError> {
        self.ensure_ready()?;
        let session = self.session.lock();
        let session = session.as_ref().ok_or(DriverError::NotConnected)?;

        let instruction = Instruction::Write {
            address,
            data: bytes.to_vec(),
        };
        session.socket.send(&instruction.encode())?;
        Ok(())
    }

    fn disconnect(&self) {
        let was_ready = self.state() == SessionState::Ready;
        if let Some(mut session) = self.session.lock().take() {
            session.stop_listener();
            if was_ready {
                let _ = session.socket.send(&Instruction::Close.encode());
            }
            debug!("Shared memory session closed");
        }
        *self.state.lock() = SessionState::Disconnected;
    }
}

impl Drop for SharedMemoryDriver {
    fn drop(&mut self) {
        self.disconnect();
    }
}
