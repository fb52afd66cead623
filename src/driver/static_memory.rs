// Thu Feb 19 2026 - Alex

//! In-process driver over a fixed memory image. Backs `inspect` against memory
//! dumps and lets the engine run without an emulator attached.

use crate::driver::{Driver, DriverError, MemoryBlock};
use crate::memory::{Address, MemoryRange, MemoryStore, DEFAULT_NAMESPACE};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub struct StaticDriver {
    memory: Mutex<MemoryStore>,
    writes: Mutex<Vec<MemoryBlock>>,
    delay: Duration,
    connected: AtomicBool,
    failing_reads: AtomicUsize,
}

impl StaticDriver {
    pub fn new() -> Self {
        Self {
            memory: Mutex::new(MemoryStore::new()),
            writes: Mutex::new(Vec::new()),
            delay: Duration::from_millis(5),
            connected: AtomicBool::new(false),
            failing_reads: AtomicUsize::new(0),
        }
    }

    /// Load a raw memory dump anchored at `start`.
    pub fn from_file<P: AsRef<Path>>(path: P, start: Address) -> Result<Self, DriverError> {
        let data = fs::read(path)?;
        Ok(Self::new().with_block(start, data))
    }

    pub fn with_block(self, start: Address, data: Vec<u8>) -> Self {
        if let Err(e) = self.memory.lock().fill(DEFAULT_NAMESPACE, start, &data) {
            log::warn!("StaticDriver: ignoring block at {}: {}", start, e);
        }
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Change the image as the game would.
    pub fn poke(&self, address: Address, bytes: &[u8]) -> Result<(), DriverError> {
        self.memory.lock().fill(DEFAULT_NAMESPACE, address, bytes)?;
        Ok(())
    }

    pub fn peek(&self, address: Address, length: usize) -> Result<Vec<u8>, DriverError> {
        Ok(self.memory.lock().read(DEFAULT_NAMESPACE, address, length)?)
    }

    pub fn writes(&self) -> Vec<MemoryBlock> {
        self.writes.lock().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().clear();
    }

    /// Make the next `count` reads fail as if the peer vanished.
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Default for StaticDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for StaticDriver {
    fn name(&self) -> &str {
        "static"
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn establish_connection(&self, _ranges: &[MemoryRange]) -> Result<(), DriverError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read_bytes(&self, ranges: &[MemoryRange]) -> Result<Vec<MemoryBlock>, DriverError> {
        if !self.is_connected() {
            return Err(DriverError::NotConnected);
        }
        let failing = self.failing_reads.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_reads.store(failing - 1, Ordering::SeqCst);
            return Err(DriverError::ConnectionClosed);
        }

        let memory = self.memory.lock();
        ranges
            .iter()
            .map(|range| {
                let data = memory.read(DEFAULT_NAMESPACE, range.start(), range.len())?;
                Ok::<_, DriverError>(MemoryBlock::new(range.start(), data))
            })
            .collect()
    }

    fn write_bytes(&self, address: Address, bytes: &[u8]) -> Result<(), DriverError> {
        self.writes.lock().push(MemoryBlock::new(address, bytes.to_vec()));
        self.memory.lock().fill(DEFAULT_NAMESPACE, address, bytes)?;
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_require_connection() {
        let driver = StaticDriver::new().with_block(Address::new(0x100), vec![1, 2, 3]);
        let ranges = [MemoryRange::new(Address::new(0x100), 3)];
        assert!(matches!(driver.read_bytes(&ranges), Err(DriverError::NotConnected)));

        driver.establish_connection(&ranges).unwrap();
        let blocks = driver.read_bytes(&ranges).unwrap();
        assert_eq!(blocks, vec![MemoryBlock::new(Address::new(0x100), vec![1, 2, 3])]);
    }

    #[test]
    fn test_writes_are_recorded_and_applied() {
        let driver = StaticDriver::new().with_block(Address::new(0), vec![0; 4]);
        driver.write_bytes(Address::new(2), &[9]).unwrap();
        assert_eq!(driver.peek(Address::new(0), 4).unwrap(), vec![0, 0, 9, 0]);
        assert_eq!(driver.writes().len(), 1);
    }

    #[test]
    fn test_from_dump_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wram.bin");
        std::fs::write(&path, [0xAA, 0xBB]).unwrap();
        let driver = StaticDriver::from_file(&path, Address::new(0xC000)).unwrap();
        assert_eq!(driver.peek(Address::new(0xC001), 1).unwrap(), vec![0xBB]);
    }

    #[test]
    fn test_injected_read_failures() {
        let driver = StaticDriver::new().with_block(Address::new(0), vec![0; 4]);
        let ranges = [MemoryRange::new(Address::new(0), 4)];
        driver.establish_connection(&ranges).unwrap();
        driver.fail_next_reads(1);
        assert!(driver.read_bytes(&ranges).is_err());
        assert!(driver.read_bytes(&ranges).is_ok());
    }
}
