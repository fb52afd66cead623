// Thu Feb 19 2026 - Alex

use crate::driver::DriverError;
use crate::memory::{Address, MemoryRange};
use std::time::Duration;

/// Bytes read for one polled range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBlock {
    pub start: Address,
    pub data: Vec<u8>,
}

impl MemoryBlock {
    pub fn new(start: Address, data: Vec<u8>) -> Self {
        Self { start, data }
    }

    pub fn range(&self) -> MemoryRange {
        MemoryRange::new(self.start, self.data.len() as u32)
    }
}

/// Source of raw emulator bytes.
///
/// Implementations own their session state behind interior mutability so a
/// single driver can be shared between the poll loop and property writers.
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    /// Pause between two poll cycles.
    fn delay(&self) -> Duration;

    fn establish_connection(&self, ranges: &[MemoryRange]) -> Result<(), DriverError>;

    fn read_bytes(&self, ranges: &[MemoryRange]) -> Result<Vec<MemoryBlock>, DriverError>;

    /// Fire-and-forget write; no acknowledgement is awaited.
    fn write_bytes(&self, address: Address, bytes: &[u8]) -> Result<(), DriverError>;

    fn disconnect(&self);
}
