// Mon Feb 16 2026 - Alex

use crate::memory::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous span of emulator memory polled every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRange {
    start: Address,
    length: u32,
}

impl MemoryRange {
    pub fn new(start: Address, length: u32) -> Self {
        Self { start, length }
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.start + self.length
    }

    pub fn size(&self) -> u32 {
        self.length
    }

    pub fn len(&self) -> usize {
        self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr.is_within_range(self.start, self.end())
    }

    /// Split into consecutive ranges of at most `max_len` bytes.
    pub fn chunks(&self, max_len: u32) -> Vec<MemoryRange> {
        let max_len = max_len.max(1);
        let mut chunks = Vec::new();
        let mut offset = 0;
        while offset < self.length {
            let len = (self.length - offset).min(max_len);
            chunks.push(MemoryRange::new(self.start + offset, len));
            offset += len;
        }
        chunks
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_half_open() {
        let range = MemoryRange::new(Address::new(0x100), 0x10);
        assert!(range.contains(Address::new(0x100)));
        assert!(range.contains(Address::new(0x10F)));
        assert!(!range.contains(Address::new(0x110)));
    }

    #[test]
    fn test_chunks_cover_range() {
        let range = MemoryRange::new(Address::new(0x1000), 5000);
        let chunks = range.chunks(2048);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], MemoryRange::new(Address::new(0x1000), 2048));
        assert_eq!(chunks[2].size(), 5000 - 4096);
        assert_eq!(chunks[2].end(), range.end());
    }
}
