// Mon Feb 16 2026 - Alex

use crate::memory::{Address, MemoryError};

/// Owned block of bytes anchored at `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFragment {
    start: Address,
    data: Vec<u8>,
}

impl MemoryFragment {
    pub fn new(start: Address, data: Vec<u8>) -> Self {
        Self { start, data }
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn contains(&self, addr: Address) -> bool {
        match addr.distance_from(self.start) {
            Some(offset) => (offset as usize) < self.data.len(),
            None => false,
        }
    }

    fn offset(&self, addr: Address) -> Option<usize> {
        addr.distance_from(self.start)
            .map(|o| o as usize)
            .filter(|&o| o < self.data.len())
    }

    pub fn write(&mut self, addr: Address, bytes: &[u8]) -> Result<(), MemoryError> {
        let offset = self.offset(addr).ok_or(MemoryError::FragmentOverflow {
            address: addr,
            length: bytes.len(),
            fragment_start: self.start,
        })?;
        let end = offset + bytes.len();
        if end > self.data.len() {
            return Err(MemoryError::FragmentOverflow {
                address: addr,
                length: bytes.len(),
                fragment_start: self.start,
            });
        }
        self.data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Slice `len` bytes at `addr`, `None` unless the whole span is inside this fragment.
    pub fn slice(&self, addr: Address, len: usize) -> Option<&[u8]> {
        let offset = self.offset(addr)?;
        self.data.get(offset..offset.checked_add(len)?)
    }
}
