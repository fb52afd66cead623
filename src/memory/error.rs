// Mon Feb 16 2026 - Alex

use crate::memory::Address;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Out of range: no fragment in '{namespace}' covers {length} bytes at {address}")]
    OutOfRange {
        namespace: String,
        address: Address,
        length: usize,
    },
    #[error("Fragment overflow: writing {length} bytes at {address} exceeds fragment starting at {fragment_start}")]
    FragmentOverflow {
        address: Address,
        length: usize,
        fragment_start: Address,
    },
    #[error("Zero-length read at {0}")]
    ZeroLength(Address),
}
