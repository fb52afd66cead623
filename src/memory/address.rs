// Mon Feb 16 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Address inside an emulator's exposed byte space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address {
    value: u32,
}

impl Address {
    pub fn new(value: u32) -> Self {
        Self { value }
    }

    pub fn zero() -> Self {
        Self { value: 0 }
    }

    pub fn as_u32(&self) -> u32 {
        self.value
    }

    /// Byte distance from `base`, `None` if this address lies below it.
    pub fn distance_from(&self, base: Self) -> Option<u32> {
        self.value.checked_sub(base.value)
    }

    pub fn is_within_range(&self, start: Self, end: Self) -> bool {
        self.value >= start.value && self.value < end.value
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.value)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

impl Add<u32> for Address {
    type Output = Self;
    fn add(self, rhs: u32) -> Self::Output {
        Self { value: self.value.wrapping_add(rhs) }
    }
}

impl From<u32> for Address {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Address> for u32 {
    fn from(addr: Address) -> Self {
        addr.value
    }
}
