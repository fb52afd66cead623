// Wed Feb 18 2026 - Alex

use crate::memory::Address;
use crate::property::PropertyValue;
use bitflags::bitflags;

bitflags! {
    /// Facets of a property that changed since the start of the current cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChangedFacets: u8 {
        const ADDRESS = 0b0001;
        const BYTES   = 0b0010;
        const VALUE   = 0b0100;
        const FROZEN  = 0b1000;
    }
}

impl ChangedFacets {
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names()
            .map(|(name, _)| match name {
                "ADDRESS" => "address",
                "BYTES" => "bytes",
                "VALUE" => "value",
                "FROZEN" => "frozen",
                _ => "unknown",
            })
            .collect()
    }
}

/// Mutable per-property state, owned by the registry and only touched by the engine.
#[derive(Debug, Clone, Default)]
pub struct PropertyState {
    address: Option<Address>,
    bytes: Option<Vec<u8>>,
    value: PropertyValue,
    frozen: Option<Vec<u8>>,
    changed: ChangedFacets,
    last_problem: Option<String>,
}

impl PropertyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn frozen(&self) -> Option<&[u8]> {
        self.frozen.as_deref()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn changed(&self) -> ChangedFacets {
        self.changed
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn set_address(&mut self, address: Option<Address>) {
        if self.address != address {
            self.address = address;
            self.changed |= ChangedFacets::ADDRESS;
        }
    }

    pub fn set_bytes(&mut self, bytes: Vec<u8>) {
        if self.bytes.as_deref() != Some(bytes.as_slice()) {
            self.bytes = Some(bytes);
            self.changed |= ChangedFacets::BYTES;
        }
    }

    pub fn set_value(&mut self, value: PropertyValue) {
        if self.value != value {
            self.value = value;
            self.changed |= ChangedFacets::VALUE;
        }
    }

    pub fn set_frozen(&mut self, frozen: Option<Vec<u8>>) {
        if self.frozen != frozen {
            self.frozen = frozen;
            self.changed |= ChangedFacets::FROZEN;
        }
    }

    pub fn mark(&mut self, facets: ChangedFacets) {
        self.changed |= facets;
    }

    pub fn unmark(&mut self, facets: ChangedFacets) {
        self.changed.remove(facets);
    }

    pub fn clear_changes(&mut self) {
        self.changed = ChangedFacets::empty();
    }

    /// Record a problem; returns `true` only the first time this exact problem is seen.
    pub fn note_problem(&mut self, problem: &str) -> bool {
        if self.last_problem.as_deref() == Some(problem) {
            return false;
        }
        self.last_problem = Some(problem.to_string());
        true
    }

    pub fn clear_problem(&mut self) {
        self.last_problem = None;
    }
}
