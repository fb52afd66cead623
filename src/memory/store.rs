// Mon Feb 16 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryFragment};
use ahash::AHashMap;

pub const DEFAULT_NAMESPACE: &str = "default";

/// Flat logical address space per namespace, backed by independently filled fragments.
///
/// Fragments are appended and never merged. A read must be satisfied by a single
/// fragment; spans straddling two fragments are rejected.
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: AHashMap<String, Vec<MemoryFragment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size a namespace with a zeroed fragment, used when platform metadata
    /// declares the memory size up front.
    pub fn with_zeroed(mut self, namespace: &str, start: Address, size: usize) -> Self {
        if size > 0 {
            self.fragments_mut(namespace)
                .push(MemoryFragment::new(start, vec![0; size]));
        }
        self
    }

    pub fn fill(&mut self, namespace: &str, address: Address, bytes: &[u8]) -> Result<(), MemoryError> {
        if bytes.is_empty() {
            return Ok(());
        }

        let fragments = self.fragments_mut(namespace);
        match fragments.iter_mut().find(|f| f.contains(address)) {
            Some(fragment) => fragment.write(address, bytes),
            None => {
                fragments.push(MemoryFragment::new(address, bytes.to_vec()));
                Ok(())
            }
        }
    }

    pub fn read(&self, namespace: &str, address: Address, length: usize) -> Result<Vec<u8>, MemoryError> {
        if length == 0 {
            return Err(MemoryError::ZeroLength(address));
        }

        self.namespaces
            .get(namespace)
            .and_then(|fragments| fragments.iter().find(|f| f.contains(address)))
            .and_then(|fragment| fragment.slice(address, length))
            .map(|slice| slice.to_vec())
            .ok_or_else(|| MemoryError::OutOfRange {
                namespace: namespace.to_string(),
                address,
                length,
            })
    }

    pub fn fragments(&self, namespace: &str) -> &[MemoryFragment] {
        self.namespaces
            .get(namespace)
            .map(|f| f.as_slice())
            .unwrap_or(&[])
    }

    fn fragments_mut(&mut self, namespace: &str) -> &mut Vec<MemoryFragment> {
        self.namespaces.entry(namespace.to_string()).or_default()
    }
}
