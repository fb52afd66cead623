// Thu Feb 19 2026 - Alex

use crate::scripting::HookError;
use ahash::AHashMap;
use std::sync::Arc;

/// Game-specific byte codec (record encryption, checksums and the like)
/// exposed to hooks by name.
pub trait ByteTransform: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, String>;
    fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>, String>;
}

#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: AHashMap<String, Arc<dyn ByteTransform>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, transform: Arc<dyn ByteTransform>) {
        self.transforms.insert(name.to_string(), transform);
    }

    pub fn names(&self) -> Vec<&str> {
        self.transforms.keys().map(|k| k.as_str()).collect()
    }

    pub fn decode(&self, name: &str, bytes: &[u8]) -> Result<Vec<u8>, HookError> {
        self.get(name)?.decode(bytes).map_err(|reason| HookError::Transform {
            name: name.to_string(),
            reason,
        })
    }

    pub fn encode(&self, name: &str, bytes: &[u8]) -> Result<Vec<u8>, HookError> {
        self.get(name)?.encode(bytes).map_err(|reason| HookError::Transform {
            name: name.to_string(),
            reason,
        })
    }

    fn get(&self, name: &str) -> Result<&Arc<dyn ByteTransform>, HookError> {
        self.transforms
            .get(name)
            .ok_or_else(|| HookError::UnknownTransform(name.to_string()))
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.names())
            .finish()
    }
}
