// Thu Feb 19 2026 - Alex

use crate::memory::MemoryStore;
use crate::property::{Property, PropertyRegistry, PropertyValue};
use crate::resolver::Variables;
use crate::scripting::TransformRegistry;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HookError {
    #[error("Transform '{0}' is not registered")]
    UnknownTransform(String),
    #[error("Transform '{name}' failed: {reason}")]
    Transform { name: String, reason: String },
    #[error("Property '{0}' not found")]
    UnknownProperty(String),
    #[error("{0}")]
    Failed(String),
}

/// Result of invoking a hook through [`HookProvider::try_call`].
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    /// No such hook, or the hook declined to handle the call.
    NotHandled,
    /// The hook fully handled the call; any state it wanted changed is already changed.
    Handled,
    /// The hook produced a value that replaces the property's value.
    Value(PropertyValue),
}

/// What a hook may see and touch while it runs.
///
/// Per-property hooks get the property being processed; cycle hooks get the
/// whole registry. Both may use memory, variables and byte transforms.
pub struct HookContext<'a> {
    property: Option<&'a mut Property>,
    properties: Option<&'a mut PropertyRegistry>,
    memory: &'a mut MemoryStore,
    variables: &'a mut Variables,
    transforms: &'a TransformRegistry,
}

impl<'a> HookContext<'a> {
    pub fn for_property(
        property: &'a mut Property,
        memory: &'a mut MemoryStore,
        variables: &'a mut Variables,
        transforms: &'a TransformRegistry,
    ) -> Self {
        Self {
            property: Some(property),
            properties: None,
            memory,
            variables,
            transforms,
        }
    }

    pub fn for_cycle(
        properties: &'a mut PropertyRegistry,
        memory: &'a mut MemoryStore,
        variables: &'a mut Variables,
        transforms: &'a TransformRegistry,
    ) -> Self {
        Self {
            property: None,
            properties: Some(properties),
            memory,
            variables,
            transforms,
        }
    }

    pub fn property(&self) -> Option<&Property> {
        self.property.as_deref()
    }

    pub fn properties(&self) -> Option<&PropertyRegistry> {
        self.properties.as_deref()
    }

    /// Set a property's value from a cycle hook.
    pub fn set_property_value(&mut self, path: &str, value: PropertyValue) -> Result<(), HookError> {
        let property = self
            .properties
            .as_deref_mut()
            .and_then(|registry| registry.get_mut(path))
            .ok_or_else(|| HookError::UnknownProperty(path.to_string()))?;
        property.state_mut().set_value(value);
        Ok(())
    }

    pub fn memory(&self) -> &MemoryStore {
        &*self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryStore {
        &mut *self.memory
    }

    pub fn variable(&self, name: &str) -> Option<i64> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: &str, value: Option<i64>) {
        self.variables.set(name, value);
    }

    pub fn decode_bytes(&self, transform: &str, bytes: &[u8]) -> Result<Vec<u8>, HookError> {
        self.transforms.decode(transform, bytes)
    }

    pub fn encode_bytes(&self, transform: &str, bytes: &[u8]) -> Result<Vec<u8>, HookError> {
        self.transforms.encode(transform, bytes)
    }
}

/// Capability interface in front of the scripting runtime.
pub trait HookProvider: Send + Sync {
    fn try_call(&self, hook: &str, ctx: &mut HookContext<'_>) -> Result<HookOutcome, HookError>;

    /// `Ok(None)` when the hook is absent or returns something other than a boolean.
    fn call_boolean(&self, hook: &str, ctx: &mut HookContext<'_>) -> Result<Option<bool>, HookError>;
}

/// Provider used when a mapper ships without scripts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl HookProvider for NoHooks {
    fn try_call(&self, _hook: &str, _ctx: &mut HookContext<'_>) -> Result<HookOutcome, HookError> {
        Ok(HookOutcome::NotHandled)
    }

    fn call_boolean(&self, _hook: &str, _ctx: &mut HookContext<'_>) -> Result<Option<bool>, HookError> {
        Ok(None)
    }
}
