// Fri Feb 20 2026 - Alex

use crate::driver::Driver;
use crate::memory::{Address, MemoryStore};
use crate::property::codec::{self, CodecContext, Endianness};
use crate::property::{
    ChangedFacets, Property, PropertyError, PropertyRegistry, PropertyValue, ReferenceTables, ValueKind,
};
use crate::resolver::Variables;
use crate::scripting::{HookContext, HookOutcome, HookProvider, TransformRegistry};
use log::{debug, trace, warn};

/// First occurrence of a recoverable per-property failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyProblem {
    pub path: String,
    pub message: String,
}

/// Decodes properties from a [`MemoryStore`] and writes encoded values back
/// through a [`Driver`]. Borrowed for the duration of one cycle or one write.
pub struct PropertyEngine<'a> {
    endianness: Endianness,
    memory: &'a mut MemoryStore,
    variables: &'a mut Variables,
    references: &'a ReferenceTables,
    transforms: &'a TransformRegistry,
    driver: &'a dyn Driver,
    hooks: &'a dyn HookProvider,
}

impl<'a> PropertyEngine<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        endianness: Endianness,
        memory: &'a mut MemoryStore,
        variables: &'a mut Variables,
        references: &'a ReferenceTables,
        transforms: &'a TransformRegistry,
        driver: &'a dyn Driver,
        hooks: &'a dyn HookProvider,
    ) -> Self {
        Self {
            endianness,
            memory,
            variables,
            references,
            transforms,
            driver,
            hooks,
        }
    }

    /// Run every property in declaration order. A failing property is left stale
    /// and never stops the rest of the cycle.
    pub fn process_all(&mut self, registry: &mut PropertyRegistry) -> Vec<PropertyProblem> {
        let mut problems = Vec::new();

        for property in registry.iter_mut() {
            match self.process(property) {
                Ok(()) => property.state.clear_problem(),
                Err(err) => {
                    let message = err.to_string();
                    if property.state.note_problem(&message) {
                        warn!("Property '{}': {}", property.path(), message);
                        problems.push(PropertyProblem {
                            path: property.path().to_string(),
                            message,
                        });
                    } else {
                        trace!("Property '{}' still failing: {}", property.path(), message);
                    }
                }
            }
        }

        problems
    }

    pub fn process(&mut self, property: &mut Property) -> Result<(), PropertyError> {
        if let Some(hook) = property.descriptor().before_read.clone() {
            match self.call_hook(&hook, property)? {
                HookOutcome::NotHandled => {}
                HookOutcome::Handled => return Ok(()),
                HookOutcome::Value(value) => {
                    property.state.set_value(value);
                    return Ok(());
                }
            }
        }

        if let Some(value) = property.static_value().cloned() {
            property.state.set_value(value);
            return Ok(());
        }

        let Some(expression) = property.address_expression() else {
            return Ok(());
        };
        let Some(address) = expression.resolve(self.variables) else {
            trace!("Property '{}': address '{}' not resolvable yet", property.path(), expression);
            return Ok(());
        };
        property.state.set_address(Some(address));

        let bytes = self.memory.read(property.namespace(), address, property.length())?;

        if let Some(frozen) = property.state.frozen() {
            if frozen != bytes.as_slice() {
                let frozen = frozen.to_vec();
                debug!("Property '{}' drifted from frozen bytes, rewriting {}", property.path(), address);
                self.driver
                    .write_bytes(address, &frozen)
                    .map_err(|source| PropertyError::Write { address, source })?;
                return Ok(());
            }
        }

        if property.state.bytes() == Some(bytes.as_slice()) {
            return Ok(());
        }

        let previous = property.value().clone();
        let value_already_changed = property.state.changed().contains(ChangedFacets::VALUE);

        if property.kind() == ValueKind::Custom {
            property.state.set_bytes(bytes);
        } else {
            let input = match property.bit_selector() {
                Some(selector) => selector.extract(&bytes),
                None => bytes.clone(),
            };
            let decoded = {
                let ctx = self.codec_context(property)?;
                codec::decode(property.kind(), &input, &ctx)?
            };
            property.state.set_bytes(bytes);
            property.state.set_value(decoded);
        }

        if let Some(hook) = property.descriptor().after_read.clone() {
            if let HookOutcome::Value(value) = self.call_hook(&hook, property)? {
                property.state.set_value(value);
            }
        }

        if !value_already_changed && *property.value() == previous {
            property.state.unmark(ChangedFacets::VALUE);
        }

        Ok(())
    }

    /// Encode `value` and send it to the driver. `freeze` pins the written bytes,
    /// otherwise any existing pin is released.
    pub fn write_value(
        &mut self,
        property: &mut Property,
        value: &PropertyValue,
        freeze: bool,
    ) -> Result<(), PropertyError> {
        if property.is_read_only() {
            return Err(PropertyError::ReadOnly(property.path().to_string()));
        }

        if property.address_expression().is_none() {
            property.set_static_value(value.clone());
            return Ok(());
        }

        let bytes = {
            let ctx = self.codec_context(property)?;
            codec::encode(property.kind(), value, property.length(), &ctx)?
        };
        if let Some(selector) = property.bit_selector() {
            if selector.overflows(&bytes) {
                return Err(PropertyError::invalid_value(
                    value,
                    format!("does not fit in {} selected bit(s)", selector.len()),
                ));
            }
        }
        self.write_bytes(property, &bytes, freeze)
    }

    pub fn write_bytes(&mut self, property: &mut Property, bytes: &[u8], freeze: bool) -> Result<(), PropertyError> {
        if property.is_read_only() {
            return Err(PropertyError::ReadOnly(property.path().to_string()));
        }

        let address = self.current_address(property)?;
        let length = property.length();

        let buffer = match property.bit_selector() {
            Some(selector) => {
                let base = match property.bytes() {
                    Some(bytes) => bytes.to_vec(),
                    None => self
                        .memory
                        .read(property.namespace(), address, length)
                        .map_err(|_| PropertyError::NotRead(property.path().to_string()))?,
                };
                if base.len() != length {
                    return Err(PropertyError::LengthMismatch {
                        expected: length,
                        actual: base.len(),
                    });
                }
                selector.splice(&base, bytes)
            }
            None => bytes.to_vec(),
        };

        if buffer.len() != length {
            return Err(PropertyError::LengthMismatch {
                expected: length,
                actual: buffer.len(),
            });
        }

        debug!("Writing {} byte(s) to {} for '{}'", buffer.len(), address, property.path());
        self.driver
            .write_bytes(address, &buffer)
            .map_err(|source| PropertyError::Write { address, source })?;

        property.state.set_frozen(if freeze { Some(buffer) } else { None });
        Ok(())
    }

    /// Pin the last-read bytes, or release the pin.
    pub fn set_frozen(&mut self, property: &mut Property, frozen: bool) -> Result<(), PropertyError> {
        if !frozen {
            property.state.set_frozen(None);
            return Ok(());
        }
        if property.is_read_only() {
            return Err(PropertyError::ReadOnly(property.path().to_string()));
        }
        let bytes = property
            .bytes()
            .map(|b| b.to_vec())
            .ok_or_else(|| PropertyError::NotRead(property.path().to_string()))?;
        property.state.set_frozen(Some(bytes));
        Ok(())
    }

    fn current_address(&self, property: &Property) -> Result<Address, PropertyError> {
        property
            .address()
            .or_else(|| property.address_expression().and_then(|e| e.resolve(self.variables)))
            .ok_or_else(|| PropertyError::Unresolved(property.path().to_string()))
    }

    fn codec_context<'p>(&self, property: &'p Property) -> Result<CodecContext<'p>, PropertyError>
    where
        'a: 'p,
    {
        // Bit-selected bytes are a fresh LSB-first bit vector, not memory-ordered.
        let endianness = if property.bit_selector().is_some() {
            Endianness::Little
        } else {
            self.endianness
        };
        let ctx = CodecContext::new(endianness).with_element_size(property.descriptor().element_size());

        match property.descriptor().reference.as_deref() {
            Some(name) => {
                let table = self
                    .references
                    .get(name)
                    .ok_or_else(|| PropertyError::MissingReference(name.to_string()))?;
                Ok(ctx.with_reference(name, table))
            }
            None => Ok(ctx),
        }
    }

    fn call_hook(&mut self, hook: &str, property: &mut Property) -> Result<HookOutcome, PropertyError> {
        let hooks = self.hooks;
        let mut ctx = HookContext::for_property(property, self.memory, self.variables, self.transforms);
        Ok(hooks.try_call(hook, &mut ctx)?)
    }
}
