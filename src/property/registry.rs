// Wed Feb 18 2026 - Alex

use crate::memory::{Address, DEFAULT_NAMESPACE};
use crate::property::{codec, BitSelector, PropertyDescriptor, PropertyError, PropertyState, PropertyValue, ValueKind};
use crate::resolver::AddressExpression;
use indexmap::IndexMap;
use serde::Serialize;

/// A descriptor together with its load-time compiled parts and runtime state.
#[derive(Debug, Clone)]
pub struct Property {
    descriptor: PropertyDescriptor,
    address: Option<AddressExpression>,
    bits: Option<BitSelector>,
    static_value: Option<PropertyValue>,
    pub(crate) state: PropertyState,
}

impl Property {
    /// Compile a descriptor. Malformed expressions and bit selectors are
    /// configuration errors and are reported here, never during polling.
    pub fn compile(descriptor: PropertyDescriptor) -> Result<Self, PropertyError> {
        if descriptor.length == 0 {
            return Err(PropertyError::InvalidLength { path: descriptor.path.clone() });
        }
        if let Some(max) = codec::max_length(descriptor.kind) {
            if descriptor.length > max {
                return Err(PropertyError::LengthTooLong {
                    path: descriptor.path.clone(),
                    kind: descriptor.kind,
                    length: descriptor.length,
                    max,
                });
            }
        }

        let address = descriptor
            .address
            .as_deref()
            .map(AddressExpression::parse)
            .transpose()
            .map_err(|source| PropertyError::InvalidExpression {
                path: descriptor.path.clone(),
                source,
            })?;

        let bits = match descriptor.bits.as_deref() {
            Some(selector) => Some(BitSelector::parse(selector, descriptor.length).map_err(|reason| {
                PropertyError::InvalidBitSelector {
                    path: descriptor.path.clone(),
                    selector: selector.to_string(),
                    reason,
                }
            })?),
            None => None,
        };

        let static_value = descriptor.static_value.as_ref().map(PropertyValue::from_json);

        Ok(Self {
            descriptor,
            address,
            bits,
            static_value,
            state: PropertyState::new(),
        })
    }

    pub fn path(&self) -> &str {
        &self.descriptor.path
    }

    pub fn kind(&self) -> ValueKind {
        self.descriptor.kind
    }

    pub fn length(&self) -> usize {
        self.descriptor.length
    }

    pub fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    pub fn address_expression(&self) -> Option<&AddressExpression> {
        self.address.as_ref()
    }

    pub fn bit_selector(&self) -> Option<&BitSelector> {
        self.bits.as_ref()
    }

    pub fn static_value(&self) -> Option<&PropertyValue> {
        self.static_value.as_ref()
    }

    pub(crate) fn set_static_value(&mut self, value: PropertyValue) {
        self.static_value = Some(value.clone());
        self.state.set_value(value);
    }

    pub fn namespace(&self) -> &str {
        self.descriptor.memory_container.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn is_read_only(&self) -> bool {
        self.descriptor.is_read_only()
    }

    pub fn state(&self) -> &PropertyState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PropertyState {
        &mut self.state
    }

    pub fn address(&self) -> Option<Address> {
        self.state.address()
    }

    pub fn value(&self) -> &PropertyValue {
        self.state.value()
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.state.bytes()
    }

    pub fn snapshot(&self) -> PropertySnapshot {
        PropertySnapshot {
            path: self.path().to_string(),
            kind: self.kind(),
            address: self.state.address(),
            length: self.length(),
            bytes: self.state.bytes().map(|b| b.to_vec()),
            value: self.state.value().clone(),
            frozen: self.state.is_frozen(),
            read_only: self.is_read_only(),
            changed: self.state.changed().names(),
        }
    }
}

/// Serialisable view of a property handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySnapshot {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    pub address: Option<Address>,
    pub length: usize,
    pub bytes: Option<Vec<u8>>,
    pub value: PropertyValue,
    pub frozen: bool,
    pub read_only: bool,
    pub changed: Vec<&'static str>,
}

/// Properties in declaration order, addressable by dotted path.
#[derive(Debug, Clone, Default)]
pub struct PropertyRegistry {
    properties: IndexMap<String, Property>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_descriptors<I>(descriptors: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = PropertyDescriptor>,
    {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.insert(Property::compile(descriptor)?)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, property: Property) -> Result<(), RegistryError> {
        if self.properties.contains_key(property.path()) {
            return Err(RegistryError::DuplicatePath(property.path().to_string()));
        }
        self.properties.insert(property.path().to_string(), property);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&Property> {
        self.properties.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Property> {
        self.properties.get_mut(path)
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut Property> {
        self.properties.get_index_mut(index).map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Property> {
        self.properties.values_mut()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn clear_changes(&mut self) {
        for property in self.properties.values_mut() {
            property.state.clear_changes();
        }
    }

    pub fn changed(&self) -> Vec<PropertySnapshot> {
        self.properties
            .values()
            .filter(|p| p.state.has_changes())
            .map(Property::snapshot)
            .collect()
    }

    pub fn snapshots(&self) -> Vec<PropertySnapshot> {
        self.properties.values().map(Property::snapshot).collect()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("Duplicate property path '{0}'")]
    DuplicatePath(String),
    #[error(transparent)]
    Property(#[from] PropertyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_rejects_overlong_numeric_spans() {
        let money = PropertyDescriptor::new("money", ValueKind::Bcd).with_address("0x10").with_length(12);
        assert!(matches!(
            Property::compile(money),
            Err(PropertyError::LengthTooLong { length: 12, max: 9, .. })
        ));

        let wide = PropertyDescriptor::new("wide", ValueKind::Int).with_address("0x10").with_length(8);
        assert!(matches!(Property::compile(wide), Err(PropertyError::LengthTooLong { max: 4, .. })));

        let name = PropertyDescriptor::new("name", ValueKind::String).with_address("0x10").with_length(16);
        assert!(Property::compile(name).is_ok());
    }

    #[test]
    fn test_compile_rejects_bad_configuration() {
        let bad_address = PropertyDescriptor::new("a", ValueKind::Uint).with_address("0x10 +");
        assert!(matches!(
            Property::compile(bad_address),
            Err(PropertyError::InvalidExpression { .. })
        ));

        let bad_bits = PropertyDescriptor::new("b", ValueKind::Uint).with_address("0x10").with_bits("9");
        assert!(matches!(
            Property::compile(bad_bits),
            Err(PropertyError::InvalidBitSelector { .. })
        ));

        let empty = PropertyDescriptor::new("c", ValueKind::Uint).with_address("0x10").with_length(0);
        assert!(Property::compile(empty).unwrap_err().is_configuration());
    }

    #[test]
    fn test_registry_keeps_declaration_order() {
        let registry = PropertyRegistry::from_descriptors(vec![
            PropertyDescriptor::new("z.last", ValueKind::Uint).with_address("1"),
            PropertyDescriptor::new("a.first", ValueKind::Uint).with_address("2"),
        ])
        .unwrap();
        assert_eq!(registry.paths().collect::<Vec<_>>(), vec!["z.last", "a.first"]);
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let result = PropertyRegistry::from_descriptors(vec![
            PropertyDescriptor::new("hp", ValueKind::Uint).with_address("1"),
            PropertyDescriptor::new("hp", ValueKind::Uint).with_address("2"),
        ]);
        assert!(matches!(result, Err(RegistryError::DuplicatePath(_))));
    }

    #[test]
    fn test_snapshot_reports_static_value_property() {
        let property = Property::compile(
            PropertyDescriptor::new("meta.generation", ValueKind::Uint).with_static_value(json!(1)),
        )
        .unwrap();
        assert_eq!(property.static_value(), Some(&PropertyValue::Integer(1)));
        let snapshot = property.snapshot();
        assert!(!snapshot.read_only);
        assert!(snapshot.changed.is_empty());
    }
}
