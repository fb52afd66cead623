// Sat Feb 21 2026 - Alex

use crate::mapper::MapperError;
use crate::memory::{Address, MemoryRange, MemoryStore, DEFAULT_NAMESPACE};
use crate::property::{Endianness, PropertyDescriptor, PropertyRegistry, ReferenceTables};
use crate::resolver::Variables;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapperMetadata {
    pub id: Option<String>,
    pub game_name: String,
    pub game_platform: String,
    pub version: Option<String>,
    pub description: Option<String>,
}

/// What the platform contributes when the mapper itself is silent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformOptions {
    pub endianness: Endianness,
    pub ranges: Vec<MemoryRange>,
    pub memory_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalHooks {
    pub preprocessor: Option<String>,
    pub postprocessor: Option<String>,
}

/// Declarative description of a game's memory layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapperDefinition {
    pub metadata: MapperMetadata,
    pub platform: PlatformOptions,
    /// Ranges declared by the mapper; these win over `platform.ranges`.
    pub memory_ranges: Vec<MemoryRange>,
    pub properties: Vec<PropertyDescriptor>,
    pub references: ReferenceTables,
    pub variables: IndexMap<String, Option<i64>>,
    pub hooks: GlobalHooks,
}

impl MapperDefinition {
    pub fn from_json(text: &str) -> Result<Self, MapperError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn polling_ranges(&self) -> Vec<MemoryRange> {
        if !self.memory_ranges.is_empty() {
            return self.memory_ranges.clone();
        }
        if !self.platform.ranges.is_empty() {
            return self.platform.ranges.clone();
        }
        match self.platform.memory_size {
            Some(size) if size > 0 => vec![MemoryRange::new(Address::zero(), size as u32)],
            _ => Vec::new(),
        }
    }

    /// Validate and build everything a running instance needs.
    pub fn compile(&self) -> Result<CompiledMapper, MapperError> {
        for (name, table) in &self.references {
            let count = table.null_entries();
            if count > 1 {
                return Err(MapperError::AmbiguousTerminator {
                    table: name.clone(),
                    count,
                });
            }
        }

        for descriptor in &self.properties {
            if let Some(table) = &descriptor.reference {
                if !self.references.contains_key(table) {
                    return Err(MapperError::UnknownReference {
                        path: descriptor.path.clone(),
                        table: table.clone(),
                    });
                }
            }
        }

        let ranges = self.polling_ranges();
        if ranges.is_empty() {
            return Err(MapperError::NoRanges);
        }

        let registry = PropertyRegistry::from_descriptors(self.properties.iter().cloned())?;

        Ok(CompiledMapper {
            metadata: self.metadata.clone(),
            endianness: self.platform.endianness,
            ranges,
            registry,
            references: self.references.clone(),
            variables: self.variables.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            hooks: self.hooks.clone(),
            memory_size: self.platform.memory_size,
        })
    }
}

/// A validated mapper with its property tree built.
#[derive(Debug)]
pub struct CompiledMapper {
    pub metadata: MapperMetadata,
    pub endianness: Endianness,
    pub ranges: Vec<MemoryRange>,
    pub registry: PropertyRegistry,
    pub references: ReferenceTables,
    pub variables: Variables,
    pub hooks: GlobalHooks,
    pub memory_size: Option<usize>,
}

impl CompiledMapper {
    /// Session memory, pre-sized from the platform's declared memory size when
    /// every polled range fits inside it.
    pub fn memory_store(&self) -> MemoryStore {
        let store = MemoryStore::new();
        let Some(size) = self.memory_size.filter(|&size| size > 0) else {
            return store;
        };
        let fits = self
            .ranges
            .iter()
            .all(|range| range.start().as_u32() as usize + range.len() <= size);
        if fits {
            store.with_zeroed(DEFAULT_NAMESPACE, Address::zero(), size)
        } else {
            store
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{RegistryError, ValueKind};
    use serde_json::json;

    fn sample() -> MapperDefinition {
        serde_json::from_value(json!({
            "metadata": { "gameName": "Pocket Monsters Red", "gamePlatform": "GB" },
            "platform": {
                "endianness": "little",
                "ranges": [{ "start": 0xC000, "length": 0x2000 }]
            },
            "properties": [
                { "path": "player.money", "type": "bcd", "address": "0xD347", "length": 3 },
                { "path": "player.team.0.species", "type": "uint", "address": "partyBase", "reference": "species" }
            ],
            "references": {
                "species": [ { "key": 0, "value": null }, { "key": 153, "value": "Bulbasaur" } ]
            },
            "variables": { "partyBase": 0xD16B },
            "hooks": { "preprocessor": "preprocessor" }
        }))
        .unwrap()
    }

    #[test]
    fn test_compile_sample() {
        let compiled = sample().compile().unwrap();
        assert_eq!(compiled.metadata.game_name, "Pocket Monsters Red");
        assert_eq!(compiled.ranges, vec![MemoryRange::new(Address::new(0xC000), 0x2000)]);
        assert_eq!(compiled.registry.len(), 2);
        assert_eq!(compiled.variables.get("partyBase"), Some(0xD16B));
        assert_eq!(compiled.hooks.preprocessor.as_deref(), Some("preprocessor"));
    }

    #[test]
    fn test_declared_ranges_win() {
        let mut definition = sample();
        definition.memory_ranges = vec![MemoryRange::new(Address::new(0xD000), 0x100)];
        assert_eq!(definition.polling_ranges(), vec![MemoryRange::new(Address::new(0xD000), 0x100)]);

        definition.memory_ranges.clear();
        definition.platform.ranges.clear();
        definition.platform.memory_size = Some(0x800);
        assert_eq!(definition.polling_ranges(), vec![MemoryRange::new(Address::zero(), 0x800)]);

        definition.platform.memory_size = None;
        assert!(matches!(definition.compile(), Err(MapperError::NoRanges)));
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let mut definition = sample();
        definition.properties.push(
            PropertyDescriptor::new("player.badge", ValueKind::Uint)
                .with_address("0xD356")
                .with_reference("badges"),
        );
        assert!(matches!(
            definition.compile(),
            Err(MapperError::UnknownReference { table, .. }) if table == "badges"
        ));
    }

    #[test]
    fn test_bad_expression_and_duplicates_rejected() {
        let mut definition = sample();
        definition.properties.push(PropertyDescriptor::new("broken", ValueKind::Uint).with_address("0xD0 +"));
        assert!(matches!(definition.compile(), Err(MapperError::Registry(RegistryError::Property(_)))));

        let mut definition = sample();
        definition.properties.push(PropertyDescriptor::new("player.money", ValueKind::Uint).with_address("0x1"));
        assert!(matches!(
            definition.compile(),
            Err(MapperError::Registry(RegistryError::DuplicatePath(_)))
        ));
    }

    #[test]
    fn test_memory_presized_from_platform() {
        let mut definition = sample();
        definition.platform.memory_size = Some(0x10000);
        let memory = definition.compile().unwrap().memory_store();
        let fragments = memory.fragments(DEFAULT_NAMESPACE);
        assert_eq!(fragments.len(), 1);
        assert_eq!(memory.read(DEFAULT_NAMESPACE, Address::new(0xC000), 2).unwrap(), vec![0, 0]);

        definition.platform.memory_size = Some(0x100);
        let memory = definition.compile().unwrap().memory_store();
        assert!(memory.fragments(DEFAULT_NAMESPACE).is_empty());
    }

    #[test]
    fn test_two_terminators_rejected() {
        let mut definition = sample();
        definition.references.insert(
            "text".to_string(),
            crate::property::ReferenceTable::from_pairs(vec![(0x50, json!(null)), (0x00, json!(null))]),
        );
        assert!(matches!(definition.compile(), Err(MapperError::AmbiguousTerminator { count: 2, .. })));
    }
}
