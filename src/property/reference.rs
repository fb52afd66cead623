// Wed Feb 18 2026 - Alex

use crate::property::PropertyValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub key: u64,
    #[serde(default)]
    pub value: Value,
}

/// Result of looking a key up in a [`ReferenceTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a Value),
    /// The table's single null entry, used as an end-of-string marker.
    Terminator,
    Missing,
}

/// Ordered key/value glossary mapping raw integers to readable values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceTable {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceTable {
    pub fn new(entries: Vec<ReferenceEntry>) -> Self {
        Self { entries }
    }

    pub fn from_pairs<I, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u64, V)>,
        V: Into<Value>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(key, value)| ReferenceEntry { key, value: value.into() })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, key: u64) -> Lookup<'_> {
        match self.entries.iter().find(|e| e.key == key) {
            Some(entry) if entry.value.is_null() => Lookup::Terminator,
            Some(entry) => Lookup::Found(&entry.value),
            None => Lookup::Missing,
        }
    }

    /// Key of the entry whose value equals `value`, either structurally or by its
    /// textual form so user input like `"5"` matches a numeric entry.
    pub fn key_for(&self, value: &PropertyValue) -> Option<u64> {
        if value.is_null() {
            return self.terminator_key();
        }
        let text = value.to_string();
        self.entries
            .iter()
            .filter(|e| !e.value.is_null())
            .find(|e| {
                let candidate = PropertyValue::from_json(&e.value);
                candidate == *value || candidate.to_string() == text
            })
            .map(|e| e.key)
    }

    pub fn terminator_key(&self) -> Option<u64> {
        self.entries.iter().find(|e| e.value.is_null()).map(|e| e.key)
    }

    pub fn null_entries(&self) -> usize {
        self.entries.iter().filter(|e| e.value.is_null()).count()
    }
}

pub type ReferenceTables = IndexMap<String, ReferenceTable>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> ReferenceTable {
        serde_json::from_value(json!([
            {"key": 0, "value": null},
            {"key": 1, "value": "BULBASAUR"},
            {"key": 4, "value": 25},
        ]))
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let table = table();
        assert_eq!(table.lookup(0), Lookup::Terminator);
        assert_eq!(table.lookup(1), Lookup::Found(&json!("BULBASAUR")));
        assert_eq!(table.lookup(9), Lookup::Missing);
    }

    #[test]
    fn test_key_for() {
        let table = table();
        assert_eq!(table.key_for(&PropertyValue::from("BULBASAUR")), Some(1));
        assert_eq!(table.key_for(&PropertyValue::Integer(25)), Some(4));
        assert_eq!(table.key_for(&PropertyValue::from("25")), Some(4));
        assert_eq!(table.key_for(&PropertyValue::Null), Some(0));
        assert_eq!(table.key_for(&PropertyValue::from("MEW")), None);
        assert_eq!(table.null_entries(), 1);
    }
}
