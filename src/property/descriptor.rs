// Wed Feb 18 2026 - Alex

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "unsigned")]
    Uint,
    #[serde(alias = "boolean")]
    Bool,
    #[serde(alias = "bits")]
    BitArray,
    Bcd,
    String,
    Custom,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Uint => "uint",
            ValueKind::Bool => "bool",
            ValueKind::BitArray => "bitArray",
            ValueKind::Bcd => "bcd",
            ValueKind::String => "string",
            ValueKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable description of one property, as produced by a mapper loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default = "default_length")]
    pub length: usize,
    /// Bytes per character for multi-byte string encodings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_length() -> usize {
    1
}

impl PropertyDescriptor {
    pub fn new(path: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            path: path.into(),
            kind,
            static_value: None,
            address: None,
            length: 1,
            size: None,
            bits: None,
            reference: None,
            memory_container: None,
            before_read: None,
            after_read: None,
            description: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_bits(mut self, bits: impl Into<String>) -> Self {
        self.bits = Some(bits.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_static_value(mut self, value: Value) -> Self {
        self.static_value = Some(value);
        self
    }

    pub fn with_memory_container(mut self, container: impl Into<String>) -> Self {
        self.memory_container = Some(container.into());
        self
    }

    pub fn with_hooks(mut self, before_read: Option<&str>, after_read: Option<&str>) -> Self {
        self.before_read = before_read.map(str::to_string);
        self.after_read = after_read.map(str::to_string);
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.address.is_none() && self.static_value.is_none()
    }

    pub fn element_size(&self) -> usize {
        self.size.unwrap_or(1).max(1)
    }
}
