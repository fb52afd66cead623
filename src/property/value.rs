// Wed Feb 18 2026 - Alex

use crate::property::ValueKind;
use crate::property::PropertyError;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Decoded property value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Text(String),
    Bits(Vec<bool>),
    Json(Value),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(n) => Some(*n),
            PropertyValue::Boolean(b) => Some(*b as i64),
            PropertyValue::Json(v) => v.as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            PropertyValue::Integer(n) => Some(*n != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Integer(i),
                None => PropertyValue::Json(value.clone()),
            },
            Value::String(s) => PropertyValue::Text(s.clone()),
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_boolean) => {
                PropertyValue::Bits(items.iter().map(|b| b.as_bool().unwrap_or(false)).collect())
            }
            other => PropertyValue::Json(other.clone()),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Parse user-supplied text for a property of `kind`. Reference-mapped
    /// properties keep the text verbatim; it is matched against table values later.
    pub fn parse_text(kind: ValueKind, text: &str, reference_mapped: bool) -> Result<Self, PropertyError> {
        let trimmed = text.trim();
        if reference_mapped || kind == ValueKind::String {
            return Ok(PropertyValue::Text(text.to_string()));
        }

        match kind {
            ValueKind::Int | ValueKind::Uint | ValueKind::Bcd => parse_integer(trimmed)
                .map(PropertyValue::Integer)
                .ok_or_else(|| PropertyError::invalid_value(trimmed, "expected an integer")),
            ValueKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(PropertyValue::Boolean(true)),
                "false" | "0" => Ok(PropertyValue::Boolean(false)),
                _ => Err(PropertyError::invalid_value(trimmed, "expected true or false")),
            },
            ValueKind::BitArray => trimmed
                .chars()
                .map(|c| match c {
                    '0' => Ok(false),
                    '1' => Ok(true),
                    _ => Err(PropertyError::invalid_value(trimmed, "expected a string of 0 and 1")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(PropertyValue::Bits),
            ValueKind::String | ValueKind::Custom => Ok(PropertyValue::Text(text.to_string())),
        }
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Integer(n) => write!(f, "{}", n),
            PropertyValue::Text(s) => write!(f, "{}", s),
            PropertyValue::Bits(bits) => {
                for bit in bits {
                    f.write_str(if *bit { "1" } else { "0" })?;
                }
                Ok(())
            }
            PropertyValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        assert_eq!(PropertyValue::from_json(&json!(null)), PropertyValue::Null);
        assert_eq!(PropertyValue::from_json(&json!(7)), PropertyValue::Integer(7));
        assert_eq!(PropertyValue::from_json(&json!("PIKACHU")), PropertyValue::Text("PIKACHU".into()));
        assert_eq!(
            PropertyValue::from_json(&json!([true, false])),
            PropertyValue::Bits(vec![true, false])
        );
        assert!(matches!(PropertyValue::from_json(&json!({"a": 1})), PropertyValue::Json(_)));
    }

    #[test]
    fn test_parse_text() {
        assert_eq!(PropertyValue::parse_text(ValueKind::Uint, "0x1F", false).unwrap(), PropertyValue::Integer(31));
        assert_eq!(PropertyValue::parse_text(ValueKind::Int, "-12", false).unwrap(), PropertyValue::Integer(-12));
        assert_eq!(PropertyValue::parse_text(ValueKind::Bool, "TRUE", false).unwrap(), PropertyValue::Boolean(true));
        assert_eq!(
            PropertyValue::parse_text(ValueKind::BitArray, "101", false).unwrap(),
            PropertyValue::Bits(vec![true, false, true])
        );
        assert_eq!(PropertyValue::parse_text(ValueKind::Uint, "BULBASAUR", true).unwrap(), PropertyValue::from("BULBASAUR"));
        assert!(PropertyValue::parse_text(ValueKind::Uint, "abc", false).is_err());
        assert!(PropertyValue::parse_text(ValueKind::Bool, "maybe", false).is_err());
    }

    #[test]
    fn test_serializes_untagged() {
        assert_eq!(PropertyValue::Integer(5).to_json(), json!(5));
        assert_eq!(PropertyValue::Null.to_json(), json!(null));
        assert_eq!(PropertyValue::Bits(vec![true]).to_json(), json!([true]));
    }
}
