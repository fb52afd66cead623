// Wed Feb 18 2026 - Alex

use crate::property::reference::Lookup;
use crate::property::{PropertyError, PropertyValue, ReferenceTable, ValueKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Everything besides the raw bytes that decoding or encoding depends on.
#[derive(Debug, Clone, Copy)]
pub struct CodecContext<'a> {
    pub endianness: Endianness,
    pub element_size: usize,
    pub reference_name: Option<&'a str>,
    pub reference: Option<&'a ReferenceTable>,
}

impl<'a> CodecContext<'a> {
    pub fn new(endianness: Endianness) -> Self {
        Self {
            endianness,
            element_size: 1,
            reference_name: None,
            reference: None,
        }
    }

    pub fn with_element_size(mut self, size: usize) -> Self {
        self.element_size = size.max(1);
        self
    }

    pub fn with_reference(mut self, name: &'a str, table: &'a ReferenceTable) -> Self {
        self.reference_name = Some(name);
        self.reference = Some(table);
        self
    }

    fn table_name(&self) -> String {
        self.reference_name.unwrap_or("<none>").to_string()
    }
}

const MAX_INTEGER_BYTES: usize = 4;
/// 18 digits always fit in an i64.
const MAX_BCD_BYTES: usize = 9;

/// Longest span `kind` can decode, `None` when unbounded.
pub fn max_length(kind: ValueKind) -> Option<usize> {
    match kind {
        ValueKind::Int | ValueKind::Uint => Some(MAX_INTEGER_BYTES),
        ValueKind::Bcd => Some(MAX_BCD_BYTES),
        _ => None,
    }
}

pub fn decode(kind: ValueKind, bytes: &[u8], ctx: &CodecContext<'_>) -> Result<PropertyValue, PropertyError> {
    if bytes.is_empty() {
        return Err(PropertyError::UnsupportedLength(0));
    }

    let raw = match kind {
        ValueKind::Int => PropertyValue::Integer(decode_integer(bytes, ctx.endianness, true)?),
        ValueKind::Uint => PropertyValue::Integer(decode_integer(bytes, ctx.endianness, false)?),
        ValueKind::Bool => PropertyValue::Boolean(bytes.iter().any(|&b| b != 0)),
        ValueKind::BitArray => PropertyValue::Bits(decode_bits(bytes)),
        ValueKind::Bcd => PropertyValue::Integer(decode_bcd(bytes)?),
        ValueKind::String => return decode_string(bytes, ctx),
        ValueKind::Custom => return Ok(PropertyValue::Null),
    };

    match (ctx.reference, &raw) {
        (Some(table), PropertyValue::Integer(_)) | (Some(table), PropertyValue::Boolean(_)) => {
            // Negative keys never match a table entry.
            let Ok(key) = u64::try_from(raw.as_i64().unwrap_or_default()) else {
                return Ok(PropertyValue::Null);
            };
            Ok(match table.lookup(key) {
                Lookup::Found(value) => PropertyValue::from_json(value),
                Lookup::Terminator | Lookup::Missing => PropertyValue::Null,
            })
        }
        _ => Ok(raw),
    }
}

pub fn encode(
    kind: ValueKind,
    value: &PropertyValue,
    length: usize,
    ctx: &CodecContext<'_>,
) -> Result<Vec<u8>, PropertyError> {
    if length == 0 {
        return Err(PropertyError::UnsupportedLength(0));
    }

    if kind == ValueKind::String {
        return encode_string(value, length, ctx);
    }

    let value = match ctx.reference {
        Some(table) => {
            let key = table.key_for(value).ok_or_else(|| PropertyError::MissingReferenceValue {
                table: ctx.table_name(),
                value: value.to_string(),
            })?;
            PropertyValue::Integer(key as i64)
        }
        None => value.clone(),
    };

    match kind {
        ValueKind::Int | ValueKind::Uint => {
            let number = value
                .as_i64()
                .ok_or_else(|| PropertyError::invalid_value(&value, "expected an integer"))?;
            encode_integer(number, length, ctx.endianness, kind == ValueKind::Int)
        }
        ValueKind::Bool => {
            let flag = value
                .as_bool()
                .ok_or_else(|| PropertyError::invalid_value(&value, "expected a boolean"))?;
            let mut out = vec![0u8; length];
            if flag {
                let lsb = match ctx.endianness {
                    Endianness::Little => 0,
                    Endianness::Big => length - 1,
                };
                out[lsb] = 1;
            }
            Ok(out)
        }
        ValueKind::BitArray => match &value {
            PropertyValue::Bits(bits) => encode_bits(bits, length),
            other => Err(PropertyError::invalid_value(other, "expected a bit array")),
        },
        ValueKind::Bcd => {
            let number = value
                .as_i64()
                .ok_or_else(|| PropertyError::invalid_value(&value, "expected an integer"))?;
            encode_bcd(number, length)
        }
        ValueKind::Custom => Err(PropertyError::invalid_value(
            &value,
            "custom properties have no encoder, write raw bytes instead",
        )),
        ValueKind::String => unreachable!("handled above"),
    }
}

fn decode_integer(bytes: &[u8], endianness: Endianness, signed: bool) -> Result<i64, PropertyError> {
    if bytes.len() == 1 {
        return Ok(bytes[0] as i64);
    }
    if bytes.len() > MAX_INTEGER_BYTES {
        return Err(PropertyError::UnsupportedLength(bytes.len()));
    }

    let accumulator = fold_integer(bytes, endianness) as u32;
    if signed {
        let shift = 32 - 8 * bytes.len() as u32;
        Ok((((accumulator << shift) as i32) >> shift) as i64)
    } else {
        Ok(accumulator as i64)
    }
}

fn fold_integer(bytes: &[u8], endianness: Endianness) -> u64 {
    let fold = |acc: u64, b: &u8| (acc << 8) | *b as u64;
    match endianness {
        Endianness::Big => bytes.iter().fold(0, fold),
        Endianness::Little => bytes.iter().rev().fold(0, fold),
    }
}

fn encode_integer(value: i64, length: usize, endianness: Endianness, signed: bool) -> Result<Vec<u8>, PropertyError> {
    if length > MAX_INTEGER_BYTES {
        return Err(PropertyError::UnsupportedLength(length));
    }

    let bits = 8 * length as u32;
    let max_unsigned = (1i64 << bits) - 1;
    let min = if signed { -(1i64 << (bits - 1)) } else { 0 };
    if value < min || value > max_unsigned {
        return Err(PropertyError::invalid_value(
            value,
            format!("does not fit in {} byte(s)", length),
        ));
    }

    let le = (value as u64).to_le_bytes();
    let mut out = le[..length].to_vec();
    if endianness == Endianness::Big {
        out.reverse();
    }
    Ok(out)
}

fn decode_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).map(move |bit| byte & (1 << bit) != 0))
        .collect()
}

fn encode_bits(bits: &[bool], length: usize) -> Result<Vec<u8>, PropertyError> {
    if bits.len() > length * 8 {
        return Err(PropertyError::LengthMismatch {
            expected: length,
            actual: (bits.len() + 7) / 8,
        });
    }
    let mut out = vec![0u8; length];
    for (i, _) in bits.iter().enumerate().filter(|(_, on)| **on) {
        out[i / 8] |= 1 << (i % 8);
    }
    Ok(out)
}

fn decode_bcd(bytes: &[u8]) -> Result<i64, PropertyError> {
    if bytes.len() > MAX_BCD_BYTES {
        return Err(PropertyError::UnsupportedLength(bytes.len()));
    }
    Ok(bytes
        .iter()
        .fold(0i64, |acc, &b| acc * 100 + 10 * (b >> 4) as i64 + (b & 0x0F) as i64))
}

fn encode_bcd(value: i64, length: usize) -> Result<Vec<u8>, PropertyError> {
    if length > MAX_BCD_BYTES {
        return Err(PropertyError::UnsupportedLength(length));
    }
    if value < 0 {
        return Err(PropertyError::invalid_value(value, "BCD values cannot be negative"));
    }
    let mut out = vec![0u8; length];
    let mut remaining = value;
    for byte in out.iter_mut().rev() {
        let pair = remaining % 100;
        *byte = (((pair / 10) as u8) << 4) | (pair % 10) as u8;
        remaining /= 100;
    }
    if remaining != 0 {
        return Err(PropertyError::invalid_value(
            value,
            format!("needs more than {} BCD byte(s)", length),
        ));
    }
    Ok(out)
}

fn decode_string(bytes: &[u8], ctx: &CodecContext<'_>) -> Result<PropertyValue, PropertyError> {
    let Some(table) = ctx.reference else {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        return Ok(PropertyValue::Text(String::from_utf8_lossy(&bytes[..end]).into_owned()));
    };

    let mut text = String::new();
    for chunk in bytes.chunks(ctx.element_size) {
        if chunk.len() < ctx.element_size {
            break;
        }
        match table.lookup(fold_integer(chunk, ctx.endianness)) {
            Lookup::Found(Value::String(s)) => text.push_str(s),
            Lookup::Found(other) => text.push_str(&other.to_string()),
            Lookup::Terminator | Lookup::Missing => break,
        }
    }
    Ok(PropertyValue::Text(text))
}

fn encode_string(value: &PropertyValue, length: usize, ctx: &CodecContext<'_>) -> Result<Vec<u8>, PropertyError> {
    let text = match value {
        PropertyValue::Text(s) => s.clone(),
        other => other.to_string(),
    };

    let Some(table) = ctx.reference else {
        let mut out = text.into_bytes();
        if out.len() > length {
            return Err(PropertyError::LengthMismatch { expected: length, actual: out.len() });
        }
        out.resize(length, 0);
        return Ok(out);
    };

    let size = ctx.element_size;
    let mut out = Vec::with_capacity(length);
    for ch in text.chars() {
        let key = table
            .key_for(&PropertyValue::Text(ch.to_string()))
            .ok_or_else(|| PropertyError::MissingReferenceValue {
                table: ctx.table_name(),
                value: ch.to_string(),
            })?;
        out.extend(key_bytes(key, size, ctx.endianness));
    }
    if out.len() > length {
        return Err(PropertyError::LengthMismatch { expected: length, actual: out.len() });
    }

    let filler = key_bytes(table.terminator_key().unwrap_or(0), size, ctx.endianness);
    while out.len() + size <= length {
        out.extend_from_slice(&filler);
    }
    out.resize(length, 0);
    Ok(out)
}

fn key_bytes(key: u64, size: usize, endianness: Endianness) -> Vec<u8> {
    let le = key.to_le_bytes();
    let mut out: Vec<u8> = (0..size).map(|i| le.get(i).copied().unwrap_or(0)).collect();
    if endianness == Endianness::Big {
        out.reverse();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn le() -> CodecContext<'static> {
        CodecContext::new(Endianness::Little)
    }

    fn be() -> CodecContext<'static> {
        CodecContext::new(Endianness::Big)
    }

    fn charset() -> ReferenceTable {
        ReferenceTable::from_pairs(vec![
            (0x50, Value::Null),
            (0x80, json!("A")),
            (0x81, json!("B")),
            (0x82, json!("C")),
        ])
    }

    #[test]
    fn test_endianness() {
        assert_eq!(decode(ValueKind::Uint, &[0x34, 0x12], &le()).unwrap(), PropertyValue::Integer(0x1234));
        assert_eq!(decode(ValueKind::Uint, &[0x12, 0x34], &be()).unwrap(), PropertyValue::Integer(0x1234));
    }

    #[test]
    fn test_signed_and_unsigned() {
        assert_eq!(decode(ValueKind::Int, &[0xFF, 0xFF], &le()).unwrap(), PropertyValue::Integer(-1));
        assert_eq!(decode(ValueKind::Uint, &[0xFF, 0xFF], &le()).unwrap(), PropertyValue::Integer(0xFFFF));
        assert_eq!(decode(ValueKind::Int, &[0x00, 0x80, 0xFF], &be()).unwrap(), PropertyValue::Integer(0x0080FF));
        assert_eq!(
            decode(ValueKind::Int, &[0xFF, 0xFF, 0xFF, 0xFF], &be()).unwrap(),
            PropertyValue::Integer(-1)
        );
        assert_eq!(decode(ValueKind::Int, &[0xFE], &le()).unwrap(), PropertyValue::Integer(0xFE));
        assert!(matches!(
            decode(ValueKind::Uint, &[0; 5], &le()),
            Err(PropertyError::UnsupportedLength(5))
        ));
    }

    #[test]
    fn test_bool_and_bits() {
        assert_eq!(decode(ValueKind::Bool, &[0x00], &le()).unwrap(), PropertyValue::Boolean(false));
        assert_eq!(decode(ValueKind::Bool, &[0x40], &le()).unwrap(), PropertyValue::Boolean(true));
        let bits = decode(ValueKind::BitArray, &[0b0000_0101, 0x80], &le()).unwrap();
        let PropertyValue::Bits(bits) = bits else { panic!("expected bits") };
        assert_eq!(bits.len(), 16);
        assert!(bits[0] && !bits[1] && bits[2] && bits[15]);
    }

    #[test]
    fn test_bcd() {
        assert_eq!(decode(ValueKind::Bcd, &[0x12, 0x34], &le()).unwrap(), PropertyValue::Integer(1234));
        assert_eq!(encode(ValueKind::Bcd, &PropertyValue::Integer(1234), 2, &le()).unwrap(), vec![0x12, 0x34]);
        assert_eq!(encode(ValueKind::Bcd, &PropertyValue::Integer(7), 3, &le()).unwrap(), vec![0, 0, 0x07]);
        assert!(encode(ValueKind::Bcd, &PropertyValue::Integer(10000), 2, &le()).is_err());
    }

    #[test]
    fn test_bcd_too_long() {
        assert!(matches!(
            decode(ValueKind::Bcd, &[0x99; 12], &le()),
            Err(PropertyError::UnsupportedLength(12))
        ));
        assert_eq!(
            decode(ValueKind::Bcd, &[0x99; 9], &le()).unwrap(),
            PropertyValue::Integer(999_999_999_999_999_999)
        );
        assert!(matches!(
            encode(ValueKind::Bcd, &PropertyValue::Integer(1), 10, &le()),
            Err(PropertyError::UnsupportedLength(10))
        ));
        assert_eq!(max_length(ValueKind::Bcd), Some(9));
        assert_eq!(max_length(ValueKind::String), None);
    }

    #[test]
    fn test_negative_reference_key_is_missing() {
        let table = ReferenceTable::from_pairs(vec![(1u64, json!("UP")), (u64::MAX, json!("WRAPPED"))]);
        let ctx = le().with_reference("direction", &table);
        assert_eq!(decode(ValueKind::Int, &[0xFF, 0xFF], &ctx).unwrap(), PropertyValue::Null);
        assert_eq!(decode(ValueKind::Int, &[0x01, 0x00], &ctx).unwrap(), PropertyValue::from("UP"));
    }

    #[test]
    fn test_reference_mapped_integer() {
        let table = ReferenceTable::from_pairs(vec![(1u64, json!("POISONED")), (2, json!("BURNED"))]);
        let ctx = le().with_reference("status", &table);
        assert_eq!(decode(ValueKind::Uint, &[2], &ctx).unwrap(), PropertyValue::from("BURNED"));
        assert_eq!(decode(ValueKind::Uint, &[9], &ctx).unwrap(), PropertyValue::Null);
        assert_eq!(encode(ValueKind::Uint, &PropertyValue::from("POISONED"), 1, &ctx).unwrap(), vec![1]);
        assert!(matches!(
            encode(ValueKind::Uint, &PropertyValue::from("FROZEN"), 1, &ctx),
            Err(PropertyError::MissingReferenceValue { .. })
        ));
    }

    #[test]
    fn test_string_single_byte() {
        let table = charset();
        let ctx = le().with_reference("charset", &table);
        let value = decode(ValueKind::String, &[0x80, 0x81, 0x50, 0x82], &ctx).unwrap();
        assert_eq!(value, PropertyValue::from("AB"));
        let value = decode(ValueKind::String, &[0x82, 0x99, 0x80], &ctx).unwrap();
        assert_eq!(value, PropertyValue::from("C"));
    }

    #[test]
    fn test_string_multi_byte_elements() {
        let table = ReferenceTable::from_pairs(vec![(0xFFFF, Value::Null), (0x0102, json!("X")), (0x0304, json!("Y"))]);
        let ctx = be().with_element_size(2).with_reference("charset", &table);
        let value = decode(ValueKind::String, &[0x01, 0x02, 0x03, 0x04, 0xFF, 0xFF], &ctx).unwrap();
        assert_eq!(value, PropertyValue::from("XY"));
        let bytes = encode(ValueKind::String, &PropertyValue::from("YX"), 6, &ctx).unwrap();
        assert_eq!(bytes, vec![0x03, 0x04, 0x01, 0x02, 0xFF, 0xFF]);
    }

    #[test]
    fn test_string_encode_pads_with_terminator() {
        let table = charset();
        let ctx = le().with_reference("charset", &table);
        assert_eq!(
            encode(ValueKind::String, &PropertyValue::from("BA"), 4, &ctx).unwrap(),
            vec![0x81, 0x80, 0x50, 0x50]
        );
        assert!(matches!(
            encode(ValueKind::String, &PropertyValue::from("ABCAB"), 4, &ctx),
            Err(PropertyError::LengthMismatch { expected: 4, actual: 5 })
        ));
    }

    #[test]
    fn test_plain_string_without_table() {
        assert_eq!(decode(ValueKind::String, b"RED\0\0", &le()).unwrap(), PropertyValue::from("RED"));
        assert_eq!(encode(ValueKind::String, &PropertyValue::from("RED"), 5, &le()).unwrap(), b"RED\0\0".to_vec());
    }

    #[test]
    fn test_encode_integers() {
        assert_eq!(encode(ValueKind::Uint, &PropertyValue::Integer(0x1234), 2, &le()).unwrap(), vec![0x34, 0x12]);
        assert_eq!(encode(ValueKind::Uint, &PropertyValue::Integer(0x1234), 2, &be()).unwrap(), vec![0x12, 0x34]);
        assert_eq!(encode(ValueKind::Int, &PropertyValue::Integer(-2), 2, &le()).unwrap(), vec![0xFE, 0xFF]);
        assert!(encode(ValueKind::Uint, &PropertyValue::Integer(256), 1, &le()).is_err());
        assert!(encode(ValueKind::Uint, &PropertyValue::Integer(-1), 1, &le()).is_err());
    }

    #[test]
    fn test_encode_bool_and_bits() {
        assert_eq!(encode(ValueKind::Bool, &PropertyValue::Boolean(true), 2, &be()).unwrap(), vec![0, 1]);
        assert_eq!(
            encode(ValueKind::BitArray, &PropertyValue::Bits(vec![true, false, true]), 1, &le()).unwrap(),
            vec![0b101]
        );
        assert!(encode(ValueKind::Custom, &PropertyValue::Integer(1), 1, &le()).is_err());
    }
}
