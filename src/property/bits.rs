// Wed Feb 18 2026 - Alex

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static SINGLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\s*$").expect("valid regex"));
static RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\s*-\s*(\d+)\s*$").expect("valid regex"));
static LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+\s*(,\s*\d+\s*)+$").expect("valid regex"));

/// Ordered list of bit positions picked out of a property's bytes.
///
/// Position `i` addresses bit `i % 8` (least significant first) of byte `i / 8`,
/// counted across the whole span in memory order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSelector {
    source: String,
    positions: Vec<usize>,
}

impl BitSelector {
    /// Accepts `"N"`, an inclusive `"A-B"` or a list `"A,B,C"`. Every position
    /// must fit inside `length` bytes.
    pub fn parse(source: &str, length: usize) -> Result<Self, String> {
        let positions = if let Some(caps) = SINGLE.captures(source) {
            vec![parse_index(&caps[1])?]
        } else if let Some(caps) = RANGE.captures(source) {
            let start = parse_index(&caps[1])?;
            let end = parse_index(&caps[2])?;
            if start > end {
                return Err(format!("range start {} is after end {}", start, end));
            }
            (start..=end).collect()
        } else if LIST.is_match(source) {
            source
                .split(',')
                .map(|part| parse_index(part.trim()))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            return Err("expected \"N\", \"A-B\" or \"A,B,C\"".to_string());
        };

        let capacity = length * 8;
        if let Some(&out_of_range) = positions.iter().find(|&&p| p >= capacity) {
            return Err(format!("bit {} is outside a {}-byte value", out_of_range, length));
        }
        if positions.len() > capacity {
            return Err(format!("{} bits selected but only {} available", positions.len(), capacity));
        }

        Ok(Self {
            source: source.trim().to_string(),
            positions,
        })
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Copy the selected bits, in order, into bits `0..n` of a zeroed buffer
    /// the same length as `bytes`.
    pub fn extract(&self, bytes: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; bytes.len()];
        for (target, &source) in self.positions.iter().enumerate() {
            if get_bit(bytes, source) {
                set_bit(&mut out, target, true);
            }
        }
        out
    }

    /// Whether `value` sets any bit the selector has no room for.
    pub fn overflows(&self, value: &[u8]) -> bool {
        (self.len()..value.len() * 8).any(|bit| get_bit(value, bit))
    }

    /// Inverse of [`extract`](Self::extract): write bits `0..n` of `value` back
    /// into their selected positions of a copy of `base`.
    pub fn splice(&self, base: &[u8], value: &[u8]) -> Vec<u8> {
        let mut out = base.to_vec();
        for (source, &target) in self.positions.iter().enumerate() {
            set_bit(&mut out, target, get_bit(value, source));
        }
        out
    }
}

impl fmt::Display for BitSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_index(text: &str) -> Result<usize, String> {
    text.parse::<usize>()
        .map_err(|_| format!("'{}' is not a bit index", text))
}

fn get_bit(bytes: &[u8], position: usize) -> bool {
    bytes
        .get(position / 8)
        .map(|byte| byte & (1 << (position % 8)) != 0)
        .unwrap_or(false)
}

fn set_bit(bytes: &mut [u8], position: usize, on: bool) {
    if let Some(byte) = bytes.get_mut(position / 8) {
        let mask = 1 << (position % 8);
        if on {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }
}
