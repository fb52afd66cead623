// Tue Feb 17 2026 - Alex

use ahash::AHashMap;

/// Runtime variables referenced by address expressions. A variable bound to
/// `None` is known but currently unusable, which makes dependent addresses
/// unresolved rather than failing.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: AHashMap<String, Option<i64>>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied().flatten()
    }

    pub fn set(&mut self, name: &str, value: Option<i64>) {
        self.values.insert(name.to_string(), value);
    }

}

impl<S: Into<String>> FromIterator<(S, Option<i64>)> for Variables {
    fn from_iter<T: IntoIterator<Item = (S, Option<i64>)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
