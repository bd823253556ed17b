//! Symbol Tables
//!
//! Each contract and each function owns one table mapping names to the values
//! it contains. Names inside one table are unique; a colliding name is made
//! unique by appending a counter that only ever grows.

use crate::handles::ValueId;
use log::trace;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    map: BTreeMap<String, ValueId>,
    last_unique: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<ValueId> {
        self.map.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, ValueId)> + '_ {
        self.map.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Insert `value` under `name`, or under a uniqued variant of it
    ///
    /// Returns the name actually used. Global values are uniqued as
    /// `name.N`, everything else as `nameN`.
    pub(crate) fn insert_unique(&mut self, name: &str, value: ValueId, is_global: bool) -> String {
        if !self.map.contains_key(name) {
            self.map.insert(name.to_string(), value);
            return name.to_string();
        }

        loop {
            self.last_unique += 1;
            let candidate = if is_global {
                format!("{}.{}", name, self.last_unique)
            } else {
                format!("{}{}", name, self.last_unique)
            };
            if !self.map.contains_key(&candidate) {
                trace!("symbol '{}' already taken, renamed to '{}'", name, candidate);
                self.map.insert(candidate.clone(), value);
                return candidate;
            }
        }
    }

    /// Drop `name` if and only if it still maps to `value`
    pub(crate) fn remove(&mut self, name: &str, value: ValueId) {
        if self.map.get(name) == Some(&value) {
            self.map.remove(name);
        }
    }
}
