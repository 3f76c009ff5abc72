//! Per-prefix measurement table.
//!
//! Each entry carries a typed slot for the strategy's [`ForwardingInfo`]:
//! the table owns the storage lifetime, the strategy owns the contents.
//! There are no back-references; the strategy looks entries up by prefix at
//! each event.

use std::collections::HashMap;

use pcon_core::name::Name;

use crate::strategy::info::ForwardingInfo;

pub struct MeasurementEntry {
    prefix: Name,
    pub info: Option<ForwardingInfo>,
}

impl MeasurementEntry {
    pub fn prefix(&self) -> &Name {
        &self.prefix
    }
}

#[derive(Default)]
pub struct Measurements {
    entries: HashMap<Name, MeasurementEntry>,
}

impl Measurements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, prefix: &Name) -> &mut MeasurementEntry {
        self.entries
            .entry(prefix.clone())
            .or_insert_with(|| MeasurementEntry {
                prefix: prefix.clone(),
                info: None,
            })
    }

    pub fn get(&self, prefix: &Name) -> Option<&MeasurementEntry> {
        self.entries.get(prefix)
    }

    /// Longest-prefix-match over the entries that exist.
    pub fn find_longest_prefix_match(&mut self, name: &Name) -> Option<&mut MeasurementEntry> {
        let prefix = name.prefixes().find(|p| self.entries.contains_key(p))?;
        self.entries.get_mut(&prefix)
    }

    /// Drop a prefix and whatever the strategy stored under it.
    pub fn evict(&mut self, prefix: &Name) -> Option<MeasurementEntry> {
        self.entries.remove(prefix)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
