use std::collections::HashMap;

use glam::Vec3;

use crate::scene::MarkerHandle;

/// Lookups from a stable record id to its placed marker. Holds no ownership;
/// cleared together with the arena whenever the record set changes.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    entries: HashMap<String, RegistryEntry>,
}

#[derive(Debug, Clone, Copy)]
struct RegistryEntry {
    marker: MarkerHandle,
    position: Vec3,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later registrations of the same id replace earlier ones.
    pub fn register(&mut self, id: impl Into<String>, marker: MarkerHandle, position: Vec3) {
        self.entries.insert(id.into(), RegistryEntry { marker, position });
    }

    pub fn lookup(&self, id: &str) -> Option<MarkerHandle> {
        self.entries.get(id).map(|entry| entry.marker)
    }

    pub fn position_of(&self, id: &str) -> Option<Vec3> {
        self.entries.get(id).map(|entry| entry.position)
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
