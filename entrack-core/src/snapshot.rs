use crate::host::{EntityHandle, PropertyName};
use crate::value::PropertyValue;
use std::collections::HashMap;

/// Last observed value of every tracked property, per entity.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: HashMap<EntityHandle, HashMap<PropertyName, PropertyValue>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, replacing any earlier snapshot of the same property.
    pub fn capture(&mut self, handle: EntityHandle, property: PropertyName, value: PropertyValue) {
        self.entries.entry(handle).or_default().insert(property, value);
    }

    pub fn get(&self, handle: EntityHandle, property: &str) -> Option<&PropertyValue> {
        self.entries.get(&handle).and_then(|p| p.get(property))
    }

    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Removes every snapshot of `handle`, returning how many there were.
    pub fn remove_entity(&mut self, handle: EntityHandle) -> usize {
        self.entries.remove(&handle).map_or(0, |p| p.len())
    }

    /// Keeps only entities for which `keep` returns true. Returns the number
    /// of entities dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(EntityHandle) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|handle, _| keep(*handle));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entity_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of (entity, property) entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
