use crate::host::{ClassId, PropertyName};
use crate::metadata::{ManagerRegistry, PropertyAccessor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Tracked properties per class, resolved once from host metadata.
#[derive(Debug, Clone, Default)]
pub struct TrackingConfiguration {
    classes: HashMap<ClassId, BTreeMap<PropertyName, PropertyAccessor>>,
}

impl TrackingConfiguration {
    /// Collects every property carrying the tracking marker on every class
    /// of every manager. Finding none is valid.
    pub fn resolve(registry: &ManagerRegistry) -> Self {
        let mut classes: HashMap<ClassId, BTreeMap<PropertyName, PropertyAccessor>> =
            HashMap::new();

        for manager in registry.managers() {
            for metadata in manager.all_metadata() {
                for property in metadata.tracked_properties() {
                    debug!("Tracking {}.{}", metadata.class, property.name);
                    classes
                        .entry(metadata.class)
                        .or_default()
                        .insert(property.name, property.accessor.clone());
                }
            }
        }

        let configuration = Self { classes };
        info!(
            "Change tracking resolved: {} properties across {} classes",
            configuration.property_count(),
            configuration.class_count()
        );

        configuration
    }

    pub fn properties(&self, class: ClassId) -> Option<&BTreeMap<PropertyName, PropertyAccessor>> {
        self.classes.get(class)
    }

    pub fn accessor(&self, class: ClassId, property: &str) -> Option<&PropertyAccessor> {
        self.classes.get(class).and_then(|p| p.get(property))
    }

    pub fn is_tracked(&self, class: ClassId, property: &str) -> bool {
        self.accessor(class, property).is_some()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn property_count(&self) -> usize {
        self.classes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerOptions {
    /// Drop snapshots of entities that are no longer managed once a flush
    /// completes.
    pub evict_orphans: bool,
    /// Log every forced update at info level.
    pub log_changes: bool,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            evict_orphans: true,
            log_changes: true,
        }
    }
}

impl TrackerOptions {
    pub fn with_evict_orphans(mut self, evict_orphans: bool) -> Self {
        self.evict_orphans = evict_orphans;
        self
    }

    pub fn with_log_changes(mut self, log_changes: bool) -> Self {
        self.log_changes = log_changes;
        self
    }
}
