use crate::config::{TrackerOptions, TrackingConfiguration};
use crate::error::{Error, Result};
use crate::host::{
    ClassId, Entity, EntityHandle, ExtraUpdate, IdentityMap, LifecycleEvent, LifecycleSubscriber,
    PropertyName, UnitOfWork,
};
use crate::metadata::ManagerRegistry;
use crate::snapshot::SnapshotStore;
use crate::value::PropertyValue;
use std::any::Any;
use tracing::{debug, info, warn};

const SUBSCRIBED_EVENTS: &[LifecycleEvent] = &[
    LifecycleEvent::PostLoad,
    LifecycleEvent::PreFlush,
    LifecycleEvent::PostFlush,
    LifecycleEvent::Detach,
    LifecycleEvent::Clear,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Uninitialized,
    Configured,
}

/// A tracked property whose value drifted from its snapshot.
#[derive(Debug, Clone)]
pub struct PropertyChange {
    pub handle: EntityHandle,
    pub class: ClassId,
    pub property: PropertyName,
    pub old_value: PropertyValue,
    pub new_value: PropertyValue,
}

/// Detects in-place mutation of tracked properties and forces the changed
/// properties into the host's flush.
///
/// Snapshots are taken when an entity is loaded and after every flush. When
/// a flush starts, every snapshot is compared with the live value; each
/// difference is reported to the unit of work as a property change and
/// scheduled as an extra update.
#[derive(Debug)]
pub struct ChangeTracker {
    registry: ManagerRegistry,
    options: TrackerOptions,
    configuration: Option<TrackingConfiguration>,
    snapshots: SnapshotStore,
}

impl ChangeTracker {
    pub fn new(registry: ManagerRegistry) -> Self {
        Self {
            registry,
            options: TrackerOptions::default(),
            configuration: None,
            snapshots: SnapshotStore::new(),
        }
    }

    pub fn with_options(mut self, options: TrackerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TrackerOptions {
        &self.options
    }

    pub fn state(&self) -> TrackerState {
        match self.configuration {
            Some(_) => TrackerState::Configured,
            None => TrackerState::Uninitialized,
        }
    }

    /// Resolves the tracking configuration on first call; later calls reuse it.
    pub fn configure(&mut self) -> &TrackingConfiguration {
        self.configuration
            .get_or_insert_with(|| TrackingConfiguration::resolve(&self.registry))
    }

    pub fn configuration(&self) -> Option<&TrackingConfiguration> {
        self.configuration.as_ref()
    }

    pub fn snapshot(&self, handle: EntityHandle, property: &str) -> Option<&PropertyValue> {
        self.snapshots.get(handle, property)
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn tracked_entity_count(&self) -> usize {
        self.snapshots.entity_count()
    }

    /// Snapshots every tracked property of `entity`, replacing older entries.
    /// Returns the number of properties captured.
    pub fn track(&mut self, handle: EntityHandle, entity: &dyn Entity) -> Result<usize> {
        self.configure();
        let Some(configuration) = &self.configuration else {
            return Ok(0);
        };

        let class = entity.class();
        let Some(properties) = configuration.properties(class) else {
            return Ok(0);
        };

        for (&property, accessor) in properties {
            let value = accessor.read(entity)?;
            self.snapshots.capture(handle, property, value);
        }

        debug!(
            "Captured {} snapshot(s) for {} {}",
            properties.len(),
            class,
            handle
        );

        Ok(properties.len())
    }

    /// Compares every snapshot with the live value and forces each changed
    /// property into the current flush.
    ///
    /// Properties without a snapshot are skipped. A forced property's
    /// snapshot is refreshed immediately, so reconciling again without
    /// further mutation finds nothing.
    pub fn reconcile(&mut self, uow: &mut dyn UnitOfWork) -> Result<Vec<PropertyChange>> {
        self.configure();
        let Some(configuration) = &self.configuration else {
            return Ok(Vec::new());
        };
        if configuration.is_empty() {
            return Ok(Vec::new());
        }

        let mut changes = Vec::new();
        for managed in uow.managed() {
            let class = managed.entity.class();
            let Some(properties) = configuration.properties(class) else {
                continue;
            };

            for (&property, accessor) in properties {
                let Some(snapshot) = self.snapshots.get(managed.handle, property) else {
                    continue;
                };

                let current = accessor.read(managed.entity)?;
                let unchanged = snapshot
                    .try_eq(&current)
                    .ok_or(Error::IncomparableValues {
                        class,
                        property,
                        snapshot: snapshot.type_name(),
                        current: current.type_name(),
                    })?;

                if !unchanged {
                    changes.push(PropertyChange {
                        handle: managed.handle,
                        class,
                        property,
                        old_value: snapshot.clone(),
                        new_value: current,
                    });
                }
            }
        }

        for change in &changes {
            if self.options.log_changes {
                info!(
                    "Forcing update of {}.{} on {}: {:?} -> {:?}",
                    change.class, change.property, change.handle, change.old_value, change.new_value
                );
            }

            uow.property_changed(
                change.handle,
                change.property,
                change.old_value.clone(),
                change.new_value.clone(),
            )?;

            let mut update = ExtraUpdate::new();
            update.insert(
                change.property,
                (change.old_value.clone(), change.new_value.clone()),
            );
            uow.schedule_extra_update(change.handle, update)?;

            self.snapshots
                .capture(change.handle, change.property, change.new_value.clone());
        }

        Ok(changes)
    }

    /// Re-snapshots every managed entity after a flush committed and, unless
    /// disabled, drops snapshots of entities that are no longer managed.
    pub fn resync(&mut self, identity_map: &dyn IdentityMap) -> Result<()> {
        for managed in identity_map.managed() {
            self.track(managed.handle, managed.entity)?;
        }

        if self.options.evict_orphans {
            let evicted = self.snapshots.retain(|handle| identity_map.contains(handle));
            if evicted > 0 {
                warn!("Evicted snapshots of {} unmanaged entities", evicted);
            }
        }

        Ok(())
    }

    /// Forgets every snapshot of `handle`.
    pub fn evict(&mut self, handle: EntityHandle) -> usize {
        let removed = self.snapshots.remove_entity(handle);
        if removed > 0 {
            debug!("Evicted {} snapshot(s) for {}", removed, handle);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Writes the snapshot values back into `entity`, discarding in-place
    /// mutation since the last load or flush. Returns the number of
    /// properties restored.
    pub fn revert(&mut self, handle: EntityHandle, entity: &mut dyn Entity) -> Result<usize> {
        self.configure();
        let Some(configuration) = &self.configuration else {
            return Ok(0);
        };
        let Some(properties) = configuration.properties(entity.class()) else {
            return Ok(0);
        };

        let mut restored = 0;
        for (&property, accessor) in properties {
            if let Some(snapshot) = self.snapshots.get(handle, property) {
                accessor.write(entity, snapshot.clone())?;
                restored += 1;
            }
        }

        Ok(restored)
    }
}

impl LifecycleSubscriber for ChangeTracker {
    fn subscribed_events(&self) -> &'static [LifecycleEvent] {
        SUBSCRIBED_EVENTS
    }

    fn post_load(&mut self, handle: EntityHandle, entity: &dyn Entity) -> Result<()> {
        self.track(handle, entity)?;
        Ok(())
    }

    fn pre_flush(&mut self, uow: &mut dyn UnitOfWork) -> Result<()> {
        self.reconcile(uow)?;
        Ok(())
    }

    fn post_flush(&mut self, identity_map: &dyn IdentityMap) -> Result<()> {
        self.configure();
        self.resync(identity_map)
    }

    fn on_detach(&mut self, handle: EntityHandle) -> Result<()> {
        self.evict(handle);
        Ok(())
    }

    fn on_clear(&mut self) -> Result<()> {
        self.clear();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
