use crate::error::{Error, Result};
use crate::models::{FlushRecord, StoredEntity, UpdateKind, UpdateRecord};
use crate::registry::{ClassRegistry, PersistentEntity};
use crate::storage::Storage;
use entrack_core::{
    ChangeTracker, ClassId, Entity, EntityHandle, ExtraUpdate, IdentityMap, LifecycleEvent,
    LifecycleSubscriber, ManagedEntity, ManagerRegistry, PropertyName, PropertyValue,
    TrackerOptions, UnitOfWork,
};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityState {
    New,
    Managed,
}

struct ManagedSlot {
    id: Uuid,
    state: EntityState,
    entity: Box<dyn Entity>,
}

struct PendingChange {
    old_value: PropertyValue,
    new_value: PropertyValue,
    kind: UpdateKind,
}

/// Identity map plus the changes pending for the next flush.
#[derive(Default)]
struct UnitOfWorkState {
    next_handle: u64,
    entities: BTreeMap<EntityHandle, ManagedSlot>,
    by_id: HashMap<Uuid, EntityHandle>,
    changes: BTreeMap<EntityHandle, BTreeMap<PropertyName, PendingChange>>,
    dirty: BTreeSet<EntityHandle>,
}

impl UnitOfWorkState {
    fn register(&mut self, id: Uuid, state: EntityState, entity: Box<dyn Entity>) -> EntityHandle {
        self.next_handle += 1;
        let handle = EntityHandle::new(self.next_handle);
        self.entities.insert(handle, ManagedSlot { id, state, entity });
        self.by_id.insert(id, handle);
        handle
    }

    fn remove(&mut self, handle: EntityHandle) -> Option<ManagedSlot> {
        let slot = self.entities.remove(&handle)?;
        self.by_id.remove(&slot.id);
        self.changes.remove(&handle);
        self.dirty.remove(&handle);
        Some(slot)
    }

    /// Drops every entity. Handles keep counting up so none is ever reused.
    fn reset(&mut self) {
        self.entities.clear();
        self.by_id.clear();
        self.changes.clear();
        self.dirty.clear();
    }

    fn record(
        &mut self,
        handle: EntityHandle,
        property: PropertyName,
        old_value: PropertyValue,
        new_value: PropertyValue,
        kind: UpdateKind,
    ) -> entrack_core::Result<()> {
        if !self.entities.contains_key(&handle) {
            return Err(entrack_core::Error::Host(format!("{} is not managed", handle)));
        }

        let pending = self.changes.entry(handle).or_default();
        match pending.get_mut(property) {
            Some(existing) => {
                existing.new_value = new_value;
                if kind == UpdateKind::Forced {
                    existing.kind = UpdateKind::Forced;
                }
            }
            None => {
                pending.insert(
                    property,
                    PendingChange {
                        old_value,
                        new_value,
                        kind,
                    },
                );
            }
        }

        Ok(())
    }
}

impl IdentityMap for UnitOfWorkState {
    fn managed(&self) -> Box<dyn Iterator<Item = ManagedEntity<'_>> + '_> {
        Box::new(self.entities.iter().map(|(handle, slot)| ManagedEntity {
            handle: *handle,
            entity: slot.entity.as_ref(),
        }))
    }

    fn contains(&self, handle: EntityHandle) -> bool {
        self.entities.contains_key(&handle)
    }

    fn len(&self) -> usize {
        self.entities.len()
    }
}

impl UnitOfWork for UnitOfWorkState {
    fn property_changed(
        &mut self,
        handle: EntityHandle,
        property: PropertyName,
        old_value: PropertyValue,
        new_value: PropertyValue,
    ) -> entrack_core::Result<()> {
        self.record(handle, property, old_value, new_value, UpdateKind::Notified)
    }

    fn schedule_extra_update(
        &mut self,
        handle: EntityHandle,
        update: ExtraUpdate,
    ) -> entrack_core::Result<()> {
        for (property, (old_value, new_value)) in update {
            self.record(handle, property, old_value, new_value, UpdateKind::Forced)?;
        }
        Ok(())
    }
}

fn check_class<E: PersistentEntity>(id: &Uuid, class: &str) -> Result<()> {
    if class != E::CLASS {
        return Err(Error::InvalidOperation(format!(
            "Entity {} is a {}, not a {}",
            id,
            class,
            E::CLASS
        )));
    }
    Ok(())
}

fn listens(subscriber: &dyn LifecycleSubscriber, event: LifecycleEvent) -> bool {
    subscriber.subscribed_events().contains(&event)
}

/// Loads, tracks and flushes entities of the classes in its registry.
///
/// Only new entities, notified or forced property changes, and entities
/// passed to [`EntityManager::mark_dirty`] are written on flush.
pub struct EntityManager {
    storage: Storage,
    registry: Arc<ClassRegistry>,
    unit_of_work: UnitOfWorkState,
    subscribers: Vec<Box<dyn LifecycleSubscriber>>,
}

impl EntityManager {
    pub fn new(storage: Storage, registry: Arc<ClassRegistry>) -> Self {
        Self {
            storage,
            registry,
            unit_of_work: UnitOfWorkState::default(),
            subscribers: Vec::new(),
        }
    }

    pub fn open<P: AsRef<Path>>(db_path: P, registry: Arc<ClassRegistry>) -> Result<Self> {
        Ok(Self::new(Storage::new(db_path)?, registry))
    }

    pub fn in_memory(registry: Arc<ClassRegistry>) -> Result<Self> {
        Ok(Self::new(Storage::in_memory()?, registry))
    }

    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    // Subscribers

    pub fn subscribe<S: LifecycleSubscriber>(&mut self, subscriber: S) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn with_subscriber<S: LifecycleSubscriber>(mut self, subscriber: S) -> Self {
        self.subscribe(subscriber);
        self
    }

    /// Subscribes a [`ChangeTracker`] configured from this manager's registry.
    pub fn with_change_tracker(self, options: TrackerOptions) -> Self {
        let registry = ManagerRegistry::new().with_manager(self.registry.clone());
        let tracker = ChangeTracker::new(registry).with_options(options);
        self.with_subscriber(tracker)
    }

    pub fn subscriber<S: LifecycleSubscriber>(&self) -> Option<&S> {
        self.subscribers
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<S>())
    }

    pub fn subscriber_mut<S: LifecycleSubscriber>(&mut self) -> Option<&mut S> {
        self.subscribers
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<S>())
    }

    pub fn change_tracker(&self) -> Option<&ChangeTracker> {
        self.subscriber::<ChangeTracker>()
    }

    // Identity map

    pub fn persist<E: PersistentEntity>(&mut self, entity: E) -> Result<EntityHandle> {
        if !self.registry.contains(E::CLASS) {
            return Err(Error::UnknownClass(E::CLASS.to_string()));
        }

        let id = entity.id();
        if self.unit_of_work.by_id.contains_key(&id) {
            return Err(Error::InvalidOperation(format!(
                "Entity {} is already managed",
                id
            )));
        }

        let handle = self
            .unit_of_work
            .register(id, EntityState::New, Box::new(entity));
        debug!("Persisting {} {} as {}", E::CLASS, id, handle);
        Ok(handle)
    }

    /// Returns the managed instance for `id`, loading it from storage first
    /// when it is not in the identity map yet.
    pub fn find<E: PersistentEntity>(&mut self, id: &Uuid) -> Result<Option<EntityHandle>> {
        if let Some(&handle) = self.unit_of_work.by_id.get(id) {
            if let Some(slot) = self.unit_of_work.entities.get(&handle) {
                check_class::<E>(id, slot.entity.class())?;
                return Ok(Some(handle));
            }
        }

        let stored = match self.storage.get_entity(id) {
            Ok(stored) => stored,
            Err(Error::EntityNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        check_class::<E>(id, &stored.class)?;
        self.load(stored).map(Some)
    }

    /// Loads every stored entity of `class`.
    pub fn find_all(&mut self, class: ClassId) -> Result<Vec<EntityHandle>> {
        if !self.registry.contains(class) {
            return Err(Error::UnknownClass(class.to_string()));
        }

        let mut handles = Vec::new();
        for stored in self.storage.list_entities(Some(class))? {
            let handle = match self.unit_of_work.by_id.get(&stored.id) {
                Some(handle) => *handle,
                None => self.load(stored)?,
            };
            handles.push(handle);
        }

        Ok(handles)
    }

    fn load(&mut self, stored: StoredEntity) -> Result<EntityHandle> {
        let entity = self.registry.decode(&stored.class, stored.body)?;
        let handle = self
            .unit_of_work
            .register(stored.id, EntityState::Managed, entity);
        debug!("Loaded {} {} as {}", stored.class, stored.id, handle);

        let entity = self.unit_of_work.entities[&handle].entity.as_ref();
        for subscriber in self.subscribers.iter_mut() {
            if listens(&**subscriber, LifecycleEvent::PostLoad) {
                subscriber.post_load(handle, entity)?;
            }
        }

        Ok(handle)
    }

    pub fn get<E: Any>(&self, handle: EntityHandle) -> Option<&E> {
        self.unit_of_work
            .entities
            .get(&handle)
            .and_then(|slot| slot.entity.as_any().downcast_ref::<E>())
    }

    /// Mutable access to a managed entity. Changes made through it are not
    /// seen by the unit of work.
    pub fn get_mut<E: Any>(&mut self, handle: EntityHandle) -> Option<&mut E> {
        self.unit_of_work
            .entities
            .get_mut(&handle)
            .and_then(|slot| slot.entity.as_any_mut().downcast_mut::<E>())
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<&dyn Entity> {
        self.unit_of_work
            .entities
            .get(&handle)
            .map(|slot| slot.entity.as_ref())
    }

    pub fn handle_of(&self, id: &Uuid) -> Option<EntityHandle> {
        self.unit_of_work.by_id.get(id).copied()
    }

    pub fn id_of(&self, handle: EntityHandle) -> Option<Uuid> {
        self.unit_of_work.entities.get(&handle).map(|slot| slot.id)
    }

    pub fn is_managed(&self, handle: EntityHandle) -> bool {
        self.unit_of_work.contains(handle)
    }

    pub fn managed_count(&self) -> usize {
        self.unit_of_work.len()
    }

    /// Writes the whole entity on the next flush.
    pub fn mark_dirty(&mut self, handle: EntityHandle) -> Result<()> {
        if !self.unit_of_work.contains(handle) {
            return Err(Error::NotManaged(handle.to_string()));
        }
        self.unit_of_work.dirty.insert(handle);
        Ok(())
    }

    /// Removes an entity from the identity map, dropping its pending changes.
    pub fn detach(&mut self, handle: EntityHandle) -> Result<()> {
        let slot = self
            .unit_of_work
            .remove(handle)
            .ok_or_else(|| Error::NotManaged(handle.to_string()))?;
        debug!("Detached {} {}", slot.entity.class(), handle);

        for subscriber in self.subscribers.iter_mut() {
            if listens(&**subscriber, LifecycleEvent::Detach) {
                subscriber.on_detach(handle)?;
            }
        }

        Ok(())
    }

    /// Detaches every entity.
    pub fn clear(&mut self) -> Result<()> {
        self.unit_of_work.reset();

        for subscriber in self.subscribers.iter_mut() {
            if listens(&**subscriber, LifecycleEvent::Clear) {
                subscriber.on_clear()?;
            }
        }

        Ok(())
    }

    /// Restores the tracked properties of `handle` from the change tracker's
    /// snapshots, discarding in-place mutations made since the last flush.
    pub fn revert(&mut self, handle: EntityHandle) -> Result<usize> {
        let slot = self
            .unit_of_work
            .entities
            .get_mut(&handle)
            .ok_or_else(|| Error::NotManaged(handle.to_string()))?;

        let tracker = self
            .subscribers
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<ChangeTracker>())
            .ok_or_else(|| {
                Error::InvalidOperation("No change tracker is subscribed".to_string())
            })?;

        let restored = tracker.revert(handle, slot.entity.as_mut())?;
        debug!("Reverted {} propert(ies) of {}", restored, handle);
        Ok(restored)
    }

    // Flush

    /// Writes new entities and every pending change in one transaction.
    ///
    /// Subscribers get `pre_flush` before the changes are computed and
    /// `post_flush` once they are committed. A flush that writes nothing is
    /// not recorded.
    pub fn flush(&mut self) -> Result<FlushRecord> {
        for subscriber in self.subscribers.iter_mut() {
            if listens(&**subscriber, LifecycleEvent::PreFlush) {
                subscriber.pre_flush(&mut self.unit_of_work)?;
            }
        }

        let mut flush = FlushRecord::new();
        let mut rows = Vec::new();
        let mut updates = Vec::new();

        for (handle, slot) in &self.unit_of_work.entities {
            let pending = self.unit_of_work.changes.get(handle);
            match slot.state {
                EntityState::New => flush.inserted += 1,
                EntityState::Managed => {
                    if pending.is_none() && !self.unit_of_work.dirty.contains(handle) {
                        continue;
                    }
                    flush.updated += 1;
                }
            }

            let class = slot.entity.class();
            let (id, body) = self.registry.encode(slot.entity.as_ref())?;
            rows.push(StoredEntity::new(id, class, body));

            if slot.state == EntityState::New {
                continue;
            }

            for (property, change) in pending.into_iter().flatten() {
                updates.push(
                    UpdateRecord::new(flush.id, id, class, *property, change.kind).with_values(
                        format!("{:#?}", change.old_value),
                        format!("{:#?}", change.new_value),
                    ),
                );
            }
        }

        flush.updates = updates.iter().map(|u| u.id).collect();

        if !flush.is_empty() {
            let written = self.storage.commit_flush(&rows, &flush, &updates)?;
            let forced = updates
                .iter()
                .filter(|u| u.kind == UpdateKind::Forced)
                .count();
            info!(
                "Flush {} committed: {} insert(s), {} update(s), {} forced, {} row(s) written",
                flush.id, flush.inserted, flush.updated, forced, written
            );
        }

        for slot in self.unit_of_work.entities.values_mut() {
            slot.state = EntityState::Managed;
        }
        self.unit_of_work.changes.clear();
        self.unit_of_work.dirty.clear();

        for subscriber in self.subscribers.iter_mut() {
            if listens(&**subscriber, LifecycleEvent::PostFlush) {
                subscriber.post_flush(&self.unit_of_work)?;
            }
        }

        Ok(flush)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Album, Playlist};
    use entrack_core::EntityClass;
    use tempfile::TempDir;

    fn registry() -> Arc<ClassRegistry> {
        Arc::new(ClassRegistry::new().register::<Playlist>())
    }

    fn tracked_manager(registry: Arc<ClassRegistry>) -> EntityManager {
        EntityManager::in_memory(registry)
            .unwrap()
            .with_change_tracker(TrackerOptions::default())
    }

    /// Persists a playlist, then reloads it so it comes back through `find`.
    fn seed(manager: &mut EntityManager, tracks: &[&str]) -> (Uuid, EntityHandle) {
        let playlist = Playlist::new("Road trip", tracks);
        let id = playlist.id;
        manager.persist(playlist).unwrap();
        manager.flush().unwrap();
        manager.clear().unwrap();
        let handle = manager.find::<Playlist>(&id).unwrap().unwrap();
        (id, handle)
    }

    fn stored_tracks(manager: &EntityManager, id: &Uuid) -> serde_json::Value {
        manager.storage().get_entity(id).unwrap().body["tracks"].clone()
    }

    #[test]
    fn test_in_place_mutation_is_lost_without_tracker() {
        let mut manager = EntityManager::in_memory(registry()).unwrap();
        let (id, handle) = seed(&mut manager, &["a", "b"]);

        manager
            .get_mut::<Playlist>(handle)
            .unwrap()
            .tracks
            .push("c".to_string());
        let flush = manager.flush().unwrap();

        assert!(flush.is_empty());
        assert_eq!(stored_tracks(&manager, &id), serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_tracker_forces_in_place_mutation() {
        let mut manager = tracked_manager(registry());
        let (id, handle) = seed(&mut manager, &["a", "b"]);

        manager
            .get_mut::<Playlist>(handle)
            .unwrap()
            .tracks
            .push("c".to_string());
        let flush = manager.flush().unwrap();

        assert_eq!(flush.updated, 1);
        assert_eq!(flush.updates.len(), 1);
        assert_eq!(
            stored_tracks(&manager, &id),
            serde_json::json!(["a", "b", "c"])
        );

        let update = manager.storage().get_update(&flush.updates[0]).unwrap();
        assert_eq!(update.kind, UpdateKind::Forced);
        assert_eq!(update.property, "tracks");
        assert_eq!(update.entity_id, id);
        assert!(update.old_value.contains("\"b\""));
        assert!(!update.old_value.contains("\"c\""));
        assert!(update.new_value.contains("\"c\""));

        let tracker = manager.change_tracker().unwrap();
        let snapshot = tracker.snapshot(handle, "tracks").unwrap();
        assert_eq!(snapshot.downcast_ref::<Vec<String>>().unwrap().len(), 3);

        let second = manager.flush().unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn test_untracked_property_needs_mark_dirty() {
        let mut manager = tracked_manager(registry());
        let (id, handle) = seed(&mut manager, &["a"]);

        manager.get_mut::<Playlist>(handle).unwrap().plays = 5;
        assert!(manager.flush().unwrap().is_empty());

        manager.mark_dirty(handle).unwrap();
        let flush = manager.flush().unwrap();

        assert_eq!(flush.updated, 1);
        assert!(flush.updates.is_empty());
        assert_eq!(
            manager.storage().get_entity(&id).unwrap().body["plays"],
            serde_json::json!(5)
        );
    }

    #[test]
    fn test_persisted_entity_is_tracked_after_first_flush() {
        let mut manager = tracked_manager(registry());
        let playlist = Playlist::new("Fresh", &["x"]);
        let id = playlist.id;
        let handle = manager.persist(playlist).unwrap();

        let flush = manager.flush().unwrap();
        assert_eq!(flush.inserted, 1);

        manager
            .get_mut::<Playlist>(handle)
            .unwrap()
            .tracks
            .clear();
        let flush = manager.flush().unwrap();

        assert_eq!(flush.updated, 1);
        assert_eq!(stored_tracks(&manager, &id), serde_json::json!([]));
    }

    #[test]
    fn test_proxied_entities_are_tracked() {
        let registry = Arc::new(ClassRegistry::new().register_proxied::<Playlist>());
        let mut manager = tracked_manager(registry);
        let (id, handle) = seed(&mut manager, &["a"]);

        manager
            .get_mut::<Playlist>(handle)
            .unwrap()
            .tracks
            .push("b".to_string());
        let flush = manager.flush().unwrap();

        assert_eq!(flush.updated, 1);
        assert_eq!(stored_tracks(&manager, &id), serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_find_returns_managed_instance() {
        let mut manager = tracked_manager(registry());
        let (id, handle) = seed(&mut manager, &["a"]);

        assert_eq!(manager.find::<Playlist>(&id).unwrap(), Some(handle));
        assert_eq!(manager.find::<Playlist>(&Uuid::new_v4()).unwrap(), None);
        assert_eq!(manager.handle_of(&id), Some(handle));
        assert_eq!(manager.id_of(handle), Some(id));
    }

    #[test]
    fn test_find_rejects_other_class_whether_managed_or_not() {
        let registry = Arc::new(
            ClassRegistry::new()
                .register::<Playlist>()
                .register::<Album>(),
        );
        let mut manager = tracked_manager(registry);
        let (id, handle) = seed(&mut manager, &["a"]);
        assert!(manager.is_managed(handle));

        assert!(matches!(
            manager.find::<Album>(&id),
            Err(Error::InvalidOperation(_))
        ));

        manager.clear().unwrap();
        assert!(matches!(
            manager.find::<Album>(&id),
            Err(Error::InvalidOperation(_))
        ));
        assert_eq!(manager.managed_count(), 0);
    }

    #[test]
    fn test_all_drifted_properties_land_in_one_flush() {
        let registry = Arc::new(ClassRegistry::new().register::<Album>());
        let mut manager = tracked_manager(registry);
        let album = Album::new(&["one"]);
        let id = album.id;
        manager.persist(album).unwrap();
        manager.flush().unwrap();
        manager.clear().unwrap();
        let handle = manager.find::<Album>(&id).unwrap().unwrap();

        let album = manager.get_mut::<Album>(handle).unwrap();
        album.cover = Some("front.png".to_string());
        album.tracks.push("two".to_string());
        let flush = manager.flush().unwrap();

        assert_eq!(flush.updated, 1);
        let updates = manager.storage().get_updates_for_flush(&flush.id).unwrap();
        let mut properties: Vec<_> = updates.iter().map(|u| u.property.as_str()).collect();
        properties.sort();
        assert_eq!(properties, vec!["cover", "tracks"]);
        assert!(updates.iter().all(|u| u.kind == UpdateKind::Forced));

        let stored = manager.storage().get_entity(&id).unwrap().body;
        assert_eq!(stored["cover"], serde_json::json!("front.png"));
        assert_eq!(stored["tracks"], serde_json::json!(["one", "two"]));

        assert!(manager.flush().unwrap().is_empty());
    }

    #[test]
    fn test_find_all_loads_every_entity() {
        let mut manager = tracked_manager(registry());
        for name in ["one", "two", "three"] {
            manager.persist(Playlist::new(name, &[])).unwrap();
        }
        manager.flush().unwrap();
        manager.clear().unwrap();

        let handles = manager.find_all(Playlist::CLASS).unwrap();

        assert_eq!(handles.len(), 3);
        assert_eq!(manager.managed_count(), 3);
        assert_eq!(manager.change_tracker().unwrap().tracked_entity_count(), 3);
    }

    #[test]
    fn test_detach_evicts_snapshots() {
        let mut manager = tracked_manager(registry());
        let (_, handle) = seed(&mut manager, &["a"]);
        assert_eq!(manager.change_tracker().unwrap().snapshot_count(), 1);

        manager.detach(handle).unwrap();

        assert!(!manager.is_managed(handle));
        assert_eq!(manager.change_tracker().unwrap().snapshot_count(), 0);
        assert!(matches!(manager.detach(handle), Err(Error::NotManaged(_))));
    }

    #[test]
    fn test_clear_never_reuses_handles() {
        let mut manager = tracked_manager(registry());
        let (id, first) = seed(&mut manager, &["a"]);

        manager.clear().unwrap();
        let second = manager.find::<Playlist>(&id).unwrap().unwrap();

        assert_ne!(first, second);
        assert!(manager.change_tracker().unwrap().snapshot(first, "tracks").is_none());
        assert!(manager.change_tracker().unwrap().snapshot(second, "tracks").is_some());
    }

    #[test]
    fn test_persist_rejects_duplicates_and_unknown_classes() {
        let mut manager = EntityManager::in_memory(Arc::new(ClassRegistry::new())).unwrap();
        assert!(matches!(
            manager.persist(Playlist::new("x", &[])),
            Err(Error::UnknownClass(_))
        ));

        let mut manager = tracked_manager(registry());
        let playlist = Playlist::new("x", &[]);
        manager.persist(playlist.clone()).unwrap();
        assert!(matches!(
            manager.persist(playlist),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_revert_through_subscriber() {
        let mut manager = tracked_manager(registry());
        let (_, handle) = seed(&mut manager, &["a"]);

        manager
            .get_mut::<Playlist>(handle)
            .unwrap()
            .tracks
            .push("b".to_string());

        let mut entity = manager.get::<Playlist>(handle).unwrap().clone();
        let tracker = manager.subscriber_mut::<ChangeTracker>().unwrap();
        assert_eq!(tracker.revert(handle, &mut entity).unwrap(), 1);
        assert_eq!(entity.tracks, vec!["a".to_string()]);
    }

    #[test]
    fn test_revert_discards_in_place_mutation() {
        let mut manager = tracked_manager(registry());
        let (id, handle) = seed(&mut manager, &["a"]);

        manager
            .get_mut::<Playlist>(handle)
            .unwrap()
            .tracks
            .push("b".to_string());

        assert_eq!(manager.revert(handle).unwrap(), 1);
        assert_eq!(
            manager.get::<Playlist>(handle).unwrap().tracks,
            vec!["a".to_string()]
        );
        assert!(manager.flush().unwrap().is_empty());
        assert_eq!(stored_tracks(&manager, &id), serde_json::json!(["a"]));
    }

    #[test]
    fn test_revert_requires_tracker() {
        let mut manager = EntityManager::in_memory(registry()).unwrap();
        let (_, handle) = seed(&mut manager, &["a"]);

        assert!(matches!(
            manager.revert(handle),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_changes_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("entrack.db");
        let id;

        {
            let mut manager = EntityManager::open(&db_path, registry())
                .unwrap()
                .with_change_tracker(TrackerOptions::default());
            let (seeded, handle) = seed(&mut manager, &["a"]);
            id = seeded;
            manager
                .get_mut::<Playlist>(handle)
                .unwrap()
                .tracks
                .push("b".to_string());
            manager.flush().unwrap();
        }

        let mut manager = EntityManager::open(&db_path, registry()).unwrap();
        let handle = manager.find::<Playlist>(&id).unwrap().unwrap();

        assert_eq!(
            manager.get::<Playlist>(handle).unwrap().tracks,
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(manager.storage().list_flushes().unwrap().len(), 2);
    }
}
