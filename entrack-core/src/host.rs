//! Interfaces the host persistence engine exposes to the tracker.
//!
//! The host owns entities, their identity map and the unit of work. The
//! tracker only sees them through these traits and is driven by the host
//! through [`LifecycleSubscriber`] callbacks.

use crate::error::Result;
use crate::value::PropertyValue;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a persisted class.
pub type ClassId = &'static str;

pub type PropertyName = &'static str;

/// Stable identity of one managed entity instance.
///
/// Assigned by the host's identity map and never reused while the host
/// lives, so a stale snapshot can never be matched against a different
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityHandle(u64);

impl EntityHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value mapped to persistent storage by the host.
pub trait Entity: Any + Send + Sync {
    /// The persisted class. Lazy-loading proxies report their target's class.
    fn class(&self) -> ClassId;

    /// The persisted value accessors operate on. Proxies expose their target.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Clone, Copy)]
pub struct ManagedEntity<'a> {
    pub handle: EntityHandle,
    pub entity: &'a dyn Entity,
}

/// Read access to every entity the host currently manages.
pub trait IdentityMap {
    fn managed(&self) -> Box<dyn Iterator<Item = ManagedEntity<'_>> + '_>;

    fn contains(&self, handle: EntityHandle) -> bool;

    fn len(&self) -> usize {
        self.managed().count()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Property changes forced into a flush: `property -> (old, new)`.
pub type ExtraUpdate = BTreeMap<PropertyName, (PropertyValue, PropertyValue)>;

/// The host's in-flight unit of work during a flush.
pub trait UnitOfWork: IdentityMap {
    fn property_changed(
        &mut self,
        handle: EntityHandle,
        property: PropertyName,
        old_value: PropertyValue,
        new_value: PropertyValue,
    ) -> Result<()>;

    /// Includes `update` in the current flush even when the host's own
    /// change computation found nothing to write for `handle`.
    fn schedule_extra_update(&mut self, handle: EntityHandle, update: ExtraUpdate) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    PostLoad,
    PreFlush,
    PostFlush,
    Detach,
    Clear,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &str {
        match self {
            LifecycleEvent::PostLoad => "postLoad",
            LifecycleEvent::PreFlush => "preFlush",
            LifecycleEvent::PostFlush => "postFlush",
            LifecycleEvent::Detach => "detach",
            LifecycleEvent::Clear => "clear",
        }
    }
}

/// Callbacks a host invokes for the events a subscriber lists in
/// [`LifecycleSubscriber::subscribed_events`].
pub trait LifecycleSubscriber: Any {
    fn subscribed_events(&self) -> &'static [LifecycleEvent];

    /// An entity was materialized from storage.
    fn post_load(&mut self, _handle: EntityHandle, _entity: &dyn Entity) -> Result<()> {
        Ok(())
    }

    /// A flush is starting; nothing has been committed yet.
    fn pre_flush(&mut self, _uow: &mut dyn UnitOfWork) -> Result<()> {
        Ok(())
    }

    /// A flush committed.
    fn post_flush(&mut self, _identity_map: &dyn IdentityMap) -> Result<()> {
        Ok(())
    }

    /// An entity left the identity map without being flushed away.
    fn on_detach(&mut self, _handle: EntityHandle) -> Result<()> {
        Ok(())
    }

    /// The identity map was emptied.
    fn on_clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
