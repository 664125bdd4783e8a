//! # entrack
//!
//! Dirty-checking for entity properties that are mutated in place.
//!
//! [`entrack_core`] holds the change tracker and the host interfaces it plugs
//! into; [`entrack_store`] is a SQLite-backed entity manager that hosts it.

pub use entrack_core;
pub use entrack_store;

pub use entrack_core::{
    ChangeTracker, ClassId, ClassMetadata, Entity, EntityClass, TrackerOptions,
};
pub use entrack_store::{ClassRegistry, EntityManager, PersistentEntity, UpdateKind};
