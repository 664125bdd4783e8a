//! # entrack-core
//!
//! Dirty-checking for entity properties that are mutated in place, where the
//! host persistence engine's own change detection cannot see the mutation.
//!
//! The [`ChangeTracker`] hooks into the host's lifecycle: it snapshots every
//! tracked property when an entity is loaded, compares the snapshots with
//! the live values when a flush starts, forces every drifted property into
//! the flush as an extra update and re-snapshots once the flush committed.
//!
//! Hosts expose their identity map and unit of work through the traits in
//! [`host`], and declare which properties are tracked through
//! [`metadata::ClassMetadata`].

pub mod config;
pub mod error;
pub mod host;
pub mod metadata;
pub mod snapshot;
pub mod tracker;
pub mod value;

pub use config::{TrackerOptions, TrackingConfiguration};
pub use error::{Error, Result};
pub use host::{
    ClassId, Entity, EntityHandle, ExtraUpdate, IdentityMap, LifecycleEvent, LifecycleSubscriber,
    ManagedEntity, PropertyName, UnitOfWork,
};
pub use metadata::{
    ClassMetadata, EntityClass, ManagerRegistry, MetadataSource, PropertyAccessor, PropertyMetadata,
};
pub use snapshot::SnapshotStore;
pub use tracker::{ChangeTracker, PropertyChange, TrackerState};
pub use value::{PropertyValue, TrackedValue};
