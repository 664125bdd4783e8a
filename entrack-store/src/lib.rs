//! # entrack-store
//!
//! Reference host for entrack: an entity manager with an identity map, a
//! notify-policy unit of work and SQLite storage.
//!
//! The unit of work only writes what it is told about: new entities,
//! property change notifications, extra updates and entities explicitly
//! marked dirty. In-place mutation of a loaded entity is invisible to it
//! unless a [`entrack_core::ChangeTracker`] is subscribed.

pub mod diff;
pub mod error;
#[cfg(test)]
mod fixtures;
pub mod manager;
pub mod models;
pub mod proxy;
pub mod registry;
pub mod storage;

pub use error::{Error, Result};
pub use manager::EntityManager;
pub use models::{FlushInfo, FlushRecord, StoredEntity, UpdateKind, UpdateRecord};
pub use proxy::LazyProxy;
pub use registry::{ClassRegistry, PersistentEntity};
pub use storage::Storage;
