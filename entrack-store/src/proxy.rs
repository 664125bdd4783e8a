use entrack_core::{ClassId, Entity, EntityClass};
use std::any::Any;

/// Stand-in the manager hands out for classes registered with
/// [`crate::ClassRegistry::register_proxied`].
///
/// The proxy reports its target's class and exposes the target to property
/// accessors, so tracking configuration resolves against the persisted
/// class rather than the proxy type.
pub struct LazyProxy<E> {
    target: E,
}

impl<E: EntityClass> LazyProxy<E> {
    pub fn new(target: E) -> Self {
        Self { target }
    }
}

impl<E: EntityClass> Entity for LazyProxy<E> {
    fn class(&self) -> ClassId {
        E::CLASS
    }

    fn as_any(&self) -> &dyn Any {
        &self.target
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.target
    }
}
