//! Class metadata as declared by the host, and the accessor capability used
//! to read and write one property of one class.
//!
//! A property opts into change tracking by being declared with
//! [`ClassMetadata::tracked`] rather than [`ClassMetadata::property`].

use crate::error::{Error, Result};
use crate::host::{ClassId, Entity, PropertyName};
use crate::value::{PropertyValue, TrackedValue};
use std::any::{self, Any};
use std::fmt;
use std::sync::Arc;

type Reader = Arc<dyn Fn(&dyn Any) -> Result<PropertyValue> + Send + Sync>;
type Writer = Arc<dyn Fn(&mut dyn Any, PropertyValue) -> Result<()> + Send + Sync>;

/// Typed getter/setter pair for one property, built once per class.
#[derive(Clone)]
pub struct PropertyAccessor {
    class: ClassId,
    property: PropertyName,
    value_type: &'static str,
    read: Reader,
    write: Writer,
}

impl PropertyAccessor {
    pub fn new<E, V>(
        class: ClassId,
        property: PropertyName,
        get: fn(&E) -> &V,
        get_mut: fn(&mut E) -> &mut V,
    ) -> Self
    where
        E: Any,
        V: TrackedValue + Clone,
    {
        let entity_type = any::type_name::<E>();
        let value_type = any::type_name::<V>();

        let read = move |entity: &dyn Any| -> Result<PropertyValue> {
            let entity = entity
                .downcast_ref::<E>()
                .ok_or(Error::EntityTypeMismatch {
                    class,
                    expected: entity_type,
                })?;
            Ok(PropertyValue::new(get(entity).clone()))
        };

        let write = move |entity: &mut dyn Any, value: PropertyValue| -> Result<()> {
            let entity = entity
                .downcast_mut::<E>()
                .ok_or(Error::EntityTypeMismatch {
                    class,
                    expected: entity_type,
                })?;
            let actual = value.type_name();
            let value = value
                .into_inner::<V>()
                .ok_or(Error::ValueTypeMismatch {
                    class,
                    property,
                    expected: value_type,
                    actual,
                })?;
            *get_mut(entity) = value;
            Ok(())
        };

        Self {
            class,
            property,
            value_type,
            read: Arc::new(read),
            write: Arc::new(write),
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn property(&self) -> PropertyName {
        self.property
    }

    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    /// Reads a deep copy of the property's current value.
    pub fn read(&self, entity: &dyn Entity) -> Result<PropertyValue> {
        (self.read)(entity.as_any())
    }

    pub fn write(&self, entity: &mut dyn Entity, value: PropertyValue) -> Result<()> {
        (self.write)(entity.as_any_mut(), value)
    }
}

impl fmt::Debug for PropertyAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyAccessor")
            .field("class", &self.class)
            .field("property", &self.property)
            .field("value_type", &self.value_type)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PropertyMetadata {
    pub name: PropertyName,
    /// Carries the tracking marker.
    pub tracked: bool,
    pub accessor: PropertyAccessor,
}

#[derive(Debug, Clone)]
pub struct ClassMetadata {
    pub class: ClassId,
    pub properties: Vec<PropertyMetadata>,
}

impl ClassMetadata {
    pub fn new(class: ClassId) -> Self {
        Self {
            class,
            properties: Vec::new(),
        }
    }

    /// Declares a property without the tracking marker.
    pub fn property<E, V>(
        self,
        name: PropertyName,
        get: fn(&E) -> &V,
        get_mut: fn(&mut E) -> &mut V,
    ) -> Self
    where
        E: Any,
        V: TrackedValue + Clone,
    {
        let accessor = PropertyAccessor::new(self.class, name, get, get_mut);
        self.declare(name, false, accessor)
    }

    /// Declares a property carrying the tracking marker.
    pub fn tracked<E, V>(
        self,
        name: PropertyName,
        get: fn(&E) -> &V,
        get_mut: fn(&mut E) -> &mut V,
    ) -> Self
    where
        E: Any,
        V: TrackedValue + Clone,
    {
        let accessor = PropertyAccessor::new(self.class, name, get, get_mut);
        self.declare(name, true, accessor)
    }

    fn declare(mut self, name: PropertyName, tracked: bool, accessor: PropertyAccessor) -> Self {
        self.properties.retain(|p| p.name != name);
        self.properties.push(PropertyMetadata {
            name,
            tracked,
            accessor,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn tracked_properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.iter().filter(|p| p.tracked)
    }
}

/// An entity type that declares its own metadata.
pub trait EntityClass: Entity + Sized {
    const CLASS: ClassId;

    fn metadata() -> ClassMetadata;
}

/// Metadata of every class one entity manager knows about.
pub trait MetadataSource: Send + Sync {
    fn all_metadata(&self) -> Vec<ClassMetadata>;
}

impl MetadataSource for Vec<ClassMetadata> {
    fn all_metadata(&self) -> Vec<ClassMetadata> {
        self.clone()
    }
}

/// Every entity manager the process knows about.
#[derive(Clone, Default)]
pub struct ManagerRegistry {
    managers: Vec<Arc<dyn MetadataSource>>,
}

impl ManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manager(mut self, manager: Arc<dyn MetadataSource>) -> Self {
        self.add_manager(manager);
        self
    }

    pub fn add_manager(&mut self, manager: Arc<dyn MetadataSource>) {
        self.managers.push(manager);
    }

    pub fn managers(&self) -> &[Arc<dyn MetadataSource>] {
        &self.managers
    }
}

impl fmt::Debug for ManagerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerRegistry")
            .field("managers", &self.managers.len())
            .finish()
    }
}
