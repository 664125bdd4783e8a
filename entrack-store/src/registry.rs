use crate::error::{Error, Result};
use crate::proxy::LazyProxy;
use entrack_core::{ClassId, ClassMetadata, Entity, EntityClass, MetadataSource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// An entity type the manager can store and load.
pub trait PersistentEntity: EntityClass + Serialize + DeserializeOwned {
    fn id(&self) -> Uuid;
}

type Encoder = fn(&dyn Entity) -> Result<(Uuid, serde_json::Value)>;
type Decoder = fn(serde_json::Value) -> Result<Box<dyn Entity>>;

struct RegisteredClass {
    metadata: ClassMetadata,
    encode: Encoder,
    decode: Decoder,
}

/// Entity classes known to one [`crate::EntityManager`].
#[derive(Default)]
pub struct ClassRegistry {
    classes: BTreeMap<ClassId, RegisteredClass>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: PersistentEntity>(self) -> Self {
        self.insert::<E>(decode::<E>)
    }

    /// Registers `E` so that loaded instances are wrapped in a [`LazyProxy`].
    pub fn register_proxied<E: PersistentEntity>(self) -> Self {
        self.insert::<E>(decode_proxied::<E>)
    }

    fn insert<E: PersistentEntity>(mut self, decode: Decoder) -> Self {
        debug!("Registered entity class {}", E::CLASS);
        self.classes.insert(
            E::CLASS,
            RegisteredClass {
                metadata: E::metadata(),
                encode: encode::<E>,
                decode,
            },
        );
        self
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn metadata(&self, class: &str) -> Option<&ClassMetadata> {
        self.classes.get(class).map(|c| &c.metadata)
    }

    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.classes.keys().copied()
    }

    pub(crate) fn encode(&self, entity: &dyn Entity) -> Result<(Uuid, serde_json::Value)> {
        let class = self
            .classes
            .get(entity.class())
            .ok_or_else(|| Error::UnknownClass(entity.class().to_string()))?;
        (class.encode)(entity)
    }

    pub(crate) fn decode(&self, class: &str, body: serde_json::Value) -> Result<Box<dyn Entity>> {
        let class = self
            .classes
            .get(class)
            .ok_or_else(|| Error::UnknownClass(class.to_string()))?;
        (class.decode)(body)
    }
}

impl MetadataSource for ClassRegistry {
    fn all_metadata(&self) -> Vec<ClassMetadata> {
        self.classes.values().map(|c| c.metadata.clone()).collect()
    }
}

fn encode<E: PersistentEntity>(entity: &dyn Entity) -> Result<(Uuid, serde_json::Value)> {
    let entity = entity
        .as_any()
        .downcast_ref::<E>()
        .ok_or_else(|| Error::UnknownClass(E::CLASS.to_string()))?;
    Ok((entity.id(), serde_json::to_value(entity)?))
}

fn decode<E: PersistentEntity>(body: serde_json::Value) -> Result<Box<dyn Entity>> {
    let entity: E = serde_json::from_value(body)?;
    Ok(Box::new(entity))
}

fn decode_proxied<E: PersistentEntity>(body: serde_json::Value) -> Result<Box<dyn Entity>> {
    let entity: E = serde_json::from_value(body)?;
    Ok(Box::new(LazyProxy::new(entity)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Playlist;

    #[test]
    fn test_register_exposes_metadata() {
        let registry = ClassRegistry::new().register::<Playlist>();

        assert!(registry.contains("Playlist"));
        assert_eq!(registry.classes().collect::<Vec<_>>(), vec!["Playlist"]);

        let metadata = registry.all_metadata();
        assert_eq!(metadata.len(), 1);
        let tracked: Vec<_> = metadata[0].tracked_properties().map(|p| p.name).collect();
        assert_eq!(tracked, vec!["tracks"]);
    }

    #[test]
    fn test_encode_decode() {
        let registry = ClassRegistry::new().register::<Playlist>();
        let playlist = Playlist::new("Focus", &["intro"]);

        let (id, body) = registry.encode(&playlist).unwrap();
        let decoded = registry.decode("Playlist", body).unwrap();

        assert_eq!(id, playlist.id);
        assert_eq!(decoded.class(), "Playlist");
        assert_eq!(decoded.as_any().downcast_ref::<Playlist>(), Some(&playlist));
    }

    #[test]
    fn test_proxied_class_decodes_to_proxy() {
        let registry = ClassRegistry::new().register_proxied::<Playlist>();
        let playlist = Playlist::new("Focus", &["intro"]);

        let (_, body) = registry.encode(&playlist).unwrap();
        let decoded = registry.decode("Playlist", body).unwrap();

        assert_eq!(decoded.class(), "Playlist");
        assert!(decoded.as_any().downcast_ref::<Playlist>().is_some());
        assert!(decoded.as_any().downcast_ref::<LazyProxy<Playlist>>().is_none());
    }

    #[test]
    fn test_unknown_class() {
        let registry = ClassRegistry::new();

        let result = registry.decode("Playlist", serde_json::json!({}));

        assert!(matches!(result, Err(Error::UnknownClass(_))));
    }
}
