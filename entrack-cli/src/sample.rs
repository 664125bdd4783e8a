use entrack_core::{ClassId, ClassMetadata, Entity, EntityClass};
use entrack_store::{ClassRegistry, PersistentEntity};
use serde::{Deserialize, Serialize};
use std::any::Any;
use uuid::Uuid;

/// Playlist entity used by the demo. `tracks` is tracked; `title` is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: Uuid,
    pub title: String,
    pub tracks: Vec<String>,
}

impl Playlist {
    pub fn new(title: &str, tracks: &[&str]) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            tracks: tracks.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Entity for Playlist {
    fn class(&self) -> ClassId {
        Self::CLASS
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl EntityClass for Playlist {
    const CLASS: ClassId = "Playlist";

    fn metadata() -> ClassMetadata {
        ClassMetadata::new(Self::CLASS)
            .property("title", |p: &Self| &p.title, |p: &mut Self| &mut p.title)
            .tracked("tracks", |p: &Self| &p.tracks, |p: &mut Self| &mut p.tracks)
    }
}

impl PersistentEntity for Playlist {
    fn id(&self) -> Uuid {
        self.id
    }
}

pub fn registry() -> ClassRegistry {
    ClassRegistry::new().register::<Playlist>()
}
