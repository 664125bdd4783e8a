use crate::registry::PersistentEntity;
use entrack_core::{ClassId, ClassMetadata, Entity, EntityClass};
use serde::{Deserialize, Serialize};
use std::any::Any;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: Uuid,
    pub name: String,
    pub tracks: Vec<String>,
    pub plays: u32,
}

impl Playlist {
    pub fn new(name: &str, tracks: &[&str]) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            tracks: tracks.iter().map(|t| t.to_string()).collect(),
            plays: 0,
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
            .property("name", |p: &Self| &p.name, |p: &mut Self| &mut p.name)
            .tracked("tracks", |p: &Self| &p.tracks, |p: &mut Self| &mut p.tracks)
            .property("plays", |p: &Self| &p.plays, |p: &mut Self| &mut p.plays)
    }
}

impl PersistentEntity for Playlist {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: Uuid,
    pub cover: Option<String>,
    pub tracks: Vec<String>,
}

impl Album {
    pub fn new(tracks: &[&str]) -> Self {
        Self {
            id: Uuid::new_v4(),
            cover: None,
            tracks: tracks.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Entity for Album {
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

impl EntityClass for Album {
    const CLASS: ClassId = "Album";

    fn metadata() -> ClassMetadata {
        ClassMetadata::new(Self::CLASS)
            .tracked("cover", |a: &Self| &a.cover, |a: &mut Self| &mut a.cover)
            .tracked("tracks", |a: &Self| &a.tracks, |a: &mut Self| &mut a.tracks)
    }
}

impl PersistentEntity for Album {
    fn id(&self) -> Uuid {
        self.id
    }
}
