use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// Reported through a property change notification.
    Notified,
    /// Forced into the flush as an extra update.
    Forced,
}

impl UpdateKind {
    pub fn as_str(&self) -> &str {
        match self {
            UpdateKind::Notified => "notified",
            UpdateKind::Forced => "forced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "notified" => Some(UpdateKind::Notified),
            "forced" => Some(UpdateKind::Forced),
            _ => None,
        }
    }
}

/// One persisted entity row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntity {
    pub id: Uuid,
    pub class: String,
    pub body: serde_json::Value,
    pub content_hash: String,
    pub updated_at: DateTime<Utc>,
}

impl StoredEntity {
    pub fn new(id: Uuid, class: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            id,
            class: class.into(),
            content_hash: Self::hash_content(body.to_string().as_bytes()),
            body,
            updated_at: Utc::now(),
        }
    }

    fn hash_content(content: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }
}

/// One property change written by a flush.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub id: Uuid,
    pub flush_id: Uuid,
    pub entity_id: Uuid,
    pub class: String,
    pub property: String,
    pub kind: UpdateKind,
    pub old_value: String,
    pub new_value: String,
}

impl UpdateRecord {
    pub fn new(
        flush_id: Uuid,
        entity_id: Uuid,
        class: impl Into<String>,
        property: impl Into<String>,
        kind: UpdateKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flush_id,
            entity_id,
            class: class.into(),
            property: property.into(),
            kind,
            old_value: String::new(),
            new_value: String::new(),
        }
    }

    pub fn with_values(mut self, old_value: String, new_value: String) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub inserted: usize,
    pub updated: usize,
    pub updates: Vec<Uuid>,
}

impl FlushRecord {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            inserted: 0,
            updated: 0,
            updates: Vec::new(),
        }
    }

    /// True when the flush wrote nothing.
    pub fn is_empty(&self) -> bool {
        self.inserted == 0 && self.updated == 0
    }
}

impl Default for FlushRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushInfo {
    pub flush: FlushRecord,
    pub update_count: usize,
    pub forced_count: usize,
    pub properties_affected: Vec<String>,
}
