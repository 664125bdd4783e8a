use crate::error::{Error, Result};
use crate::models::{FlushInfo, FlushRecord, StoredEntity, UpdateKind, UpdateRecord};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use uuid::Uuid;

const SCHEMA_VERSION: i32 = 1;

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let mut storage = Self { conn };
        storage.initialize()?;
        Ok(storage)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut storage = Self { conn };
        storage.initialize()?;
        Ok(storage)
    }

    fn initialize(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                class TEXT NOT NULL,
                body TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS flushes (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                inserted INTEGER NOT NULL,
                updated INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS updates (
                id TEXT PRIMARY KEY,
                flush_id TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                class TEXT NOT NULL,
                property TEXT NOT NULL,
                kind TEXT NOT NULL,
                old_value TEXT NOT NULL,
                new_value TEXT NOT NULL,
                FOREIGN KEY (flush_id) REFERENCES flushes(id),
                FOREIGN KEY (entity_id) REFERENCES entities(id)
            );

            CREATE INDEX IF NOT EXISTS idx_entities_class ON entities(class);
            CREATE INDEX IF NOT EXISTS idx_flushes_timestamp ON flushes(timestamp);
            CREATE INDEX IF NOT EXISTS idx_updates_flush ON updates(flush_id);
            CREATE INDEX IF NOT EXISTS idx_updates_entity ON updates(entity_id);
            "#,
        )?;

        let version: Option<i32> = self
            .conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .optional()?;

        if version.is_none() {
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    // Entity operations

    /// Inserts or replaces an entity row. Returns false when the stored body
    /// already has the same content hash and nothing was written.
    pub fn put_entity(&self, entity: &StoredEntity) -> Result<bool> {
        Self::write_entity(&self.conn, entity)
    }

    fn write_entity(conn: &Connection, entity: &StoredEntity) -> Result<bool> {
        let existing: Option<String> = conn
            .query_row(
                "SELECT content_hash FROM entities WHERE id = ?1",
                params![entity.id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        if existing.as_deref() == Some(entity.content_hash.as_str()) {
            return Ok(false);
        }

        conn.execute(
            "INSERT INTO entities (id, class, body, content_hash, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 class = excluded.class,
                 body = excluded.body,
                 content_hash = excluded.content_hash,
                 updated_at = excluded.updated_at",
            params![
                entity.id.to_string(),
                entity.class,
                serde_json::to_string(&entity.body)?,
                entity.content_hash,
                entity.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(true)
    }

    pub fn get_entity(&self, id: &Uuid) -> Result<StoredEntity> {
        self.conn
            .query_row(
                "SELECT id, class, body, content_hash, updated_at FROM entities WHERE id = ?1",
                params![id.to_string()],
                |row| self.entity_from_row(row),
            )
            .optional()?
            .ok_or_else(|| Error::EntityNotFound(id.to_string()))
    }

    pub fn list_entities(&self, class: Option<&str>) -> Result<Vec<StoredEntity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, class, body, content_hash, updated_at FROM entities
             WHERE ?1 IS NULL OR class = ?1
             ORDER BY updated_at DESC",
        )?;

        let entities = stmt
            .query_map(params![class], |row| self.entity_from_row(row))?
            .collect::<rusqlite::Result<Vec<StoredEntity>>>()?;

        Ok(entities)
    }

    pub fn entity_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // Flush operations

    /// Writes entity rows, the flush record and its updates in one
    /// transaction. Entities whose content hash is unchanged are skipped.
    /// Returns the number of entity rows written.
    pub fn commit_flush(
        &mut self,
        entities: &[StoredEntity],
        flush: &FlushRecord,
        updates: &[UpdateRecord],
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;

        let mut written = 0;
        for entity in entities {
            if Self::write_entity(&tx, entity)? {
                written += 1;
            }
        }

        tx.execute(
            "INSERT INTO flushes (id, timestamp, inserted, updated) VALUES (?1, ?2, ?3, ?4)",
            params![
                flush.id.to_string(),
                flush.timestamp.to_rfc3339(),
                flush.inserted as i64,
                flush.updated as i64,
            ],
        )?;

        for update in updates {
            tx.execute(
                "INSERT INTO updates (id, flush_id, entity_id, class, property, kind, old_value, new_value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    update.id.to_string(),
                    flush.id.to_string(),
                    update.entity_id.to_string(),
                    update.class,
                    update.property,
                    update.kind.as_str(),
                    update.old_value,
                    update.new_value,
                ],
            )?;
        }

        tx.commit()?;
        Ok(written)
    }

    pub fn get_flush(&self, id: &Uuid) -> Result<FlushRecord> {
        self.conn
            .query_row(
                "SELECT id, timestamp, inserted, updated FROM flushes WHERE id = ?1",
                params![id.to_string()],
                |row| self.flush_from_row(row),
            )
            .optional()?
            .ok_or_else(|| Error::FlushNotFound(id.to_string()))
    }

    /// Finds a flush by full id or by a unique id prefix.
    pub fn find_flush(&self, id_or_prefix: &str) -> Result<FlushRecord> {
        if let Ok(id) = Uuid::parse_str(id_or_prefix) {
            return self.get_flush(&id);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, inserted, updated FROM flushes WHERE id LIKE ?1 || '%' LIMIT 2",
        )?;
        let mut matches = stmt
            .query_map(params![id_or_prefix], |row| self.flush_from_row(row))?
            .collect::<rusqlite::Result<Vec<FlushRecord>>>()?;

        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(Error::FlushNotFound(id_or_prefix.to_string())),
            _ => Err(Error::InvalidOperation(format!(
                "Ambiguous flush id prefix: {}",
                id_or_prefix
            ))),
        }
    }

    pub fn latest_flush(&self) -> Result<Option<FlushRecord>> {
        let flush = self
            .conn
            .query_row(
                "SELECT id, timestamp, inserted, updated FROM flushes ORDER BY timestamp DESC LIMIT 1",
                [],
                |row| self.flush_from_row(row),
            )
            .optional()?;

        Ok(flush)
    }

    pub fn list_flushes(&self) -> Result<Vec<FlushInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, inserted, updated FROM flushes ORDER BY timestamp DESC",
        )?;

        let mut flushes = Vec::new();
        let rows = stmt.query_map([], |row| self.flush_from_row(row))?;

        for flush_result in rows {
            let flush = flush_result?;
            let info = self.get_flush_info(&flush)?;
            flushes.push(info);
        }

        Ok(flushes)
    }

    fn get_flush_info(&self, flush: &FlushRecord) -> Result<FlushInfo> {
        let updates = self.get_updates_for_flush(&flush.id)?;

        let forced_count = updates
            .iter()
            .filter(|u| u.kind == UpdateKind::Forced)
            .count();
        let properties_affected = updates
            .iter()
            .map(|u| format!("{}.{}", u.class, u.property))
            .collect();

        Ok(FlushInfo {
            flush: flush.clone(),
            update_count: updates.len(),
            forced_count,
            properties_affected,
        })
    }

    // Update operations

    pub fn get_update(&self, id: &Uuid) -> Result<UpdateRecord> {
        self.conn
            .query_row(
                "SELECT id, flush_id, entity_id, class, property, kind, old_value, new_value
                 FROM updates WHERE id = ?1",
                params![id.to_string()],
                |row| self.update_from_row(row),
            )
            .optional()?
            .ok_or_else(|| Error::UpdateNotFound(id.to_string()))
    }

    pub fn get_updates_for_flush(&self, flush_id: &Uuid) -> Result<Vec<UpdateRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, flush_id, entity_id, class, property, kind, old_value, new_value
             FROM updates WHERE flush_id = ?1
             ORDER BY class, entity_id, property",
        )?;

        let updates = stmt
            .query_map(params![flush_id.to_string()], |row| {
                self.update_from_row(row)
            })?
            .collect::<rusqlite::Result<Vec<UpdateRecord>>>()?;

        Ok(updates)
    }

    // Helper methods
    fn entity_from_row(&self, row: &Row) -> rusqlite::Result<StoredEntity> {
        let id: String = row.get(0)?;
        let class: String = row.get(1)?;
        let body: String = row.get(2)?;
        let content_hash: String = row.get(3)?;
        let updated_at: String = row.get(4)?;

        Ok(StoredEntity {
            id: parse_uuid(0, &id)?,
            class,
            body: serde_json::from_str(&body)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
            content_hash,
            updated_at: parse_timestamp(4, &updated_at)?,
        })
    }

    fn flush_from_row(&self, row: &Row) -> rusqlite::Result<FlushRecord> {
        let id: String = row.get(0)?;
        let timestamp: String = row.get(1)?;
        let inserted: i64 = row.get(2)?;
        let updated: i64 = row.get(3)?;

        let updates = self.get_update_ids_for_flush(&id)?;

        Ok(FlushRecord {
            id: parse_uuid(0, &id)?,
            timestamp: parse_timestamp(1, &timestamp)?,
            inserted: inserted as usize,
            updated: updated as usize,
            updates,
        })
    }

    fn update_from_row(&self, row: &Row) -> rusqlite::Result<UpdateRecord> {
        let id: String = row.get(0)?;
        let flush_id: String = row.get(1)?;
        let entity_id: String = row.get(2)?;
        let class: String = row.get(3)?;
        let property: String = row.get(4)?;
        let kind: String = row.get(5)?;
        let old_value: String = row.get(6)?;
        let new_value: String = row.get(7)?;

        Ok(UpdateRecord {
            id: parse_uuid(0, &id)?,
            flush_id: parse_uuid(1, &flush_id)?,
            entity_id: parse_uuid(2, &entity_id)?,
            class,
            property,
            kind: UpdateKind::parse(&kind).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    Type::Text,
                    format!("unknown update kind: {}", kind).into(),
                )
            })?,
            old_value,
            new_value,
        })
    }

    fn get_update_ids_for_flush(&self, flush_id: &str) -> rusqlite::Result<Vec<Uuid>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM updates WHERE flush_id = ?1 ORDER BY class, entity_id, property")?;

        let updates = stmt
            .query_map(params![flush_id], |row| {
                let id: String = row.get(0)?;
                parse_uuid(0, &id)
            })?
            .collect::<rusqlite::Result<Vec<Uuid>>>()?;

        Ok(updates)
    }
}

fn parse_uuid(column: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}
