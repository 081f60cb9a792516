//! Append-only history log backed by SQLite.
//!
//! Records are opaque JSON payloads grouped by collection. There is no
//! update or delete path.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use lectern_core::{Error, Result};

use crate::schema::SCHEMA_SQL;
use crate::types::HistoryRecord;

/// Collection that answered questions are appended to.
pub const QUERY_RESULTS_COLLECTION: &str = "query_results";

pub struct HistoryStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl HistoryStore {
    /// Open or create `dir/history.db`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join("history.db");

        let conn = Connection::open(&db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };
        info!(
            "HistoryStore opened: {} records, path={}",
            store.count(None)?,
            store.db_path.display()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Append a record. Returns its generated id.
    pub fn append<T: Serialize + ?Sized>(&self, collection: &str, payload: &T) -> Result<String> {
        let payload_json = serde_json::to_string(payload)?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp_millis();

        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO records (id, collection, payload_json, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![id, collection, payload_json, now])
        .map_err(|e| Error::Database(e.to_string()))?;

        debug!("Appended {} to {}", id, collection);
        Ok(id)
    }

    /// Append an answered query to [`QUERY_RESULTS_COLLECTION`].
    pub fn append_result<T: Serialize + ?Sized>(&self, result: &T) -> Result<String> {
        self.append(QUERY_RESULTS_COLLECTION, result)
    }

    pub fn get(&self, id: &str) -> Result<Option<HistoryRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached(
                "SELECT id, collection, payload_json, created_at FROM records WHERE id = ?1",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![id], Self::row_to_raw)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        row.map(Self::decode).transpose()
    }

    /// Decode a stored payload into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        match self.get(id)? {
            Some(record) => Ok(Some(serde_json::from_value(record.payload)?)),
            None => Ok(None),
        }
    }

    /// Most recent records of `collection`, newest first.
    pub fn list(&self, collection: &str, limit: usize) -> Result<Vec<HistoryRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, collection, payload_json, created_at FROM records \
                 WHERE collection = ?1 ORDER BY seq DESC LIMIT ?2",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![collection, limit as i64], Self::row_to_raw)
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| Error::Database(e.to_string()))?;
            records.push(Self::decode(raw)?);
        }
        Ok(records)
    }

    /// Record count, optionally restricted to one collection.
    pub fn count(&self, collection: Option<&str>) -> Result<i64> {
        let conn = self.conn.lock();
        let count = match collection {
            Some(c) => conn
                .prepare_cached("SELECT COUNT(*) FROM records WHERE collection = ?1")
                .map_err(|e| Error::Database(e.to_string()))?
                .query_row(params![c], |row| row.get(0)),
            None => conn
                .prepare_cached("SELECT COUNT(*) FROM records")
                .map_err(|e| Error::Database(e.to_string()))?
                .query_row([], |row| row.get(0)),
        }
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, i64)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn decode((id, collection, payload_json, created_at): (String, String, String, i64)) -> Result<HistoryRecord> {
        Ok(HistoryRecord {
            id,
            collection,
            payload: serde_json::from_str(&payload_json)?,
            created_at,
        })
    }
}
