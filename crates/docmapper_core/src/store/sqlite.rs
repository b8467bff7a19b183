//! Embedded SQLite document store client.
//!
//! # Responsibility
//! - Open `sqlite://` connections (file-backed or in-memory) with bootstrap
//!   pragmas applied.
//! - Persist one collection per table: `doc_id TEXT PRIMARY KEY` holding the
//!   canonical JSON text of the reserved key, `body TEXT` holding the
//!   document.
//!
//! # Invariants
//! - Rows read back in `rowid` order, which is the natural insertion order.
//! - Update and delete run inside a transaction, so callers observe either
//!   the full effect or none.
//! - A closed connection fails every later operation with
//!   `StoreError::ConnectionClosed`.

use super::query::{apply_pagination, apply_projection, apply_sorting, matches_filter};
use super::{
    DocumentCollection, Filter, FindOptions, StoreClient, StoreConnection, StoreError, StoreResult,
};
use crate::mapping::{FieldMap, RESERVED_ID_KEY};
use log::{error, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// URI prefix accepted by [`SqliteStoreClient`].
pub const SQLITE_URI_SCHEME: &str = "sqlite://";

const MEMORY_TARGETS: &[&str] = &["memory", ":memory:"];
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Store client backed by an embedded SQLite database.
///
/// `sqlite://memory` (or `sqlite://:memory:`) opens an in-memory store;
/// any other target is treated as a filesystem path.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteStoreClient;

impl StoreClient for SqliteStoreClient {
    fn scheme(&self) -> &str {
        SQLITE_URI_SCHEME
    }

    fn connect(&self, uri: &str) -> StoreResult<Box<dyn StoreConnection>> {
        let started_at = Instant::now();

        let target = uri
            .strip_prefix(SQLITE_URI_SCHEME)
            .ok_or_else(|| StoreError::UnsupportedScheme {
                uri: uri.to_string(),
            })?;
        let in_memory = MEMORY_TARGETS.contains(&target);
        let mode = if in_memory { "memory" } else { "file" };
        info!("event=store_connect module=store status=start mode={mode}");

        let opened = if in_memory {
            Connection::open_in_memory()
        } else {
            Connection::open(target)
        };
        let conn = match opened {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=store_connect module=store status=error mode={mode} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                return Err(err.into());
            }
        };

        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        info!(
            "event=store_connect module=store status=ok mode={mode} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(Box::new(SqliteStoreConnection {
            conn: Arc::new(Mutex::new(Some(conn))),
        }))
    }
}

struct SqliteStoreConnection {
    conn: SharedConnection,
}

impl StoreConnection for SqliteStoreConnection {
    fn collection(&self, name: &str) -> StoreResult<Box<dyn DocumentCollection>> {
        if !is_valid_table_name(name) {
            return Err(StoreError::InvalidCollectionName(name.to_string()));
        }

        let mut guard = lock_connection(&self.conn);
        let conn = guard.as_mut().ok_or(StoreError::ConnectionClosed)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{name}\" (
                doc_id TEXT PRIMARY KEY,
                body TEXT NOT NULL
            );"
        ))?;
        drop(guard);

        info!("event=collection_bind module=store status=ok collection={name}");
        Ok(Box::new(SqliteCollection {
            conn: Arc::clone(&self.conn),
            table: name.to_string(),
        }))
    }

    fn close(&self, force: bool) -> StoreResult<()> {
        let taken = lock_connection(&self.conn).take();
        let conn = taken.ok_or(StoreError::ConnectionClosed)?;

        match conn.close() {
            Ok(()) => {
                info!("event=store_close module=store status=ok force={force}");
                Ok(())
            }
            // A busy connection refuses a clean close. Forceful close drops
            // it anyway, aborting whatever kept it busy.
            Err((conn, err)) if force => {
                drop(conn);
                warn!("event=store_close module=store status=forced error={err}");
                Ok(())
            }
            Err((conn, err)) => {
                *lock_connection(&self.conn) = Some(conn);
                error!("event=store_close module=store status=error error={err}");
                Err(err.into())
            }
        }
    }
}

struct SqliteCollection {
    conn: SharedConnection,
    table: String,
}

impl SqliteCollection {
    fn select_all(&self, conn: &Connection) -> StoreResult<Vec<FieldMap>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT body FROM \"{}\" ORDER BY rowid ASC;",
            self.table
        ))?;
        let mut rows = stmt.query([])?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_body(&row.get::<_, String>(0)?)?);
        }
        Ok(documents)
    }
}

impl DocumentCollection for SqliteCollection {
    fn insert(&self, document: &FieldMap) -> StoreResult<()> {
        let id = document
            .get(RESERVED_ID_KEY)
            .ok_or_else(|| StoreError::Corrupt(format!("document has no `{RESERVED_ID_KEY}` key")))?;
        let doc_id = canonical_id(id)?;
        let body = serde_json::to_string(document)?;

        let guard = lock_connection(&self.conn);
        let conn = guard.as_ref().ok_or(StoreError::ConnectionClosed)?;
        conn.execute(
            &format!("INSERT INTO \"{}\" (doc_id, body) VALUES (?1, ?2);", self.table),
            params![doc_id, body],
        )?;
        Ok(())
    }

    fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<FieldMap>> {
        let guard = lock_connection(&self.conn);
        let conn = guard.as_ref().ok_or(StoreError::ConnectionClosed)?;
        let documents = self.select_all(conn)?;
        drop(guard);

        let mut matching: Vec<FieldMap> = documents
            .into_iter()
            .filter(|document| matches_filter(document, filter))
            .collect();
        apply_sorting(&mut matching, &options.sorting);

        Ok(apply_pagination(matching, &options.pagination)
            .into_iter()
            .map(|document| apply_projection(document, &options.projection))
            .collect())
    }

    fn find_one_and_update(
        &self,
        id: &Value,
        changes: &FieldMap,
    ) -> StoreResult<Option<FieldMap>> {
        let doc_id = canonical_id(id)?;

        let mut guard = lock_connection(&self.conn);
        let conn = guard.as_mut().ok_or(StoreError::ConnectionClosed)?;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                &format!("SELECT body FROM \"{}\" WHERE doc_id = ?1;", self.table),
                params![doc_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(body) = existing else {
            return Ok(None);
        };
        let current = parse_body(&body)?;

        // All non-identifier fields are replaced wholesale; the stored
        // identifier is carried over untouched.
        let mut updated = FieldMap::new();
        updated.insert(
            RESERVED_ID_KEY.to_string(),
            current
                .get(RESERVED_ID_KEY)
                .cloned()
                .unwrap_or_else(|| id.clone()),
        );
        for (key, value) in changes {
            if key != RESERVED_ID_KEY {
                updated.insert(key.clone(), value.clone());
            }
        }

        tx.execute(
            &format!("UPDATE \"{}\" SET body = ?2 WHERE doc_id = ?1;", self.table),
            params![doc_id, serde_json::to_string(&updated)?],
        )?;
        tx.commit()?;

        Ok(Some(updated))
    }

    fn find_one_and_delete(&self, id: &Value) -> StoreResult<Option<FieldMap>> {
        let doc_id = canonical_id(id)?;

        let mut guard = lock_connection(&self.conn);
        let conn = guard.as_mut().ok_or(StoreError::ConnectionClosed)?;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                &format!("SELECT body FROM \"{}\" WHERE doc_id = ?1;", self.table),
                params![doc_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(body) = existing else {
            return Ok(None);
        };
        let document = parse_body(&body)?;

        tx.execute(
            &format!("DELETE FROM \"{}\" WHERE doc_id = ?1;", self.table),
            params![doc_id],
        )?;
        tx.commit()?;

        Ok(Some(document))
    }
}

fn lock_connection(conn: &SharedConnection) -> MutexGuard<'_, Option<Connection>> {
    conn.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Canonical row key for an identifier value: its JSON text. Keeps distinct
/// identifier types distinct (`"7"` vs `7`) while staying deterministic.
fn canonical_id(id: &Value) -> StoreResult<String> {
    Ok(serde_json::to_string(id)?)
}

fn parse_body(body: &str) -> StoreResult<FieldMap> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Corrupt(format!(
            "stored body is not a JSON object: {other}"
        ))),
    }
}

/// Table names come from validated collection names, but the store guards
/// independently since they are interpolated into SQL.
fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}
