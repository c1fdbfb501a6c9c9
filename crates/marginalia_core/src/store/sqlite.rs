//! SQLite-backed document store.
//!
//! Documents live in the `documents` table as JSON text, keyed by
//! `(collection, doc_id)`. Equality filters on fields other than `_id` are
//! evaluated with `json_extract`.
//!
//! # Invariants
//! - One connection, serialized behind a `Mutex`; every primitive runs under
//!   a single lock acquisition.
//! - Multi-statement primitives (`update_one`, `delete_one`) run inside one
//!   transaction.

use super::{apply_patch, document_id, Document, DocumentStore, Filter, StoreError, StoreResult, ID_FIELD};
use crate::db::{open_db_in_memory, open_db_with, DbOptions};
use rusqlite::types::Value as SqlValue;
use rusqlite::{ffi, params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Persistent document store over one migrated SQLite connection.
#[derive(Debug)]
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Wraps a connection returned by [`crate::db::open_db`].
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>, options: DbOptions) -> StoreResult<Self> {
        Ok(Self::new(open_db_with(path, options)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Poisoned("sqlite connection"))
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let conn = self.lock()?;
        let (clause, binds) = where_clause(collection, filter)?;
        let mut stmt =
            conn.prepare(&format!("SELECT body FROM documents WHERE {clause} ORDER BY seq ASC;"))?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let body: String = row.get(0)?;
            documents.push(parse_body(&body)?);
        }
        Ok(documents)
    }

    fn insert(&self, collection: &str, document: Document) -> StoreResult<()> {
        let id = document_id(&document)?;
        let body = serde_json::to_string(&document)?;
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3);",
            params![collection, id.as_str(), body],
        );
        result
            .map(|_| ())
            .map_err(|err| insert_error(err, collection, id))
    }

    fn update_one(&self, collection: &str, filter: &Filter, patch: &Document) -> StoreResult<u64> {
        let mut conn = self.lock()?;
        let (clause, binds) = where_clause(collection, filter)?;
        let tx = conn.transaction()?;
        let target = tx
            .query_row(
                &format!("SELECT seq, body FROM documents WHERE {clause} ORDER BY seq ASC LIMIT 1;"),
                params_from_iter(binds),
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((seq, body)) = target else {
            return Ok(0);
        };

        let mut document = parse_body(&body)?;
        apply_patch(&mut document, patch)?;
        tx.execute(
            "UPDATE documents SET body = ?1 WHERE seq = ?2;",
            params![serde_json::to_string(&document)?, seq],
        )?;
        tx.commit()?;
        Ok(1)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let conn = self.lock()?;
        let (clause, binds) = where_clause(collection, filter)?;
        let removed = conn.execute(
            &format!(
                "DELETE FROM documents WHERE seq = (
                    SELECT seq FROM documents WHERE {clause} ORDER BY seq ASC LIMIT 1
                );"
            ),
            params_from_iter(binds),
        )?;
        Ok(removed as u64)
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let conn = self.lock()?;
        let (clause, binds) = where_clause(collection, filter)?;
        let removed = conn.execute(
            &format!("DELETE FROM documents WHERE {clause};"),
            params_from_iter(binds),
        )?;
        Ok(removed as u64)
    }
}

/// Builds the `WHERE` body and bind values; `?1` is always the collection.
fn where_clause(collection: &str, filter: &Filter) -> StoreResult<(String, Vec<SqlValue>)> {
    let mut binds = vec![SqlValue::Text(collection.to_string())];
    let clause = match filter {
        Filter::All => "collection = ?1".to_string(),
        Filter::Eq { field, value } if field == ID_FIELD => {
            let Value::String(id) = value else {
                // Ids are always strings, so nothing else can match.
                return Ok(("0 = 1 AND collection = ?1".to_string(), binds));
            };
            binds.push(SqlValue::Text(id.clone()));
            "collection = ?1 AND doc_id = ?2".to_string()
        }
        Filter::Eq { field, value } => {
            ensure_plain_field(field)?;
            binds.push(to_sql_value(value)?);
            format!("collection = ?1 AND json_extract(body, '$.{field}') = ?2")
        }
    };
    Ok((clause, binds))
}

fn ensure_plain_field(field: &str) -> StoreResult<()> {
    let plain = !field.is_empty()
        && field
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if plain {
        Ok(())
    } else {
        Err(StoreError::InvalidDocument(format!(
            "unsupported filter field `{field}`"
        )))
    }
}

fn to_sql_value(value: &Value) -> StoreResult<SqlValue> {
    match value {
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Ok(SqlValue::Integer(integer))
            } else if let Some(real) = number.as_f64() {
                Ok(SqlValue::Real(real))
            } else {
                Err(StoreError::InvalidDocument(format!(
                    "unsupported numeric filter value {number}"
                )))
            }
        }
        other => Err(StoreError::InvalidDocument(format!(
            "unsupported filter value {other}"
        ))),
    }
}

fn parse_body(body: &str) -> StoreResult<Document> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::InvalidDocument(format!(
            "stored body is not an object: {other}"
        ))),
    }
}

/// Only a unique-index hit means the `_id` is taken; CHECK and NOT NULL
/// failures stay backend faults.
fn insert_error(err: rusqlite::Error, collection: &str, id: String) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            StoreError::DuplicateId {
                collection: collection.to_string(),
                id,
            }
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::{insert_error, SqliteDocumentStore};
    use crate::db::DbOptions;
    use crate::store::{Document, DocumentStore, Filter, StoreError};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn find_filters_by_id_and_json_field() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        store
            .insert("annotations", doc(json!({"_id": "a", "parentId": "e-1", "n": 1})))
            .unwrap();
        store
            .insert("annotations", doc(json!({"_id": "b", "parentId": "e-2", "n": 2})))
            .unwrap();
        store
            .insert("annotations", doc(json!({"_id": "c", "parentId": "e-1", "n": 3})))
            .unwrap();

        let by_parent = store
            .find("annotations", &Filter::field_eq("parentId", "e-1"))
            .unwrap();
        assert_eq!(by_parent.len(), 2);
        assert_eq!(by_parent[0]["_id"], "a");
        assert_eq!(by_parent[1]["_id"], "c");

        let by_number = store
            .find("annotations", &Filter::field_eq("n", 2))
            .unwrap();
        assert_eq!(by_number.len(), 1);

        let by_id = store.find_one("annotations", &Filter::id("b")).unwrap();
        assert_eq!(by_id.unwrap()["parentId"], "e-2");
        assert!(store.find_one("entries", &Filter::id("b")).unwrap().is_none());
    }

    #[test]
    fn insert_maps_unique_violation_to_duplicate_id() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        store.insert("entries", doc(json!({"_id": "x"}))).unwrap();
        let err = store.insert("entries", doc(json!({"_id": "x"}))).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { ref collection, .. } if collection == "entries"));
    }

    #[test]
    fn update_and_delete_primitives_report_counts() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        for id in ["a", "b", "c"] {
            store
                .insert("annotations", doc(json!({"_id": id, "parentId": "p", "author": "A"})))
                .unwrap();
        }

        let patch = doc(json!({"author": "B"}));
        assert_eq!(store.update_one("annotations", &Filter::id("b"), &patch).unwrap(), 1);
        assert_eq!(store.update_one("annotations", &Filter::id("zz"), &patch).unwrap(), 0);
        let updated = store.find_one("annotations", &Filter::id("b")).unwrap().unwrap();
        assert_eq!(updated["author"], "B");
        assert_eq!(updated["parentId"], "p");

        assert_eq!(store.delete_one("annotations", &Filter::id("a")).unwrap(), 1);
        assert_eq!(
            store
                .delete_many("annotations", &Filter::field_eq("parentId", "p"))
                .unwrap(),
            2
        );
        assert!(store.find("annotations", &Filter::All).unwrap().is_empty());
    }

    #[test]
    fn rejects_unsafe_filter_fields() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let err = store
            .find("entries", &Filter::field_eq("x') OR 1=1 --", "y"))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(_)));
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marginalia.sqlite3");
        {
            let store = SqliteDocumentStore::open(&path, DbOptions::default()).unwrap();
            store.insert("entries", doc(json!({"_id": "kept"}))).unwrap();
        }
        let reopened = SqliteDocumentStore::open(&path, DbOptions::default()).unwrap();
        assert_eq!(reopened.find("entries", &Filter::All).unwrap().len(), 1);
    }

    #[test]
    fn only_unique_violations_map_to_duplicate_id() {
        let unique = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
            None,
        );
        assert!(matches!(
            insert_error(unique, "entries", "e-1".to_string()),
            StoreError::DuplicateId { ref id, .. } if id == "e-1"
        ));

        let check = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_CHECK),
            Some("CHECK constraint failed: json_valid(body)".to_string()),
        );
        assert!(matches!(
            insert_error(check, "entries", "e-1".to_string()),
            StoreError::Db(_)
        ));
    }

    #[test]
    fn check_violation_is_not_reported_as_duplicate() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let conn = store.lock().unwrap();
        let err = conn
            .execute(
                "INSERT INTO documents (collection, doc_id, body) VALUES ('entries', 'x', 'not json');",
                [],
            )
            .unwrap_err();
        assert!(matches!(insert_error(err, "entries", "x".to_string()), StoreError::Db(_)));
    }
}
