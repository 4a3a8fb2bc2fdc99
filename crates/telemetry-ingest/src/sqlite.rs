// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite document store
//!
//! Stores each document as a JSON body in a per-collection table. Every flush
//! worker opens its own connection; SQLite serializes the writers and WAL
//! mode keeps readers (`count`, `tail`) from blocking them.

use crate::record::{Document, TIMESTAMP_FIELD};
use crate::store::{
    BulkWriteOptions, BulkWriteResult, DocumentStore, StoreError, StoreSession, WriteOp,
};
use rusqlite::{params, Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a writer waits on a locked database before failing its batch.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite document store
///
/// # Schema
///
/// ```sql
/// CREATE TABLE "<database>.<collection>" (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     captured_at TEXT,
///     body TEXT NOT NULL
/// );
/// CREATE INDEX "<database>.<collection>.captured_at" ON ... (captured_at);
/// ```
///
/// `id` is the store-assigned identity; documents never carry their own.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    table: String,
}

/// A document read back from the store.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: i64,
    pub captured_at: Option<String>,
    pub body: Document,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the collection table exists.
    pub fn new(path: impl AsRef<Path>, database: &str, collection: &str) -> Result<Self, StoreError> {
        for name in [database, collection] {
            if !is_valid_name(name) {
                return Err(StoreError::Backend(format!(
                    "invalid database/collection name: {:?}",
                    name
                )));
            }
        }

        let store = Self {
            path: path.as_ref().to_path_buf(),
            table: format!("{}.{}", database, collection),
        };
        let conn = store.open()?;
        store.init_schema(&conn)?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path).map_err(|e| {
            StoreError::Connect(format!("{}: {}", self.path.display(), e))
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        Ok(conn)
    }

    fn init_schema(&self, conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    captured_at TEXT,
                    body TEXT NOT NULL
                )",
                self.table
            ),
            [],
        )?;

        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS \"{0}.captured_at\" ON \"{0}\"(captured_at)",
                self.table
            ),
            [],
        )?;

        Ok(())
    }

    /// Table holding the collection.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of stored documents.
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.open()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// The `limit` most recently inserted documents, newest first.
    pub fn tail(&self, limit: usize) -> Result<Vec<StoredDocument>, StoreError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, captured_at, body FROM \"{}\" ORDER BY id DESC LIMIT ?1",
            self.table
        ))?;

        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, captured_at, body)| {
                Ok(StoredDocument {
                    id,
                    captured_at,
                    body: serde_json::from_str(&body)?,
                })
            })
            .collect()
    }
}

impl DocumentStore for SqliteStore {
    fn connect(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        let conn = self.open()?;
        let insert_sql = format!(
            "INSERT INTO \"{}\" (captured_at, body) VALUES (?1, ?2)",
            self.table
        );
        Ok(Box::new(SqliteSession { conn, insert_sql }))
    }

    fn describe(&self) -> String {
        format!("sqlite://{}#{}", self.path.display(), self.table)
    }
}

/// One worker's connection.
struct SqliteSession {
    conn: Connection,
    insert_sql: String,
}

impl StoreSession for SqliteSession {
    fn bulk_write(
        &mut self,
        ops: Vec<WriteOp>,
        options: BulkWriteOptions,
    ) -> Result<BulkWriteResult, StoreError> {
        let total = ops.len() as u64;
        let mut inserted = 0u64;
        let mut first_error: Option<String> = None;

        // Take the write lock up front so concurrent workers wait on busy_timeout
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for op in ops {
                let WriteOp::InsertOne(doc) = op;
                let result = serde_json::to_string(&doc)
                    .map_err(StoreError::from)
                    .and_then(|body| {
                        let captured_at = doc.get(TIMESTAMP_FIELD).and_then(|v| v.as_str());
                        stmt.execute(params![captured_at, body])
                            .map_err(StoreError::from)
                    });

                match result {
                    Ok(_) => inserted += 1,
                    Err(e) => {
                        first_error.get_or_insert_with(|| e.to_string());
                        if options.ordered {
                            break;
                        }
                    }
                }
            }
        }
        tx.commit()?;

        match first_error {
            None => Ok(BulkWriteResult {
                inserted,
                upserted: 0,
            }),
            Some(detail) => Err(StoreError::BulkWrite {
                inserted,
                failed: total - inserted,
                detail,
            }),
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
