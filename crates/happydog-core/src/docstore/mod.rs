// ── DocStore Adapter (C2) ───────────────────────────────────────────────
// Uniform access to the externally hosted document store. The real
// deployment talks to a Firestore-shaped service; this module is the local
// stand-in used by every other component and by tests — a single SQLite
// connection behind a Mutex, with JSON documents in one generic table and
// a hand-rolled transaction-retry loop standing in for Firestore's
// optimistic concurrency.
//
// Module layout:
//   schema      — table DDL, run once at open()
//   query       — filters, cursor encode/decode, query()
//   transaction — Tx handle, atomic_increment, retry-with-backoff

mod query;
mod schema;
mod transaction;

pub use query::{Filter, QueryPage};
pub use transaction::Tx;

use crate::error::{CoreError, CoreResult};
use log::info;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Thread-safe document-store handle. Cloned cheaply (wraps an `Arc`-free
/// `Mutex` directly, mirroring the teacher's `SessionStore`); share one
/// instance across services via `Arc<DocStore>`.
pub struct DocStore {
    pub(crate) conn: Mutex<Connection>,
}

impl DocStore {
    /// Open (or create) the document-store database file and run migrations.
    pub fn open(path: &str) -> CoreResult<Self> {
        info!("[docstore] opening at {path}");
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;").ok();
        schema::run_migrations(&conn)?;
        Ok(DocStore { conn: Mutex::new(conn) })
    }

    /// An ephemeral, in-process store — used by tests and the CLI's
    /// scratch mode. Data does not survive process exit.
    pub fn open_in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(DocStore { conn: Mutex::new(conn) })
    }

    /// Strongly consistent single-document read.
    pub fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> CoreResult<Option<T>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT doc FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Overwrite (or create) a document. `sort_key` is a monotonic string
    /// (typically an RFC3339 timestamp) promoted out of the JSON body so
    /// `query()` can order/paginate without re-parsing every document.
    pub fn set<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        sort_key: &str,
        doc: &T,
    ) -> CoreResult<()> {
        let conn = self.conn.lock();
        Self::set_in(&conn, collection, id, sort_key, doc)
    }

    pub(crate) fn set_in<T: Serialize>(
        conn: &Connection,
        collection: &str,
        id: &str,
        sort_key: &str,
        doc: &T,
    ) -> CoreResult<()> {
        let json = serde_json::to_string(doc)?;
        conn.execute(
            "INSERT INTO documents (collection, id, doc, sort_key) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, id) DO UPDATE SET doc = excluded.doc, sort_key = excluded.sort_key",
            params![collection, id, json, sort_key],
        )?;
        Ok(())
    }

    pub fn delete(&self, collection: &str, id: &str) -> CoreResult<()> {
        let conn = self.conn.lock();
        Self::delete_in(&conn, collection, id)
    }

    pub(crate) fn delete_in(conn: &Connection, collection: &str, id: &str) -> CoreResult<()> {
        conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(())
    }

    /// Cursor-paginated range query, ordered by `sort_key DESC`.
    pub fn query<T: DeserializeOwned>(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: i64,
        cursor: Option<&str>,
    ) -> CoreResult<QueryPage<T>> {
        let conn = self.conn.lock();
        query::run(&conn, collection, filters, limit, cursor)
    }

    /// Run `f` inside a document-store transaction. On `SQLITE_BUSY` /
    /// `SQLITE_LOCKED` (the local stand-in for Firestore's optimistic
    /// concurrency conflict), retries up to `max_retries` times with
    /// exponential backoff bounded by `backoff_cap_ms`, surfacing
    /// `CoreError::Conflict` once the retry budget is exhausted.
    pub fn transaction<T>(
        &self,
        max_retries: u32,
        backoff_base_ms: u64,
        backoff_cap_ms: u64,
        mut f: impl FnMut(&Tx) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let mut attempt = 0;
        loop {
            let mut conn = self.conn.lock();
            let sql_tx = conn
                .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
                .map_err(CoreError::from)?;
            let tx = Tx::new(&sql_tx);
            match f(&tx) {
                Ok(value) => {
                    sql_tx.commit().map_err(CoreError::from)?;
                    return Ok(value);
                }
                Err(CoreError::DocStore(rusqlite::Error::SqliteFailure(sqlite_err, _)))
                    if transaction::is_busy(sqlite_err) =>
                {
                    drop(sql_tx);
                    drop(conn);
                    if attempt >= max_retries {
                        return Err(transaction::exhausted_conflict("docstore transaction"));
                    }
                    let backoff = transaction::backoff_ms(attempt, backoff_base_ms, backoff_cap_ms);
                    attempt += 1;
                    std::thread::sleep(std::time::Duration::from_millis(backoff));
                    continue;
                }
                Err(other) => {
                    // sql_tx dropped here rolls back automatically.
                    return Err(other);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Widget {
        name: String,
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = DocStore::open_in_memory().unwrap();
        store.set("widgets", "w1", "2026-01-01T00:00:00Z", &Widget { name: "gear".into() }).unwrap();
        let got: Option<Widget> = store.get("widgets", "w1").unwrap();
        assert_eq!(got, Some(Widget { name: "gear".into() }));
    }

    #[test]
    fn get_missing_is_none() {
        let store = DocStore::open_in_memory().unwrap();
        let got: Option<Widget> = store.get("widgets", "nope").unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn delete_removes_document() {
        let store = DocStore::open_in_memory().unwrap();
        store.set("widgets", "w1", "k", &Widget { name: "gear".into() }).unwrap();
        store.delete("widgets", "w1").unwrap();
        let got: Option<Widget> = store.get("widgets", "w1").unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn transaction_commits_on_success() {
        let store = DocStore::open_in_memory().unwrap();
        store
            .transaction(5, 1, 5, |tx| {
                tx.set("widgets", "w1", "k", &Widget { name: "gear".into() })
            })
            .unwrap();
        let got: Option<Widget> = store.get("widgets", "w1").unwrap();
        assert_eq!(got, Some(Widget { name: "gear".into() }));
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let store = DocStore::open_in_memory().unwrap();
        let result: CoreResult<()> = store.transaction(5, 1, 5, |tx| {
            tx.set("widgets", "w1", "k", &Widget { name: "gear".into() })?;
            Err(CoreError::validation("abort"))
        });
        assert!(result.is_err());
        let got: Option<Widget> = store.get("widgets", "w1").unwrap();
        assert_eq!(got, None);
    }
}
