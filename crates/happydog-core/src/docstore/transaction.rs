// Transaction handle + retry/backoff helpers (spec.md §4.2).
//
// All mutations that cross entities (create-comment-and-bump-count,
// toggle-like-and-bump-count, delete-post-and-cascade, register-pet-and-seed-
// care-settings) MUST go through `DocStore::transaction`, which hands the
// closure one of these.

use crate::error::{CoreError, CoreResult};
use rusqlite::{params, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

pub struct Tx<'conn> {
    inner: &'conn rusqlite::Transaction<'conn>,
}

impl<'conn> Tx<'conn> {
    pub(crate) fn new(inner: &'conn rusqlite::Transaction<'conn>) -> Self {
        Tx { inner }
    }

    pub fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> CoreResult<Option<T>> {
        let raw: Option<String> = self
            .inner
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

    pub fn set<T: Serialize>(&self, collection: &str, id: &str, sort_key: &str, doc: &T) -> CoreResult<()> {
        crate::docstore::DocStore::set_in(self.inner, collection, id, sort_key, doc)
    }

    pub fn delete(&self, collection: &str, id: &str) -> CoreResult<()> {
        crate::docstore::DocStore::delete_in(self.inner, collection, id)
    }

    /// `post-state = max(0, prior + delta)` on a JSON-embedded integer
    /// field, mutated in place via SQLite's core JSON functions so the
    /// read-modify-write never leaves the transaction boundary.
    pub fn atomic_increment(&self, collection: &str, id: &str, field: &str, delta: i64) -> CoreResult<i64> {
        let path = format!("$.{field}");
        self.inner.execute(
            "UPDATE documents
             SET doc = json_set(doc, ?3, MAX(0, CAST(json_extract(doc, ?3) AS INTEGER) + ?4))
             WHERE collection = ?1 AND id = ?2",
            params![collection, id, path, delta],
        )?;
        let new_value: i64 = self.inner.query_row(
            "SELECT CAST(json_extract(doc, ?3) AS INTEGER) FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id, path],
            |row| row.get(0),
        )?;
        Ok(new_value)
    }
}

/// SQLite error codes that indicate write contention — the local analogue
/// of Firestore's optimistic-concurrency conflict.
pub(crate) fn is_busy(code: rusqlite::ffi::Error) -> bool {
    matches!(
        code.code,
        rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
    )
}

/// Exponential backoff with a cap: base * 2^attempt, clamped to `cap_ms`.
pub(crate) fn backoff_ms(attempt: u32, base_ms: u64, cap_ms: u64) -> u64 {
    base_ms.saturating_mul(1u64 << attempt.min(16)).min(cap_ms)
}

pub(crate) fn exhausted_conflict(context: &str) -> CoreError {
    CoreError::conflict(format!("{context}: transaction retry budget exhausted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_cap() {
        assert_eq!(backoff_ms(0, 20, 250), 20);
        assert_eq!(backoff_ms(1, 20, 250), 40);
        assert_eq!(backoff_ms(2, 20, 250), 80);
        assert_eq!(backoff_ms(3, 20, 250), 160);
        assert_eq!(backoff_ms(4, 20, 250), 250); // would be 320, clamped
        assert_eq!(backoff_ms(10, 20, 250), 250);
    }
}
