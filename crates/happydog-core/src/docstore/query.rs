// Range queries with cursor-based pagination (spec.md §4.2).
// The cursor encodes the last document's id and sort value as a base64 JSON
// blob, mirroring Firestore's `start_after(doc)` cursor semantics.

use crate::error::{CoreError, CoreResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rusqlite::Connection;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// An equality filter evaluated against the document's promoted JSON field.
/// The local store applies filters in Rust after a single collection-scan
/// fetch (no secondary indexes to maintain) — the same pattern the teacher
/// uses in `search_memories_by_embedding`: fetch the candidate rows, then
/// filter/sort in application code.
pub struct Filter<'a> {
    pub field: &'a str,
    pub value: serde_json::Value,
}

impl<'a> Filter<'a> {
    pub fn eq(field: &'a str, value: impl Into<serde_json::Value>) -> Self {
        Filter { field, value: value.into() }
    }

    fn matches(&self, doc: &serde_json::Value) -> bool {
        doc.get(self.field).map(|v| v == &self.value).unwrap_or(false)
    }
}

#[derive(Serialize, Deserialize)]
struct Cursor {
    last_sort_key: String,
    last_id: String,
}

fn encode_cursor(sort_key: &str, id: &str) -> String {
    let payload = Cursor { last_sort_key: sort_key.to_string(), last_id: id.to_string() };
    let json = serde_json::to_vec(&payload).expect("cursor serialization is infallible");
    URL_SAFE_NO_PAD.encode(json)
}

fn decode_cursor(raw: &str) -> CoreResult<Cursor> {
    let bytes = URL_SAFE_NO_PAD
        .decode(raw)
        .map_err(|e| CoreError::validation(format!("malformed cursor: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| CoreError::validation(format!("malformed cursor: {e}")))
}

pub struct QueryPage<T> {
    pub docs: Vec<T>,
    pub next_cursor: Option<String>,
}

pub(crate) fn run<T: DeserializeOwned>(
    conn: &Connection,
    collection: &str,
    filters: &[Filter],
    limit: i64,
    cursor: Option<&str>,
) -> CoreResult<QueryPage<T>> {
    let mut stmt = conn.prepare(
        "SELECT id, doc, sort_key FROM documents WHERE collection = ?1 ORDER BY sort_key DESC, id DESC",
    )?;
    let rows: Vec<(String, String, String)> = stmt
        .query_map([collection], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .filter_map(|r| r.ok())
        .collect();

    let after = cursor.map(decode_cursor).transpose()?;

    let mut matched: Vec<(String, String, serde_json::Value)> = Vec::new();
    let mut skipping = after.is_some();
    for (id, json, sort_key) in rows {
        if skipping {
            if let Some(ref c) = after {
                if sort_key == c.last_sort_key && id == c.last_id {
                    skipping = false;
                }
            }
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(&json)?;
        if filters.iter().all(|f| f.matches(&value)) {
            matched.push((id, sort_key, value));
        }
        if matched.len() as i64 > limit {
            break;
        }
    }

    let has_more = matched.len() as i64 > limit;
    matched.truncate(limit as usize);

    let next_cursor = if has_more {
        matched.last().map(|(id, sort_key, _)| encode_cursor(sort_key, id))
    } else {
        None
    };

    let docs = matched
        .into_iter()
        .map(|(_, _, v)| serde_json::from_value(v).map_err(CoreError::from))
        .collect::<CoreResult<Vec<T>>>()?;

    Ok(QueryPage { docs, next_cursor })
}
