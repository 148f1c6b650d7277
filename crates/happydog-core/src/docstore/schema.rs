// Table DDL for the local document-store stand-in.
// Called once at startup by DocStore::open()/open_in_memory().
// Adding a new collection needs no DDL change — collections are rows, not
// tables. Counters live inside the JSON document itself; `atomic_increment`
// mutates them in place with SQLite's built-in `json_extract`/`json_set`
// (part of SQLite core since 3.38, available on the bundled build rusqlite
// ships) so a transaction never has to read-modify-write the whole blob
// through the application layer.

use crate::error::CoreResult;
use rusqlite::Connection;

pub(crate) fn run_migrations(conn: &Connection) -> CoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            doc TEXT NOT NULL,
            sort_key TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (collection, id)
        );

        CREATE INDEX IF NOT EXISTS idx_documents_collection_sort
            ON documents(collection, sort_key DESC);
        ",
    )?;
    Ok(())
}
