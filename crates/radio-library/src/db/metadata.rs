//! Catalog metadata key/value operations.

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DbResult;

/// Key holding the folder mtime observed at the last full save
pub fn folder_mtime_key(source_folder: &str) -> String {
    format!("folder_mtime_{}", source_folder)
}

/// Key holding the wall-clock time of the last full save
pub fn last_scan_key(source_folder: &str) -> String {
    format!("last_scan_{}", source_folder)
}

/// Get a single metadata value
pub fn get_value(conn: &Connection, key: &str) -> DbResult<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM metadata WHERE key = ?", [key], |row| {
            row.get::<_, Option<String>>(0)
        })
        .optional()?;
    Ok(value.flatten())
}

/// Set a single metadata value, replacing any previous one
pub fn set_value(conn: &Connection, key: &str, value: &str) -> DbResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)",
        params![key, value],
    )?;
    Ok(())
}

/// Delete every metadata entry
pub fn delete_all(conn: &Connection) -> DbResult<usize> {
    Ok(conn.execute("DELETE FROM metadata", [])?)
}
