//! Database schema definitions and migrations.
//!
//! The `songs` table has grown columns over time. Older catalogs are brought
//! forward by adding whatever is missing; nothing is ever dropped or
//! rewritten.

use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::DbResult;

pub const SONGS_TABLE: &str = "songs";
pub const METADATA_TABLE: &str = "metadata";

/// SQL statements for creating all database tables
pub const CREATE_TABLES: &[(&str, &str)] = &[
    (
        SONGS_TABLE,
        "CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT,
            artist TEXT,
            mapper TEXT,
            audio TEXT,
            background TEXT,
            length INTEGER DEFAULT 0,
            osu_file TEXT,
            folder TEXT,
            source_folder TEXT,
            UNIQUE(title, artist, mapper, source_folder)
        )",
    ),
    (
        METADATA_TABLE,
        "CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT
        )",
    ),
];

/// Columns added after the first catalog shape, with their definitions
const LATER_COLUMNS: &[(&str, &str)] = &[
    ("background", "TEXT"),
    ("length", "INTEGER DEFAULT 0"),
    ("osu_file", "TEXT"),
    ("source_folder", "TEXT"),
];

/// Create all database tables
pub fn create_tables(conn: &Connection) -> DbResult<()> {
    for (_, sql) in CREATE_TABLES {
        conn.execute(sql, [])?;
    }
    Ok(())
}

/// Bring an existing `songs` table up to the current shape.
///
/// Each missing column is added with `ALTER TABLE`. A failing `ALTER` is
/// logged and skipped: the usual cause is a column that already exists.
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    let columns = get_table_columns(conn, SONGS_TABLE)?;

    for (column, definition) in LATER_COLUMNS {
        if columns.iter().any(|c| c == column) {
            continue;
        }
        info!(column, "adding column to songs table");
        let sql = format!("ALTER TABLE songs ADD COLUMN {} {}", column, definition);
        if let Err(e) = conn.execute(&sql, []) {
            warn!(column, error = %e, "column migration skipped");
        }
    }

    if !index_exists(conn, "idx_songs_source_folder")? {
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_songs_source_folder ON songs(source_folder)",
            [],
        )?;
    }

    Ok(())
}

/// Check whether a table exists
pub fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Get column names for a table
pub(crate) fn get_table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(columns)
}

/// Check if an index exists
fn index_exists(conn: &Connection, index_name: &str) -> DbResult<bool> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name=?",
        [index_name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
