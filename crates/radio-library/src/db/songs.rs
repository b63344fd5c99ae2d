//! Song record operations.
//!
//! CRUD for the `songs` table. Rows are keyed by
//! `(title, artist, mapper, source_folder)` and are only ever replaced whole.

use rusqlite::{params, Connection, Row};

use radio_core::Track;

use crate::db::DbResult;

const SELECT_COLUMNS: &str =
    "SELECT title, artist, mapper, audio, background, length, osu_file, folder, source_folder FROM songs";

/// Rows belonging to `?1`: scoped to it, or legacy rows whose folder is `?1`
/// itself or lies below it (`?2` is `?1` plus a separator)
const FOLDER_SCOPE: &str = "source_folder = ?1
    OR (source_folder IS NULL AND (folder = ?1 OR substr(folder, 1, length(?2)) = ?2))";

/// `source_folder` with exactly one trailing separator
fn child_prefix(source_folder: &str) -> String {
    if source_folder.ends_with('/') || source_folder.ends_with(std::path::MAIN_SEPARATOR) {
        source_folder.to_string()
    } else {
        format!("{}{}", source_folder, std::path::MAIN_SEPARATOR)
    }
}

/// Map a database row to a Track struct
fn row_to_track(row: &Row) -> rusqlite::Result<Track> {
    Ok(Track {
        title: row.get::<_, Option<String>>("title")?.unwrap_or_default(),
        artist: row.get::<_, Option<String>>("artist")?.unwrap_or_default(),
        mapper: row.get::<_, Option<String>>("mapper")?.unwrap_or_default(),
        audio_filename: row.get::<_, Option<String>>("audio")?.unwrap_or_default(),
        background_filename: row
            .get::<_, Option<String>>("background")?
            .filter(|b| !b.is_empty()),
        duration_ms: row.get::<_, Option<i64>>("length")?.unwrap_or(0),
        descriptor_path: row.get::<_, Option<String>>("osu_file")?.unwrap_or_default(),
        folder_path: row.get::<_, Option<String>>("folder")?.unwrap_or_default(),
        source_folder: row.get("source_folder")?,
    })
}

/// All rows scoped to `source_folder`, plus legacy unscoped rows whose
/// folder lies under it
pub fn select_for_folder(conn: &Connection, source_folder: &str) -> DbResult<Vec<Track>> {
    let sql = format!("{} WHERE {} ORDER BY id", SELECT_COLUMNS, FOLDER_SCOPE);
    let mut stmt = conn.prepare(&sql)?;

    let tracks: Vec<Track> = stmt
        .query_map(params![source_folder, child_prefix(source_folder)], row_to_track)?
        .filter_map(|r| r.ok())
        .collect();

    Ok(tracks)
}

/// Insert or replace each track under `source_folder`.
///
/// The stored scope is always `source_folder`, whatever the track carries.
pub fn upsert_tracks(conn: &Connection, source_folder: &str, tracks: &[Track]) -> DbResult<usize> {
    if tracks.is_empty() {
        return Ok(0);
    }

    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO songs
         (title, artist, mapper, audio, background, length, osu_file, folder, source_folder)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )?;

    let mut count = 0;
    for track in tracks {
        stmt.execute(params![
            track.title,
            track.artist,
            track.mapper,
            track.audio_filename,
            track.background_filename.as_deref().unwrap_or(""),
            track.duration_ms,
            track.descriptor_path,
            track.folder_path,
            source_folder,
        ])?;
        count += 1;
    }

    Ok(count)
}

/// Delete every row `select_for_folder` would return, legacy rows included
pub fn delete_for_folder(conn: &Connection, source_folder: &str) -> DbResult<usize> {
    let sql = format!("DELETE FROM songs WHERE {}", FOLDER_SCOPE);
    Ok(conn.execute(&sql, params![source_folder, child_prefix(source_folder)])?)
}

/// Delete rows by `(title, artist, mapper)`, across all source folders
pub fn delete_by_keys(conn: &Connection, tracks: &[Track]) -> DbResult<usize> {
    let mut stmt = conn.prepare(
        "DELETE FROM songs
         WHERE COALESCE(title, '') = ? AND COALESCE(artist, '') = ? AND COALESCE(mapper, '') = ?",
    )?;

    let mut removed = 0;
    for track in tracks {
        removed += stmt.execute(params![track.title, track.artist, track.mapper])?;
    }

    Ok(removed)
}

/// Delete every row
pub fn delete_all(conn: &Connection) -> DbResult<usize> {
    Ok(conn.execute("DELETE FROM songs", [])?)
}

/// Row counts grouped by source folder, legacy rows under `None`
pub fn count_by_source(conn: &Connection) -> DbResult<Vec<(Option<String>, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT source_folder, COUNT(*) FROM songs GROUP BY source_folder ORDER BY source_folder",
    )?;

    let counts = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(counts)
}
