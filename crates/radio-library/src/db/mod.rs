//! Catalog store for the osu-radio library.
//!
//! The catalog is a single SQLite file holding the `songs` table and a small
//! `metadata` key/value table. Every operation opens its own short-lived
//! connection; no handle is kept between calls.
//!
//! The public `Catalog` methods implement the store contract: failures are
//! logged and turned into a "no result" value so callers can always fall
//! back to treating the cache as missing.

pub mod metadata;
pub mod models;
pub mod schema;
pub mod songs;

#[cfg(test)]
mod catalog_props_test;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use radio_core::Track;

use crate::scanner::fingerprint::FolderStamp;

pub use models::*;

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog not initialized: {0}")]
    NotInitialized(String),
}

pub type DbResult<T> = Result<T, DbError>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How `save` treats rows already stored for the folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Upsert only; rows not in the new set are left alone
    #[default]
    Merge,
    /// Drop every row of the folder first, then insert the new set
    Overwrite,
}

/// Handle to the catalog file. Cheap to clone; holds no connection.
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
}

impl Catalog {
    /// Point at a catalog file. Nothing is opened or created yet.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the catalog file exists at all
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Open a fresh connection
    pub fn conn(&self) -> DbResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Execute a function with a fresh connection
    pub fn with_conn<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let conn = self.conn()?;
        f(&conn)
    }

    /// Execute a function within a transaction on a fresh connection
    pub fn transaction<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let mut conn = self.conn()?;

        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;

        Ok(result)
    }

    /// Open an existing catalog for reading, bringing old shapes up to date.
    ///
    /// Never creates the file.
    fn with_existing<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        if !self.exists() {
            return Err(DbError::NotInitialized(self.path.display().to_string()));
        }
        self.with_conn(|conn| {
            if !schema::table_exists(conn, schema::SONGS_TABLE)? {
                return Err(DbError::NotInitialized(self.path.display().to_string()));
            }
            schema::run_migrations(conn)?;
            f(conn)
        })
    }

    // ------------------------------------------------------------------
    // Store contract
    // ------------------------------------------------------------------

    /// Create tables and add any later columns. Idempotent.
    pub fn init(&self) -> bool {
        match self.try_init() {
            Ok(()) => true,
            Err(e) => {
                warn!(catalog = %self.path.display(), error = %e, "catalog init failed");
                false
            }
        }
    }

    fn try_init(&self) -> DbResult<()> {
        self.with_conn(|conn| {
            schema::create_tables(conn)?;
            schema::run_migrations(conn)
        })
    }

    /// Live records cached for `source_folder`, or `None` if there are none
    pub fn load(&self, source_folder: &str) -> Option<Vec<Track>> {
        let live: Vec<Track> = self
            .load_all(source_folder)
            .into_iter()
            .filter(Track::is_live)
            .collect();

        if live.is_empty() { None } else { Some(live) }
    }

    /// Every record cached for `source_folder`, dead or alive
    pub fn load_all(&self, source_folder: &str) -> Vec<Track> {
        match self.with_existing(|conn| songs::select_for_folder(conn, source_folder)) {
            Ok(tracks) => tracks,
            Err(DbError::NotInitialized(_)) => Vec::new(),
            Err(e) => {
                warn!(folder = source_folder, error = %e, "catalog load failed");
                Vec::new()
            }
        }
    }

    /// Upsert `tracks` for `source_folder` and stamp the folder mtime
    pub fn save(&self, source_folder: &str, tracks: &[Track]) -> bool {
        self.save_with(source_folder, tracks, SaveMode::Merge)
    }

    /// Save in a single transaction: all rows and the metadata entry, or none
    pub fn save_with(&self, source_folder: &str, tracks: &[Track], mode: SaveMode) -> bool {
        match self.try_save(source_folder, tracks, mode) {
            Ok(count) => {
                info!(folder = source_folder, count, ?mode, "catalog saved");
                true
            }
            Err(e) => {
                warn!(folder = source_folder, error = %e, "catalog save failed");
                false
            }
        }
    }

    fn try_save(&self, source_folder: &str, tracks: &[Track], mode: SaveMode) -> DbResult<usize> {
        let stamp = FolderStamp::from_path(Path::new(source_folder))?;
        self.try_init()?;

        self.transaction(|tx| {
            if mode == SaveMode::Overwrite {
                let dropped = songs::delete_for_folder(tx, source_folder)?;
                debug!(folder = source_folder, dropped, "overwrite pass");
            }
            let count = songs::upsert_tracks(tx, source_folder, tracks)?;
            metadata::set_value(tx, &metadata::folder_mtime_key(source_folder), &stamp.to_db_value())?;
            metadata::set_value(
                tx,
                &metadata::last_scan_key(source_folder),
                &chrono::Utc::now().to_rfc3339(),
            )?;
            Ok(count)
        })
    }

    /// Delete rows matching each track's `(title, artist, mapper)`.
    ///
    /// Returns the number of rows actually removed.
    pub fn remove(&self, tracks: &[Track]) -> usize {
        if tracks.is_empty() {
            return 0;
        }
        let result = self
            .with_existing(|_| Ok(()))
            .and_then(|_| self.transaction(|tx| songs::delete_by_keys(tx, tracks)));

        match result {
            Ok(removed) => {
                info!(requested = tracks.len(), removed, "removed cached tracks");
                removed
            }
            Err(e) => {
                warn!(error = %e, "catalog remove failed");
                0
            }
        }
    }

    /// Record counts, total and per source folder
    pub fn stats(&self) -> CatalogStats {
        match self.with_existing(|conn| {
            let per_source = songs::count_by_source(conn)?
                .into_iter()
                .map(|(source_folder, tracks)| -> DbResult<SourceStats> {
                    let (folder_mtime, last_scan) = match &source_folder {
                        Some(folder) => (
                            metadata::get_value(conn, &metadata::folder_mtime_key(folder))?,
                            metadata::get_value(conn, &metadata::last_scan_key(folder))?,
                        ),
                        None => (None, None),
                    };
                    Ok(SourceStats {
                        source_folder,
                        tracks,
                        folder_mtime,
                        last_scan,
                    })
                })
                .collect::<DbResult<Vec<_>>>()?;

            Ok(CatalogStats {
                total: per_source.iter().map(|s| s.tracks).sum(),
                per_source,
            })
        }) {
            Ok(stats) => stats,
            Err(DbError::NotInitialized(_)) => CatalogStats::default(),
            Err(e) => {
                warn!(error = %e, "catalog stats failed");
                CatalogStats::default()
            }
        }
    }

    /// Drop every cached record and metadata entry
    pub fn clear(&self) -> bool {
        if !self.exists() {
            return true;
        }
        let result = self.try_init().and_then(|_| {
            self.transaction(|tx| {
                let dropped = songs::delete_all(tx)?;
                let entries = metadata::delete_all(tx)?;
                Ok((dropped, entries))
            })
        });

        match result {
            Ok((dropped, entries)) => {
                info!(songs = dropped, entries, "catalog cleared");
                true
            }
            Err(e) => {
                warn!(error = %e, "catalog clear failed");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Read-only probes used by the cache validator
    // ------------------------------------------------------------------

    /// Whether the songs table exists, i.e. the store was ever initialized
    pub fn is_initialized(&self) -> bool {
        self.exists()
            && self
                .with_conn(|conn| schema::table_exists(conn, schema::SONGS_TABLE))
                .unwrap_or(false)
    }

    /// Whether the metadata table exists (absent in the oldest catalogs)
    pub fn has_metadata(&self) -> bool {
        self.exists()
            && self
                .with_conn(|conn| schema::table_exists(conn, schema::METADATA_TABLE))
                .unwrap_or(false)
    }

    /// The mtime stamp recorded by the last full save of `source_folder`
    pub fn folder_mtime(&self, source_folder: &str) -> Option<String> {
        self.with_existing(|conn| {
            if !schema::table_exists(conn, schema::METADATA_TABLE)? {
                return Ok(None);
            }
            metadata::get_value(conn, &metadata::folder_mtime_key(source_folder))
        })
        .unwrap_or_else(|e| {
            debug!(folder = source_folder, error = %e, "no stored folder mtime");
            None
        })
    }
}
