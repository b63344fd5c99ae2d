//! Folder modification stamps for cache freshness checks.
//!
//! A source folder's mtime is recorded at the end of every full save. When
//! it later differs, entries may have been added or removed directly under
//! the folder since that save.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Folder modification time in nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderStamp {
    pub mtime_ns: Option<i64>,
}

impl FolderStamp {
    /// Read the stamp of an existing path
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;

        let mtime_ns = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as i64);

        Ok(FolderStamp { mtime_ns })
    }

    /// Parse a stamp stored in the catalog metadata table
    pub fn from_db_value(value: &str) -> Self {
        FolderStamp {
            mtime_ns: value.trim().parse().ok(),
        }
    }

    /// Render for the catalog metadata table
    pub fn to_db_value(&self) -> String {
        self.mtime_ns.map(|ns| ns.to_string()).unwrap_or_default()
    }

    /// Stamps match only when both carry the same known mtime
    pub fn matches(&self, other: &FolderStamp) -> bool {
        self.mtime_ns.is_some() && self.mtime_ns == other.mtime_ns
    }
}
