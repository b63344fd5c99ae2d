//! Track record model.
//!
//! One `Track` per unique logical track in a source folder. Records are
//! replaced whole, never patched field by field.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A single catalog entry produced from one descriptor file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Track {
    pub title: String,
    pub artist: String,
    /// Creator/attribution label
    pub mapper: String,
    /// Audio payload, relative to `folder_path`
    pub audio_filename: String,
    /// Cover/background image, relative to `folder_path`
    pub background_filename: Option<String>,
    /// Probed duration, `0` when the payload could not be probed
    pub duration_ms: i64,
    /// Absolute path of the descriptor that produced this record
    pub descriptor_path: String,
    /// Directory containing the descriptor and its media
    pub folder_path: String,
    /// Scan root this record was discovered under. `None` for legacy rows.
    pub source_folder: Option<String>,
}

/// Scan-time dedup key: `(title, artist, mapper)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey {
    pub title: String,
    pub artist: String,
    pub mapper: String,
}

impl Track {
    pub fn key(&self) -> TrackKey {
        TrackKey {
            title: self.title.clone(),
            artist: self.artist.clone(),
            mapper: self.mapper.clone(),
        }
    }

    /// Resolve the audio payload against the track folder
    pub fn audio_path(&self) -> PathBuf {
        Path::new(&self.folder_path).join(&self.audio_filename)
    }

    /// A record is live while its descriptor still exists on disk.
    ///
    /// Never cached: every call hits the filesystem.
    pub fn is_live(&self) -> bool {
        !self.descriptor_path.is_empty() && Path::new(&self.descriptor_path).exists()
    }

    /// Whether this record belongs to `source_folder`, either by its stored
    /// scope or, for legacy unscoped rows, by its folder lying under it.
    ///
    /// The legacy match is per path component: `/songs` does not claim
    /// `/songs_backup`.
    pub fn belongs_to(&self, source_folder: &str) -> bool {
        match &self.source_folder {
            Some(scope) => scope == source_folder,
            None => Path::new(&self.folder_path).starts_with(source_folder),
        }
    }
}
