//! Library scanner module.
//!
//! - `folder`: the cancellable full scan of a descriptor tree
//! - `custom`: the flat import of a folder of loose audio files
//! - `handle`: cancellation tokens and handles to running scans
//! - `fingerprint`: folder mtime stamps used for freshness checks
//!
//! A scan never commits partial results: the catalog is written once, after
//! the whole tree has been walked without cancellation.

pub mod custom;
pub mod fingerprint;
pub mod folder;
pub mod handle;

use serde::{Deserialize, Serialize};
use std::path::Path;

use radio_core::Track;

pub use custom::import_custom_folder;
pub use folder::FolderScanner;
pub use handle::{CancelToken, ScanHandle};

/// Audio extensions accepted by the custom folder import
pub const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".wav", ".ogg", ".flac", ".m4a", ".opus"];

/// Statistics from one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Files visited during the walk
    pub visited: usize,
    /// Descriptor files parsed
    pub parsed: usize,
    /// Records kept after dedup
    pub unique: usize,
    /// Records dropped because an earlier one had the same key
    pub duplicates: usize,
    /// Records dropped for a missing audio reference
    pub rejected: usize,
    /// Whether the catalog accepted the results
    pub saved: bool,
}

/// Lifecycle of a single scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl ScanState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanState::Completed | ScanState::Cancelled)
    }
}

/// Terminal result of a scan
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// The whole tree was walked; `tracks` is the deduplicated record set
    Completed { tracks: Vec<Track>, stats: ScanStats },
    /// Stopped early; the catalog was not written by this scan
    Cancelled { stats: ScanStats },
}

impl ScanOutcome {
    pub fn state(&self) -> ScanState {
        match self {
            ScanOutcome::Completed { .. } => ScanState::Completed,
            ScanOutcome::Cancelled { .. } => ScanState::Cancelled,
        }
    }

    pub fn stats(&self) -> &ScanStats {
        match self {
            ScanOutcome::Completed { stats, .. } | ScanOutcome::Cancelled { stats } => stats,
        }
    }

    pub fn into_tracks(self) -> Option<Vec<Track>> {
        match self {
            ScanOutcome::Completed { tracks, .. } => Some(tracks),
            ScanOutcome::Cancelled { .. } => None,
        }
    }
}

/// Check if a path has a supported audio extension
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = format!(".{}", ext.to_lowercase());
            AUDIO_EXTENSIONS.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("song.mp3")));
        assert!(is_audio_file(Path::new("song.MP3")));
        assert!(is_audio_file(Path::new("song.flac")));
        assert!(is_audio_file(Path::new("song.m4a")));
        assert!(is_audio_file(Path::new("song.ogg")));
        assert!(is_audio_file(Path::new("song.wav")));
        assert!(is_audio_file(Path::new("song.opus")));
        assert!(!is_audio_file(Path::new("song.aac")));
        assert!(!is_audio_file(Path::new("map.osu")));
        assert!(!is_audio_file(Path::new("noext")));
    }

    #[test]
    fn test_is_audio_file_with_path() {
        assert!(is_audio_file(&PathBuf::from("/custom_songs/track.mp3")));
        assert!(!is_audio_file(&PathBuf::from("/custom_songs/cover.jpg")));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ScanState::Idle.is_terminal());
        assert!(!ScanState::Running.is_terminal());
        assert!(ScanState::Completed.is_terminal());
        assert!(ScanState::Cancelled.is_terminal());

        let outcome = ScanOutcome::Cancelled {
            stats: ScanStats::default(),
        };
        assert_eq!(outcome.state(), ScanState::Cancelled);
        assert_eq!(outcome.into_tracks(), None);
    }
}
