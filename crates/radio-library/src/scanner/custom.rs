//! Import of the custom folder: loose audio files, no descriptors.

use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use radio_core::probe::duration_ms;
use radio_core::{AudioProbe, Track, TrackKey};

use crate::db::Catalog;
use crate::scanner::is_audio_file;

/// Artist label given to imported files
pub const CUSTOM_ARTIST: &str = "Custom";
/// Mapper label given to imported files
pub const CUSTOM_MAPPER: &str = "User";

/// Build the record for one loose audio file
fn custom_track(path: &Path, folder: &str, probe: &dyn AudioProbe) -> Track {
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    Track {
        title,
        artist: CUSTOM_ARTIST.to_string(),
        mapper: CUSTOM_MAPPER.to_string(),
        audio_filename: file_name,
        background_filename: None,
        duration_ms: duration_ms(probe, path),
        descriptor_path: path.to_string_lossy().to_string(),
        folder_path: folder.to_string(),
        source_folder: Some(folder.to_string()),
    }
}

/// Import new audio files directly under `folder` and return its live catalog.
///
/// Files already cached with the same title, artist and audio name are
/// skipped. Sub-directories are not entered.
pub fn import_custom_folder(catalog: &Catalog, folder: &str, probe: &dyn AudioProbe) -> Vec<Track> {
    if !Path::new(folder).is_dir() {
        debug!(folder, "custom folder missing, nothing to import");
        return Vec::new();
    }

    let existing: HashSet<(String, String, String)> = catalog
        .load_all(folder)
        .into_iter()
        .map(|t| (t.title, t.artist, t.audio_filename))
        .collect();

    let mut keys: HashSet<TrackKey> = HashSet::new();
    let mut fresh: Vec<Track> = Vec::new();

    let walker = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_audio_file(path) {
            continue;
        }

        let track = custom_track(path, folder, probe);
        let cached = existing.contains(&(
            track.title.clone(),
            track.artist.clone(),
            track.audio_filename.clone(),
        ));
        // Same stem with two extensions would collide on the catalog key
        if cached || !keys.insert(track.key()) {
            continue;
        }
        fresh.push(track);
    }

    if fresh.is_empty() {
        return catalog.load(folder).unwrap_or_default();
    }

    info!(folder, count = fresh.len(), "importing custom tracks");
    if catalog.save(folder, &fresh) {
        return catalog.load(folder).unwrap_or_default();
    }

    warn!(folder, "custom import not persisted, serving in-memory records");
    let mut tracks = catalog.load(folder).unwrap_or_default();
    tracks.extend(fresh);
    tracks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct NoProbe;

    impl AudioProbe for NoProbe {
        fn duration_secs(&self, _path: &Path) -> Option<f64> {
            None
        }
    }

    fn setup() -> (TempDir, String, Catalog) {
        let dir = tempdir().unwrap();
        let custom = dir.path().join("custom_songs");
        fs::create_dir(&custom).unwrap();
        let catalog = Catalog::new(dir.path().join("songs.db"));
        (dir, custom.to_string_lossy().to_string(), catalog)
    }

    #[test]
    fn test_import_builds_custom_records() {
        let (_dir, custom, catalog) = setup();
        fs::write(Path::new(&custom).join("b side.ogg"), b"x").unwrap();
        fs::write(Path::new(&custom).join("anthem.mp3"), b"x").unwrap();
        fs::write(Path::new(&custom).join("cover.jpg"), b"x").unwrap();

        let tracks = import_custom_folder(&catalog, &custom, &NoProbe);
        assert_eq!(tracks.len(), 2);

        let anthem = tracks.iter().find(|t| t.title == "anthem").unwrap();
        assert_eq!(anthem.artist, "Custom");
        assert_eq!(anthem.mapper, "User");
        assert_eq!(anthem.audio_filename, "anthem.mp3");
        assert_eq!(anthem.duration_ms, 0);
        assert_eq!(anthem.source_folder.as_deref(), Some(custom.as_str()));
        assert!(anthem.is_live());
        assert!(catalog.folder_mtime(&custom).is_some());
    }

    #[test]
    fn test_import_is_not_recursive() {
        let (_dir, custom, catalog) = setup();
        let nested = Path::new(&custom).join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("deep.mp3"), b"x").unwrap();

        assert!(import_custom_folder(&catalog, &custom, &NoProbe).is_empty());
    }

    #[test]
    fn test_reimport_skips_cached_files() {
        let (_dir, custom, catalog) = setup();
        fs::write(Path::new(&custom).join("one.mp3"), b"x").unwrap();
        assert_eq!(import_custom_folder(&catalog, &custom, &NoProbe).len(), 1);

        fs::write(Path::new(&custom).join("two.flac"), b"x").unwrap();
        let tracks = import_custom_folder(&catalog, &custom, &NoProbe);
        assert_eq!(tracks.len(), 2);
        assert_eq!(catalog.stats().total, 2);
    }

    #[test]
    fn test_deleted_file_drops_out() {
        let (_dir, custom, catalog) = setup();
        let one = Path::new(&custom).join("one.mp3");
        fs::write(&one, b"x").unwrap();
        fs::write(Path::new(&custom).join("two.mp3"), b"x").unwrap();
        import_custom_folder(&catalog, &custom, &NoProbe);

        fs::remove_file(&one).unwrap();
        let tracks = import_custom_folder(&catalog, &custom, &NoProbe);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "two");
    }

    #[test]
    fn test_same_stem_keeps_first() {
        let (_dir, custom, catalog) = setup();
        fs::write(Path::new(&custom).join("song.flac"), b"x").unwrap();
        fs::write(Path::new(&custom).join("song.mp3"), b"x").unwrap();

        let tracks = import_custom_folder(&catalog, &custom, &NoProbe);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].audio_filename, "song.flac");
    }

    #[test]
    fn test_missing_folder_is_empty() {
        let (dir, _custom, catalog) = setup();
        let gone = dir.path().join("gone").to_string_lossy().to_string();
        assert!(import_custom_folder(&catalog, &gone, &NoProbe).is_empty());
        assert!(!catalog.exists());
    }
}
