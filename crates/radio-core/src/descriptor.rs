//! Descriptor (`.osu`) parsing.
//!
//! A descriptor is a line-oriented text file of `Key: Value` pairs plus
//! comma-separated event lines. Only the handful of fields the catalog
//! needs are extracted; everything else is ignored. Parsing never fails:
//! unreadable or malformed input yields a track with empty fields.

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::decode::decode_text;
use crate::model::Track;
use crate::probe::{duration_ms, AudioProbe};

/// Descriptor file extension, without the dot
pub const DESCRIPTOR_EXTENSION: &str = "osu";

/// Check if a path has the descriptor extension (case-insensitive)
pub fn is_descriptor_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(DESCRIPTOR_EXTENSION))
        .unwrap_or(false)
}

/// Parse one descriptor file and probe its audio payload.
///
/// `source_folder` is left unset; the scanner assigns it.
pub fn parse(path: impl AsRef<Path>, probe: &dyn AudioProbe) -> Track {
    let path = path.as_ref();
    let folder = path
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut track = Track {
        descriptor_path: path.to_string_lossy().to_string(),
        folder_path: folder,
        ..Default::default()
    };

    let text = match fs::read(path) {
        Ok(bytes) => decode_text(&bytes),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable descriptor");
            return track;
        }
    };

    apply_lines(&mut track, &text);

    if !track.audio_filename.is_empty() {
        track.duration_ms = duration_ms(probe, &track.audio_path());
    }

    track
}

/// Fill track fields from descriptor text
fn apply_lines(track: &mut Track, text: &str) {
    for raw in text.lines() {
        let line = raw.trim();

        if let Some(value) = lenient_value(line, "audiofilename") {
            if !value.is_empty() {
                track.audio_filename = value.to_string();
            }
        } else if let Some(value) = strict_value(line, "title") {
            track.title = value.to_string();
        } else if let Some(value) = strict_value(line, "artist") {
            track.artist = value.to_string();
        } else if let Some(value) = strict_value(line, "creator") {
            track.mapper = value.to_string();
        } else if line.starts_with("0,0") && track.background_filename.is_none() {
            track.background_filename = background_event(line).map(str::to_string);
        }
    }
}

/// `key:value` with no whitespace allowed between key and colon
fn strict_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let head = line.get(..key.len())?;
    if !head.eq_ignore_ascii_case(key) {
        return None;
    }
    line[key.len()..].strip_prefix(':').map(str::trim)
}

/// `key <ws> : <ws> value`
fn lenient_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let head = line.get(..key.len())?;
    if !head.eq_ignore_ascii_case(key) {
        return None;
    }
    line[key.len()..].trim_start().strip_prefix(':').map(str::trim)
}

/// Extract the quoted file from a `0,0,"file",x,y` background event
///
/// An empty `0,0,""` does not end the search; later events on the line count.
fn background_event(line: &str) -> Option<&str> {
    const OPEN: &str = "0,0,\"";
    line.match_indices(OPEN).find_map(|(i, _)| {
        let rest = &line[i + OPEN.len()..];
        let file = &rest[..rest.find('"')?];
        (!file.is_empty()).then_some(file)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingProbe {
        calls: AtomicUsize,
        secs: Option<f64>,
    }

    impl CountingProbe {
        fn new(secs: Option<f64>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                secs,
            }
        }
    }

    impl AudioProbe for CountingProbe {
        fn duration_secs(&self, _path: &Path) -> Option<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.secs
        }
    }

    const SAMPLE: &str = "osu file format v14

[General]
AudioFilename: audio.mp3
AudioLeadIn: 0

[Metadata]
Title:Blue Zenith
TitleUnicode:Blue Zenith (unicode)
Artist:xi
ArtistUnicode:xi
Creator:Asphyxia
Version:FOUR DIMENSIONS

[Events]
//Background and Video events
0,0,\"bg.jpg\",0,0
0,0,\"second.jpg\",0,0
";

    fn write(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_is_descriptor_file() {
        assert!(is_descriptor_file(Path::new("map.osu")));
        assert!(is_descriptor_file(Path::new("/songs/set/MAP.OSU")));
        assert!(!is_descriptor_file(Path::new("audio.mp3")));
        assert!(!is_descriptor_file(Path::new("osu")));
    }

    #[test]
    fn test_parse_fields() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "map.osu", SAMPLE.as_bytes());
        write(dir.path(), "audio.mp3", b"fake");

        let probe = CountingProbe::new(Some(215.5));
        let track = parse(&path, &probe);

        assert_eq!(track.title, "Blue Zenith");
        assert_eq!(track.artist, "xi");
        assert_eq!(track.mapper, "Asphyxia");
        assert_eq!(track.audio_filename, "audio.mp3");
        assert_eq!(track.background_filename.as_deref(), Some("bg.jpg"));
        assert_eq!(track.duration_ms, 215_500);
        assert_eq!(track.descriptor_path, path.to_string_lossy());
        assert_eq!(track.folder_path, dir.path().to_string_lossy());
        assert_eq!(track.source_folder, None);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_case_insensitive_keys() {
        let dir = tempdir().unwrap();
        let content = "audiofilename   :   song.ogg\nTITLE: Loud\nartist:Someone\nCREATOR:me\n";
        let path = write(dir.path(), "map.osu", content.as_bytes());

        let track = parse(&path, &CountingProbe::new(None));
        assert_eq!(track.audio_filename, "song.ogg");
        assert_eq!(track.title, "Loud");
        assert_eq!(track.artist, "Someone");
        assert_eq!(track.mapper, "me");
    }

    #[test]
    fn test_parse_missing_audio_skips_probe() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "map.osu", SAMPLE.as_bytes());

        let probe = CountingProbe::new(Some(1.0));
        let track = parse(&path, &probe);

        assert_eq!(track.audio_filename, "audio.mp3");
        assert_eq!(track.duration_ms, 0);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parse_probe_failure_is_zero() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "map.osu", SAMPLE.as_bytes());
        write(dir.path(), "audio.mp3", b"fake");

        let track = parse(&path, &CountingProbe::new(None));
        assert_eq!(track.duration_ms, 0);
    }

    #[test]
    fn test_parse_garbage_defaults() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "map.osu", &[0xFF, 0x00, 0x98, 0x12, b'\n', 0xC3]);

        let track = parse(&path, &CountingProbe::new(None));
        assert!(track.title.is_empty());
        assert!(track.artist.is_empty());
        assert!(track.mapper.is_empty());
        assert!(track.audio_filename.is_empty());
        assert_eq!(track.background_filename, None);
    }

    #[test]
    fn test_parse_unreadable_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.osu");

        let track = parse(&path, &CountingProbe::new(None));
        assert_eq!(track.descriptor_path, path.to_string_lossy());
        assert!(track.title.is_empty());
    }

    #[test]
    fn test_parse_cp1251_metadata() {
        let dir = tempdir().unwrap();
        let mut content = b"Title:".to_vec();
        // "Мир" in cp1251
        content.extend_from_slice(&[0xCC, 0xE8, 0xF0]);
        content.extend_from_slice(b"\nArtist:A\n");
        let path = write(dir.path(), "map.osu", &content);

        let track = parse(&path, &CountingProbe::new(None));
        assert_eq!(track.title, "Мир");
        assert_eq!(track.artist, "A");
    }

    #[test]
    fn test_background_event_variants() {
        assert_eq!(background_event("0,0,\"bg.png\",0,0"), Some("bg.png"));
        assert_eq!(background_event("0,0,\"\",0,0"), None);
        assert_eq!(background_event("0,0,bg.png"), None);
        assert_eq!(background_event("0,0,\"\",0,0,\"late.jpg\",0,0"), Some("late.jpg"));
        assert_eq!(background_event("0,0,\"unterminated"), None);
    }

    #[test]
    fn test_title_unicode_not_title() {
        assert_eq!(strict_value("TitleUnicode:x", "title"), None);
        assert_eq!(strict_value("Title : x", "title"), None);
        assert_eq!(lenient_value("AudioFilename : a.mp3", "audiofilename"), Some("a.mp3"));
    }
}
