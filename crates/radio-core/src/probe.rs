//! Audio duration probing.

use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;
use tracing::debug;

/// Something that can tell how long an audio file plays
pub trait AudioProbe: Send + Sync {
    /// Duration in seconds, or `None` if the file cannot be probed
    fn duration_secs(&self, path: &Path) -> Option<f64>;
}

/// Probe backed by lofty's audio property readers
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyProbe;

impl AudioProbe for LoftyProbe {
    fn duration_secs(&self, path: &Path) -> Option<f64> {
        let tagged_file = match Probe::open(path).and_then(|probe| probe.read()) {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "audio probe failed");
                return None;
            }
        };

        Some(tagged_file.properties().duration().as_secs_f64())
    }
}

/// Probe a file and convert to whole milliseconds, `0` on any failure
pub fn duration_ms(probe: &dyn AudioProbe, path: &Path) -> i64 {
    if !path.is_file() {
        return 0;
    }
    probe
        .duration_secs(path)
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| (secs * 1000.0) as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    struct FixedProbe(Option<f64>);

    impl AudioProbe for FixedProbe {
        fn duration_secs(&self, _path: &Path) -> Option<f64> {
            self.0
        }
    }

    #[test]
    fn test_lofty_probe_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audio.mp3");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"definitely not an mp3 frame").unwrap();

        assert_eq!(LoftyProbe.duration_secs(&path), None);
        assert_eq!(duration_ms(&LoftyProbe, &path), 0);
    }

    #[test]
    fn test_duration_ms_conversion() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audio.mp3");
        File::create(&path).unwrap();

        assert_eq!(duration_ms(&FixedProbe(Some(83.2519)), &path), 83251);
        assert_eq!(duration_ms(&FixedProbe(None), &path), 0);
        assert_eq!(duration_ms(&FixedProbe(Some(f64::NAN)), &path), 0);
    }

    #[test]
    fn test_duration_ms_missing_file_skips_probe() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.mp3");
        assert_eq!(duration_ms(&FixedProbe(Some(10.0)), &path), 0);
    }
}
