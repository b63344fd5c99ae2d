//! Full scan of one descriptor tree.
//!
//! The walk is deterministic (entries sorted by file name) so that
//! first-occurrence-wins dedup picks the same record on every run.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use radio_core::{descriptor, is_descriptor_file, AudioProbe, Track, TrackKey};

use crate::db::{Catalog, SaveMode};
use crate::events::{null_sink, EventSink, ScanEvent};
use crate::scanner::handle::{CancelToken, FinishGuard, ScanHandle};
use crate::scanner::{ScanOutcome, ScanStats};

/// Default number of visited files between periodic progress messages
pub const DEFAULT_PROGRESS_EVERY: usize = 50;

/// A single-use scan bound to one source folder
pub struct FolderScanner {
    job_id: String,
    source_folder: String,
    catalog: Catalog,
    probe: Arc<dyn AudioProbe>,
    sink: EventSink,
    progress_every: usize,
    save_mode: SaveMode,
    commit_gate: Arc<Mutex<()>>,
    token: CancelToken,
}

impl FolderScanner {
    pub fn new(source_folder: impl Into<String>, catalog: Catalog, probe: Arc<dyn AudioProbe>) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            source_folder: source_folder.into(),
            catalog,
            probe,
            sink: null_sink(),
            progress_every: DEFAULT_PROGRESS_EVERY,
            save_mode: SaveMode::Merge,
            commit_gate: Arc::new(Mutex::new(())),
            token: CancelToken::new(),
        }
    }

    pub fn with_sink(mut self, sink: EventSink) -> Self {
        self.sink = sink;
        self
    }

    /// Emit a progress message every `n` visited files; `0` disables it
    pub fn with_progress_every(mut self, n: usize) -> Self {
        self.progress_every = n;
        self
    }

    pub fn with_save_mode(mut self, mode: SaveMode) -> Self {
        self.save_mode = mode;
        self
    }

    /// Share a commit gate with other scans of the same catalog
    pub fn with_commit_gate(mut self, gate: Arc<Mutex<()>>) -> Self {
        self.commit_gate = gate;
        self
    }

    pub fn with_token(mut self, token: CancelToken) -> Self {
        self.token = token;
        self
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn source_folder(&self) -> &str {
        &self.source_folder
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    fn emit(&self, event: ScanEvent) {
        (self.sink)(&event);
    }

    fn cancelled(&self, stats: ScanStats, checkpoint: &str) -> ScanOutcome {
        info!(
            job_id = %self.job_id,
            folder = %self.source_folder,
            checkpoint,
            visited = stats.visited,
            "scan cancelled"
        );
        self.emit(ScanEvent::Cancelled {
            job_id: self.job_id.clone(),
        });
        ScanOutcome::Cancelled { stats }
    }

    /// Run the scan on the current thread
    pub fn run(self) -> ScanOutcome {
        let mut stats = ScanStats::default();

        if self.token.is_cancelled() {
            return self.cancelled(stats, "start");
        }

        info!(job_id = %self.job_id, folder = %self.source_folder, "scan started");
        self.emit(ScanEvent::Started {
            job_id: self.job_id.clone(),
            folder: self.source_folder.clone(),
        });

        let mut seen: HashSet<TrackKey> = HashSet::new();
        let mut tracks: Vec<Track> = Vec::new();

        let walker = WalkDir::new(&self.source_folder)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if self.token.is_cancelled() {
                return self.cancelled(stats, "walk");
            }

            stats.visited += 1;
            if self.progress_every > 0 && stats.visited % self.progress_every == 0 {
                self.emit(ScanEvent::Progress {
                    job_id: self.job_id.clone(),
                    message: format!("Scanned {} files...", stats.visited),
                });
            }

            let path = entry.path();
            if !is_descriptor_file(path) {
                continue;
            }

            let mut track = descriptor::parse(path, self.probe.as_ref());
            stats.parsed += 1;

            if !has_audio(&track) {
                debug!(descriptor = %path.display(), "rejected: audio missing");
                stats.rejected += 1;
                continue;
            }

            if !seen.insert(track.key()) {
                stats.duplicates += 1;
                continue;
            }

            track.source_folder = Some(self.source_folder.clone());
            self.emit(ScanEvent::Progress {
                job_id: self.job_id.clone(),
                message: format!("Found beatmap: {} - {}", track.artist, track.title),
            });
            tracks.push(track);
        }

        stats.unique = tracks.len();

        if self.token.is_cancelled() {
            return self.cancelled(stats, "before save");
        }

        {
            let _gate = self.commit_gate.lock();
            if self.token.is_cancelled() {
                return self.cancelled(stats, "commit gate");
            }
            stats.saved = self
                .catalog
                .save_with(&self.source_folder, &tracks, self.save_mode);
        }

        if !stats.saved {
            warn!(job_id = %self.job_id, folder = %self.source_folder, "scan results not persisted");
        }

        if self.token.is_cancelled() {
            return self.cancelled(stats, "before done");
        }

        info!(
            job_id = %self.job_id,
            folder = %self.source_folder,
            count = tracks.len(),
            visited = stats.visited,
            duplicates = stats.duplicates,
            rejected = stats.rejected,
            "scan completed"
        );
        self.emit(ScanEvent::Done {
            job_id: self.job_id.clone(),
            count: tracks.len(),
        });

        ScanOutcome::Completed { tracks, stats }
    }

    /// Run the scan on a detached worker thread
    pub fn spawn(self) -> ScanHandle {
        let handle = ScanHandle::new(self.job_id.clone(), self.token.clone());
        let worker = handle.clone();
        let name = format!("scan-{}", &self.job_id[..8]);

        let spawned = thread::Builder::new().name(name).spawn(move || {
            let guard = FinishGuard(worker);
            guard.0.mark_running();
            let outcome = self.run();
            guard.0.finish(outcome);
        });

        if let Err(e) = spawned {
            warn!(job_id = %handle.job_id(), error = %e, "failed to start scan worker");
            handle.cancel();
            handle.finish(ScanOutcome::Cancelled {
                stats: ScanStats::default(),
            });
        }

        handle
    }
}

/// Whether the record names an audio payload that exists on disk
fn has_audio(track: &Track) -> bool {
    !track.audio_filename.is_empty() && track.audio_path().exists()
}
