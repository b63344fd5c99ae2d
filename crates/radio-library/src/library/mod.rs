//! Library coordinator.
//!
//! Ties the validator, the scanner and the custom import together for one
//! primary descriptor tree plus the custom folder. At most one scan of the
//! primary folder is active at a time; starting another supersedes it.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use radio_core::{AudioProbe, LoftyProbe, Track};

use crate::cache::{CacheStatus, CacheValidator, Validation};
use crate::config::{ConfigError, ConfigResult, LibraryConfig};
use crate::db::{Catalog, SaveMode};
use crate::events::{null_sink, EventSink};
use crate::scanner::folder::DEFAULT_PROGRESS_EVERY;
use crate::scanner::{import_custom_folder, FolderScanner, ScanHandle};

const DEFAULT_SUPERSEDE_TIMEOUT: Duration = Duration::from_millis(5000);

/// What to do when some cached records are dead but a rescan is not required
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupChoice {
    /// Remove only the dead records
    Purge,
    /// Walk the whole tree again
    Rescan,
    /// Serve the live records, leave the dead ones cached
    UseAsIs,
}

/// Result of a reload request
#[derive(Debug)]
pub enum Reload {
    /// Served from the catalog without walking the tree
    Cached {
        tracks: Vec<Track>,
        validation: Validation,
    },
    /// Dead records were purged, then served from the catalog
    Cleaned { tracks: Vec<Track>, removed: usize },
    /// A scan is running; wait on it for the merged catalog
    Scanning(PendingReload),
}

impl Reload {
    /// Block until the catalog is available; `None` if the scan was cancelled
    pub fn wait(self) -> Option<Vec<Track>> {
        match self {
            Reload::Cached { tracks, .. } | Reload::Cleaned { tracks, .. } => Some(tracks),
            Reload::Scanning(pending) => pending.wait(),
        }
    }
}

/// A reload waiting on a background scan
pub struct PendingReload {
    handle: ScanHandle,
    catalog: Catalog,
    custom_folder: String,
    probe: Arc<dyn AudioProbe>,
}

impl std::fmt::Debug for PendingReload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReload")
            .field("handle", &self.handle)
            .field("custom_folder", &self.custom_folder)
            .finish()
    }
}

impl PendingReload {
    pub fn handle(&self) -> &ScanHandle {
        &self.handle
    }

    pub fn job_id(&self) -> &str {
        self.handle.job_id()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Wait for the scan, then merge its records with the custom folder.
    ///
    /// `None` when the scan was cancelled or superseded.
    pub fn wait(self) -> Option<Vec<Track>> {
        let scanned = self.handle.wait().into_tracks()?;
        let custom = import_custom_folder(&self.catalog, &self.custom_folder, self.probe.as_ref());
        Some(merge_catalogs([scanned, custom]))
    }
}

/// Merge per-source catalogs into one flat list of live records.
///
/// Records are identified by descriptor path; the first occurrence wins.
pub fn merge_catalogs<I>(sources: I) -> Vec<Track>
where
    I: IntoIterator<Item = Vec<Track>>,
{
    let mut seen: HashSet<String> = HashSet::new();
    sources
        .into_iter()
        .flatten()
        .filter(|t| t.is_live() && seen.insert(t.descriptor_path.clone()))
        .collect()
}

fn absolute_string(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

pub struct LibraryCoordinator {
    catalog: Catalog,
    primary_folder: String,
    custom_folder: String,
    probe: Arc<dyn AudioProbe>,
    sink: EventSink,
    progress_every: usize,
    supersede_timeout: Duration,
    active: Mutex<Option<ScanHandle>>,
    commit_gate: Arc<Mutex<()>>,
}

impl LibraryCoordinator {
    pub fn new(catalog: Catalog, primary_folder: impl AsRef<Path>) -> Self {
        Self {
            catalog,
            primary_folder: absolute_string(primary_folder.as_ref()),
            custom_folder: absolute_string(Path::new("custom_songs")),
            probe: Arc::new(LoftyProbe),
            sink: null_sink(),
            progress_every: DEFAULT_PROGRESS_EVERY,
            supersede_timeout: DEFAULT_SUPERSEDE_TIMEOUT,
            active: Mutex::new(None),
            commit_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_config(config: &LibraryConfig) -> ConfigResult<Self> {
        let primary = config
            .primary_folder
            .as_ref()
            .ok_or(ConfigError::MissingPrimaryFolder)?;

        Ok(Self::new(Catalog::new(&config.database_path), primary)
            .with_custom_folder(&config.custom_folder)
            .with_progress_every(config.progress_every)
            .with_supersede_timeout(config.supersede_timeout()))
    }

    pub fn with_custom_folder(mut self, folder: impl AsRef<Path>) -> Self {
        self.custom_folder = absolute_string(folder.as_ref());
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn AudioProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_sink(mut self, sink: EventSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_progress_every(mut self, n: usize) -> Self {
        self.progress_every = n;
        self
    }

    pub fn with_supersede_timeout(mut self, timeout: Duration) -> Self {
        self.supersede_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn primary_folder(&self) -> &str {
        &self.primary_folder
    }

    pub fn custom_folder(&self) -> &str {
        &self.custom_folder
    }

    /// Classify what is cached for the primary folder
    pub fn validate(&self) -> Validation {
        CacheValidator::new(&self.catalog).validate(&self.primary_folder)
    }

    /// Produce the merged catalog, from cache when possible.
    ///
    /// `choose` is only consulted when some cached records are dead but
    /// fewer than the rescan threshold.
    pub fn reload<F>(&self, force: bool, choose: F) -> Reload
    where
        F: FnOnce(&Validation) -> CleanupChoice,
    {
        if force {
            info!(folder = %self.primary_folder, "forced rescan");
            return Reload::Scanning(self.start_scan(SaveMode::Overwrite));
        }

        let validation = self.validate();
        debug!(folder = %self.primary_folder, status = ?validation.status, reason = %validation.reason, "cache validated");

        match validation.status {
            CacheStatus::UpToDate | CacheStatus::FolderModified => Reload::Cached {
                tracks: self.cached_catalog(),
                validation,
            },
            CacheStatus::CleanupRecommended => match choose(&validation) {
                CleanupChoice::Purge => {
                    let removed = self.catalog.remove(&validation.missing);
                    info!(folder = %self.primary_folder, removed, "purged dead records");
                    Reload::Cleaned {
                        tracks: self.cached_catalog(),
                        removed,
                    }
                }
                CleanupChoice::Rescan => Reload::Scanning(self.start_scan(SaveMode::Overwrite)),
                CleanupChoice::UseAsIs => Reload::Cached {
                    tracks: self.cached_catalog(),
                    validation,
                },
            },
            _ => {
                info!(folder = %self.primary_folder, reason = %validation.reason, "cache invalid, rescanning");
                Reload::Scanning(self.start_scan(SaveMode::Overwrite))
            }
        }
    }

    /// `reload` that waits for any scan it starts
    pub fn reload_blocking<F>(&self, force: bool, choose: F) -> Option<Vec<Track>>
    where
        F: FnOnce(&Validation) -> CleanupChoice,
    {
        self.reload(force, choose).wait()
    }

    /// Live primary and custom records, straight from the catalog.
    ///
    /// Touches no folder: new custom files are only picked up after a scan.
    pub fn cached_catalog(&self) -> Vec<Track> {
        let primary = self.catalog.load(&self.primary_folder).unwrap_or_default();
        let custom = self.catalog.load(&self.custom_folder).unwrap_or_default();
        merge_catalogs([primary, custom])
    }

    /// Start a scan of the primary folder, superseding any running one
    pub fn start_scan(&self, mode: SaveMode) -> PendingReload {
        let mut active = self.active.lock();

        if let Some(previous) = active.take() {
            self.supersede(&previous);
        }

        let handle = FolderScanner::new(&self.primary_folder, self.catalog.clone(), self.probe.clone())
            .with_sink(self.sink.clone())
            .with_progress_every(self.progress_every)
            .with_save_mode(mode)
            .with_commit_gate(self.commit_gate.clone())
            .spawn();
        *active = Some(handle.clone());

        PendingReload {
            handle,
            catalog: self.catalog.clone(),
            custom_folder: self.custom_folder.clone(),
            probe: self.probe.clone(),
        }
    }

    fn supersede(&self, previous: &ScanHandle) {
        if previous.is_finished() {
            return;
        }
        info!(job_id = %previous.job_id(), "superseding running scan");
        {
            // Either the old scan already committed, or it never will
            let _gate = self.commit_gate.lock();
            previous.cancel();
        }
        if !previous.wait_timeout(self.supersede_timeout) {
            warn!(
                job_id = %previous.job_id(),
                timeout_ms = self.supersede_timeout.as_millis() as u64,
                "superseded scan did not stop in time, detaching"
            );
        }
    }

    /// Cancel the active scan, if any. Returns whether one was running.
    pub fn cancel_active(&self) -> bool {
        let Some(handle) = self.active.lock().take() else {
            return false;
        };
        if handle.is_finished() {
            return false;
        }
        let _gate = self.commit_gate.lock();
        handle.cancel();
        info!(job_id = %handle.job_id(), "scan cancelled by request");
        true
    }

    /// Handle to the most recently started scan, if one is running
    pub fn active_scan(&self) -> Option<ScanHandle> {
        self.active.lock().as_ref().filter(|h| !h.is_finished()).cloned()
    }
}
