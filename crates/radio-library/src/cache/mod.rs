//! Cache validation.
//!
//! Read-only policy over the catalog: classifies what is cached for a source
//! folder as fresh, partially stale or invalid using only existence checks
//! and the folder's modification stamp. Additions to the folder are never
//! detected here; a changed stamp is only reported as a hint.

use std::path::Path;
use tracing::debug;

use radio_core::Track;

use crate::db::Catalog;
use crate::scanner::fingerprint::FolderStamp;

/// Share of dead records, in percent, at which a rescan is required
pub const STALE_THRESHOLD_PERCENT: usize = 30;

/// Verdict for one source folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The catalog was never initialized
    NoCache,
    /// The source folder is gone from disk
    FolderMissing,
    /// Old catalog without the metadata table
    Outdated,
    /// Nothing cached for this folder
    Empty,
    /// All records live and the folder stamp matches
    UpToDate,
    /// All records live but the folder changed since the last save
    FolderModified,
    /// Some records dead, below the threshold: purge them
    CleanupRecommended,
    /// Too many dead records: rescan
    RescanRequired,
}

impl CacheStatus {
    pub fn is_valid(self) -> bool {
        matches!(
            self,
            CacheStatus::UpToDate | CacheStatus::FolderModified | CacheStatus::CleanupRecommended
        )
    }
}

/// Result of validating one source folder
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub status: CacheStatus,
    pub reason: String,
    /// Dead records, filled for `CleanupRecommended` and `RescanRequired`
    pub missing: Vec<Track>,
    /// Records cached for the folder, dead or alive
    pub total: usize,
}

impl Validation {
    fn new(status: CacheStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            missing: Vec::new(),
            total: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status.is_valid()
    }
}

/// `true` once `missing` reaches the staleness threshold of `total`.
///
/// Integer form of `missing >= 0.3 * total`.
pub fn exceeds_threshold(missing: usize, total: usize) -> bool {
    missing > 0 && missing * 100 >= total * STALE_THRESHOLD_PERCENT
}

pub struct CacheValidator<'a> {
    catalog: &'a Catalog,
}

impl<'a> CacheValidator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn validate(&self, source_folder: &str) -> Validation {
        if !self.catalog.is_initialized() {
            return Validation::new(CacheStatus::NoCache, "no cache");
        }
        if !Path::new(source_folder).is_dir() {
            return Validation::new(CacheStatus::FolderMissing, "folder missing");
        }
        if !self.catalog.has_metadata() {
            return Validation::new(CacheStatus::Outdated, "outdated");
        }

        let cached = self.catalog.load_all(source_folder);
        if cached.is_empty() {
            return Validation::new(CacheStatus::Empty, "no songs cached for this folder");
        }

        let total = cached.len();
        let missing: Vec<Track> = cached.into_iter().filter(|t| !t.is_live()).collect();
        debug!(folder = source_folder, total, missing = missing.len(), "cache checked");

        let (status, reason) = if missing.is_empty() {
            if self.folder_unchanged(source_folder) {
                (CacheStatus::UpToDate, "up to date".to_string())
            } else {
                (CacheStatus::FolderModified, "valid but folder modified".to_string())
            }
        } else if exceeds_threshold(missing.len(), total) {
            (
                CacheStatus::RescanRequired,
                format!("{} of {} cached songs missing, rescan required", missing.len(), total),
            )
        } else {
            (
                CacheStatus::CleanupRecommended,
                format!("{} of {} cached songs missing, cleanup recommended", missing.len(), total),
            )
        };

        Validation {
            status,
            reason,
            missing,
            total,
        }
    }

    fn folder_unchanged(&self, source_folder: &str) -> bool {
        let Some(stored) = self.catalog.folder_mtime(source_folder) else {
            return false;
        };
        match FolderStamp::from_path(Path::new(source_folder)) {
            Ok(current) => FolderStamp::from_db_value(&stored).matches(&current),
            Err(_) => false,
        }
    }
}
