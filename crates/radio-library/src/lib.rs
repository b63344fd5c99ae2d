//! radio-library: catalog cache and scanning for the osu-radio library.
//!
//! - `db`: the SQLite catalog store
//! - `cache`: staleness policy over the catalog
//! - `scanner`: cancellable folder scans and the custom folder import
//! - `library`: the coordinator that decides between cache, cleanup and scan
//! - `events`: progress notifications emitted by scans
//! - `config`: JSON configuration

pub mod cache;
pub mod config;
pub mod db;
pub mod events;
pub mod library;
pub mod scanner;


pub use cache::{CacheStatus, CacheValidator, Validation};
pub use config::{ConfigError, LibraryConfig};
pub use db::{Catalog, CatalogStats, DbError, SaveMode};
pub use events::{EventSink, ScanEvent};
pub use library::{merge_catalogs, CleanupChoice, LibraryCoordinator, PendingReload, Reload};
pub use scanner::{FolderScanner, ScanHandle, ScanOutcome, ScanState, ScanStats};
