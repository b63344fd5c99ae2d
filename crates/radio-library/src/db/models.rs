//! Catalog diagnostics models.

use serde::{Deserialize, Serialize};

/// Record counts for one source folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    /// `None` groups legacy rows stored before source scoping existed
    pub source_folder: Option<String>,
    pub tracks: i64,
    pub folder_mtime: Option<String>,
    pub last_scan: Option<String>,
}

/// Catalog-wide record counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total: i64,
    pub per_source: Vec<SourceStats>,
}
