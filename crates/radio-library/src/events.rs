//! Scan event types for progress reporting.
//!
//! Events are fire-and-forget notifications for a progress indicator.
//! Nothing in the engine depends on them being observed.
//!
//! Event naming convention: `domain:action` (e.g., `scan:progress`)

use serde::Serialize;
use std::sync::Arc;

/// Events emitted by a folder scan
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanEvent {
    /// The worker picked up the job
    Started { job_id: String, folder: String },
    /// Human-readable status text
    Progress { job_id: String, message: String },
    /// The catalog was saved with `count` records
    Done { job_id: String, count: usize },
    /// The scan stopped early; nothing was saved
    Cancelled { job_id: String },
}

impl ScanEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ScanEvent::Started { .. } => "scan:started",
            ScanEvent::Progress { .. } => "scan:progress",
            ScanEvent::Done { .. } => "scan:done",
            ScanEvent::Cancelled { .. } => "scan:cancelled",
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            ScanEvent::Started { job_id, .. }
            | ScanEvent::Progress { job_id, .. }
            | ScanEvent::Done { job_id, .. }
            | ScanEvent::Cancelled { job_id } => job_id,
        }
    }
}

/// Receiver for scan events, shared with the worker thread
pub type EventSink = Arc<dyn Fn(&ScanEvent) + Send + Sync>;

/// A sink that drops every event
pub fn null_sink() -> EventSink {
    Arc::new(|_: &ScanEvent| {})
}
