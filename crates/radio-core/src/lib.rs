//! radio-core: Core library for the osu-radio library engine
//!
//! This crate contains the pieces that do not touch the catalog: the track
//! record shared by every layer, the text decoder chain used for legacy
//! descriptor files, and the descriptor parser itself.
//!
//! # Architecture
//!
//! The crate is organized as follows:
//! - `model`: the `Track` record and its dedup key
//! - `decode`: ordered text decoders with a lossy terminal fallback
//! - `descriptor`: line-oriented `.osu` descriptor parsing
//! - `probe`: the audio duration probing seam (lofty-backed by default)
//!
//! # Usage
//!
//! ```ignore
//! use radio_core::{descriptor, probe::LoftyProbe};
//!
//! let track = descriptor::parse("/songs/1 Artist - Title/map.osu", &LoftyProbe);
//! println!("{} - {} ({} ms)", track.artist, track.title, track.duration_ms);
//! ```

pub mod decode;
pub mod descriptor;
pub mod model;
pub mod probe;

// Re-export commonly used types at crate root for convenience
pub use descriptor::{is_descriptor_file, DESCRIPTOR_EXTENSION};
pub use model::{Track, TrackKey};
pub use probe::{AudioProbe, LoftyProbe};
