//! chaptercast - Chaptered podcast assembly engine
//!
//! Takes an ordered list of synthesized speech clips and turns them into a
//! single chaptered M4A file.
//!
//! # Architecture
//!
//! One assembly run is strictly sequential:
//! - Merge: clips are decoded and appended to one timeline with silence
//!   between them; each merged clip becomes a chapter
//! - Metadata: chapters are written as an FFMETADATA1 file
//! - Transcode: ffmpeg muxes the merged audio and the chapters
//!
//! Intermediate files live in a per-run scratch directory and are removed
//! before the call returns, whatever the outcome.
//!
//! # Modules
//!
//! - `audio`: Decoders and the in-memory timeline
//! - `core`: Merger, metadata encoder, transcoder, engine
//! - `domain`: Data structures (Segment, Chapter, AssemblyResult)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Assemble a podcast from the synthesis stage's manifest
//! chaptercast assemble --manifest segments.json --output-dir podcasts
//!
//! # Preview the chapter layout without encoding
//! chaptercast chapters --manifest segments.json
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::core::{Assembler, AssemblyError, AssemblyRequest, ErrorKind, SilencePolicy};
pub use audio::{AudioFormat, Clip, SegmentDecoder, SegmentLoadError};
pub use config::Config;
pub use domain::{AssemblyResult, Chapter, Segment, SegmentManifest};
