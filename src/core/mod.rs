//! Core assembly logic.
//!
//! This module contains:
//! - Merger: Sequential segment merge and chapter boundaries
//! - Metadata: FFMETADATA1 chapter file encoding
//! - Transcode: External encoder invocation
//! - Engine: One full assembly run with scratch cleanup

pub mod engine;
pub mod error;
pub mod merger;
pub mod metadata;
pub mod transcode;

// Re-export commonly used types
pub use engine::{default_output_base_name, Assembler, AssemblyPlan, AssemblyRequest};
pub use error::{AssemblyError, ErrorKind};
pub use merger::{merge, MergeOptions, Merged, SilencePolicy, DEFAULT_SILENCE_MS, MAX_SILENCE_MS};
pub use metadata::{encode, sanitize, write_metadata, DEFAULT_ARTIST, DEFAULT_PODCAST_TITLE};
pub use transcode::{Transcoder, OUTPUT_EXTENSION};
