//! Domain types for podcast assembly.
//!
//! This module contains the core data structures:
//! - Segment: One labeled speech clip, as handed over by the synthesis stage
//! - Chapter: A named time range in the merged podcast
//! - AssemblyResult: The final file plus its chapters

pub mod chapter;
pub mod segment;

pub use chapter::{chapter_listing, format_timestamp, AssemblyResult, Chapter};
pub use segment::{Segment, SegmentManifest};
