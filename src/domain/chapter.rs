//! Chapters and the result of an assembly run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A named time range within the final podcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Chapter title (the segment label)
    pub title: String,

    /// Offset of the first millisecond of this chapter
    pub start_ms: u64,

    /// Offset one past the last millisecond of this chapter
    pub end_ms: u64,
}

impl Chapter {
    pub fn new(title: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            title: title.into(),
            start_ms,
            end_ms,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// True if the chapter covers a non-empty range
    pub fn is_valid(&self) -> bool {
        self.end_ms > self.start_ms
    }
}

/// What a successful assembly hands back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyResult {
    /// The encoded, chaptered podcast file
    pub output_path: PathBuf,

    /// Chapters in playback order
    pub chapters: Vec<Chapter>,

    /// Length of the merged timeline
    pub total_duration_ms: u64,
}

/// Render an offset as `MM:SS`, or `H:MM:SS` from one hour on
pub fn format_timestamp(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Chapter list as it appears in the notification email
pub fn chapter_listing(chapters: &[Chapter]) -> String {
    chapters
        .iter()
        .map(|c| format!("- {} ({})\n", c.title, format_timestamp(c.start_ms)))
        .collect()
}
