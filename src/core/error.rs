//! Run-level assembly errors.
//!
//! Per-segment load failures never show up here on their own; the merger
//! recovers from them and only reports [`AssemblyError::Empty`] when no
//! segment survived.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::audio::TimelineFull;

/// Failures that abort an assembly run
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("No usable audio: {skipped} of {total} segments could not be loaded")]
    Empty { total: usize, skipped: usize },

    #[error("Failed to write chapter metadata: {0}")]
    MetadataEncode(#[source] std::io::Error),

    #[error("External tool not found: {binary} (is it installed and on PATH?)")]
    ToolMissing { binary: String },

    #[error("Transcode failed with exit code {exit_code}: {stderr}")]
    Transcode { exit_code: i32, stderr: String },

    #[error("Transcode timed out after {0:?}")]
    TranscodeTimeout(Duration),

    #[error(transparent)]
    TimelineFull(#[from] TimelineFull),

    #[error("Failed to write merged audio: {0}")]
    MergedAudio(#[from] hound::Error),

    #[error("Failed to create scratch file in {}: {source}", .dir.display())]
    Scratch {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to prepare output directory {}: {source}", .dir.display())]
    OutputDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification for the caller's retry/notify decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nothing to assemble
    NoInput,
    /// Local disk problem
    Io,
    /// Installation or configuration problem
    Environment,
    /// The external encoder ran and failed
    ToolFailure,
}

impl AssemblyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Empty { .. } => ErrorKind::NoInput,
            Self::ToolMissing { .. } | Self::TimelineFull(_) => ErrorKind::Environment,
            Self::Transcode { .. } | Self::TranscodeTimeout(_) => ErrorKind::ToolFailure,
            Self::MetadataEncode(_)
            | Self::MergedAudio(_)
            | Self::Scratch { .. }
            | Self::OutputDir { .. } => ErrorKind::Io,
        }
    }

    /// Whether running the same input again could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Io | ErrorKind::ToolFailure)
    }
}
