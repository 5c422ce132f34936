//! Audio decoding and the in-memory timeline.
//!
//! Decoders turn a segment's audio file into a [`Clip`] of signed 16-bit
//! interleaved PCM in the timeline's [`AudioFormat`]. The merger only ever
//! talks to the [`SegmentDecoder`] trait, so tests and callers can swap in
//! their own implementation.

pub mod ffmpeg;
pub mod timeline;
pub mod wav;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use ffmpeg::FfmpegDecoder;
pub use timeline::{Timeline, TimelineFull, TimelineMark, MAX_TIMELINE_MS};
pub use wav::WavDecoder;

/// PCM layout shared by every clip in one timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Frames per second
    pub sample_rate: u32,

    /// Interleaved channels per frame
    pub channels: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz / {} ch", self.sample_rate, self.channels)
    }
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Number of frames covering `ms` milliseconds (rounded to nearest).
    ///
    /// Saturates at `u64::MAX` instead of overflowing.
    pub fn frames_for_ms(&self, ms: u64) -> u64 {
        let frames = (ms as u128 * self.sample_rate as u128 + 500) / 1000;
        u64::try_from(frames).unwrap_or(u64::MAX)
    }

    /// Duration of `frames` frames in whole milliseconds (rounded to nearest)
    pub fn ms_for_frames(&self, frames: u64) -> u64 {
        let rate = self.sample_rate.max(1) as u128;
        let ms = (frames as u128 * 1000 + rate / 2) / rate;
        u64::try_from(ms).unwrap_or(u64::MAX)
    }

    /// Interleaved sample count for `frames` frames, saturating at `usize::MAX`
    pub fn samples_for_frames(&self, frames: u64) -> usize {
        frames
            .checked_mul(self.channels as u64)
            .and_then(|samples| usize::try_from(samples).ok())
            .unwrap_or(usize::MAX)
    }
}

/// One decoded segment
#[derive(Debug, Clone)]
pub struct Clip {
    pub format: AudioFormat,
    pub samples: Vec<i16>,
}

impl Clip {
    pub fn new(format: AudioFormat, samples: Vec<i16>) -> Self {
        Self { format, samples }
    }

    pub fn frames(&self) -> u64 {
        (self.samples.len() / self.format.channels.max(1) as usize) as u64
    }

    /// Decoded duration, the only duration used for chapter timing
    pub fn duration_ms(&self) -> u64 {
        self.format.ms_for_frames(self.frames())
    }
}

/// Why a single segment could not be loaded
#[derive(Debug, Error)]
pub enum SegmentLoadError {
    #[error("Audio file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Unsupported audio encoding: {0}")]
    Unsupported(String),

    #[error("Failed to decode audio: {0}")]
    Corrupt(String),

    #[error("Audio format mismatch: expected {expected}, found {found}")]
    FormatMismatch {
        expected: AudioFormat,
        found: AudioFormat,
    },

    #[error("Decoded audio is shorter than one millisecond")]
    Empty,

    #[error("Decoder binary not found: {0}")]
    ToolMissing(String),

    #[error(transparent)]
    TooLong(#[from] TimelineFull),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for segment decoders
#[async_trait]
pub trait SegmentDecoder: Send + Sync {
    /// Human-readable decoder name
    fn name(&self) -> &str;

    /// Decode the file at `path` into a clip of exactly `format`
    async fn decode(&self, path: &Path, format: AudioFormat) -> Result<Clip, SegmentLoadError>;
}

/// Default decoder: WAV files natively, everything else through ffmpeg
pub struct AutoDecoder {
    wav: WavDecoder,
    ffmpeg: FfmpegDecoder,
}

impl AutoDecoder {
    pub fn new(ffmpeg_binary: impl Into<String>) -> Self {
        Self {
            wav: WavDecoder,
            ffmpeg: FfmpegDecoder::with_binary_path(ffmpeg_binary),
        }
    }
}

impl Default for AutoDecoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

#[async_trait]
impl SegmentDecoder for AutoDecoder {
    fn name(&self) -> &str {
        "auto"
    }

    async fn decode(&self, path: &Path, format: AudioFormat) -> Result<Clip, SegmentLoadError> {
        if !is_wav(path) {
            return self.ffmpeg.decode(path, format).await;
        }

        match self.wav.decode(path, format).await {
            // A WAV in another layout still decodes fine once resampled
            Err(SegmentLoadError::FormatMismatch { found, .. }) => {
                debug!(path = %path.display(), %found, "Resampling WAV through ffmpeg");
                self.ffmpeg.decode(path, format).await
            }
            Err(SegmentLoadError::Unsupported(reason)) => {
                debug!(path = %path.display(), %reason, "Decoding WAV through ffmpeg");
                self.ffmpeg.decode(path, format).await
            }
            other => other,
        }
    }
}
