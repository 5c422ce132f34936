//! Append-only PCM timeline with a millisecond cursor.
//!
//! `position_ms` is the single source of truth for chapter boundaries.
//! The sample buffer is kept at exactly `frames_for_ms(position_ms)`
//! frames: each append is trimmed or zero-padded by the sub-millisecond
//! remainder, so rounding never accumulates into drift between the audio
//! and the chapter offsets.

use std::io::{Seek, Write};

use hound::{SampleFormat, WavSpec, WavWriter};
use thiserror::Error;

use super::{AudioFormat, Clip, SegmentLoadError};

/// Longest timeline one run may build (24 hours)
pub const MAX_TIMELINE_MS: u64 = 24 * 60 * 60 * 1000;

/// An append would have grown the timeline past [`MAX_TIMELINE_MS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Merged audio would reach {requested_ms} ms, limit is {} ms", MAX_TIMELINE_MS)]
pub struct TimelineFull {
    pub requested_ms: u64,
}

/// Merged audio being built by one assembly run
#[derive(Debug, Clone)]
pub struct Timeline {
    format: AudioFormat,
    samples: Vec<i16>,
    position_ms: u64,
}

/// Saved cursor for [`Timeline::rollback`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineMark {
    position_ms: u64,
    sample_len: usize,
}

impl Timeline {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            samples: Vec::new(),
            position_ms: 0,
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Total duration of everything appended so far
    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn frames(&self) -> u64 {
        (self.samples.len() / self.format.channels.max(1) as usize) as u64
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.position_ms == 0
    }

    /// Append `ms` milliseconds of silence
    pub fn append_silence(&mut self, ms: u64) -> Result<(), TimelineFull> {
        let target_ms = self.target_after(ms)?;
        self.fill_to(target_ms, &[]);
        Ok(())
    }

    /// Append a decoded clip and return how far the cursor moved
    pub fn append_clip(&mut self, clip: &Clip) -> Result<u64, SegmentLoadError> {
        if clip.format != self.format {
            return Err(SegmentLoadError::FormatMismatch {
                expected: self.format,
                found: clip.format,
            });
        }

        let duration_ms = clip.duration_ms();
        let target_ms = self.target_after(duration_ms)?;
        self.fill_to(target_ms, &clip.samples);
        Ok(duration_ms)
    }

    pub fn mark(&self) -> TimelineMark {
        TimelineMark {
            position_ms: self.position_ms,
            sample_len: self.samples.len(),
        }
    }

    /// Drop everything appended after `mark`
    pub fn rollback(&mut self, mark: TimelineMark) {
        self.samples.truncate(mark.sample_len);
        self.position_ms = mark.position_ms;
    }

    /// Cursor position after advancing by `ms`, if it stays within bounds
    fn target_after(&self, ms: u64) -> Result<u64, TimelineFull> {
        match self.position_ms.checked_add(ms) {
            Some(target_ms) if target_ms <= MAX_TIMELINE_MS => Ok(target_ms),
            Some(target_ms) => Err(TimelineFull {
                requested_ms: target_ms,
            }),
            None => Err(TimelineFull {
                requested_ms: u64::MAX,
            }),
        }
    }

    /// Extend the buffer with `source` (then zeros) up to `target_ms`
    fn fill_to(&mut self, target_ms: u64, source: &[i16]) {
        let target_len = self
            .format
            .samples_for_frames(self.format.frames_for_ms(target_ms));
        let needed = target_len.saturating_sub(self.samples.len());

        let take = needed.min(source.len());
        self.samples.extend_from_slice(&source[..take]);
        self.samples.resize(self.samples.len() + (needed - take), 0);
        self.position_ms = target_ms;
    }

    /// Serialize the timeline as a 16-bit PCM WAV
    pub fn write_wav<W: Write + Seek>(&self, writer: W) -> Result<(), hound::Error> {
        let spec = WavSpec {
            channels: self.format.channels,
            sample_rate: self.format.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut wav = WavWriter::new(writer, spec)?;
        for &sample in &self.samples {
            wav.write_sample(sample)?;
        }
        wav.finalize()
    }
}
