//! Sequential segment merge with inter-segment silence.
//!
//! Walks the segments in order, inserts silence between them, appends
//! every clip that decodes, and records each clip's range on the timeline
//! as a chapter. Segments that fail to load are logged and skipped.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::audio::{AudioFormat, SegmentDecoder, SegmentLoadError, Timeline};
use crate::domain::{Chapter, Segment};

use super::error::AssemblyError;

/// Default silence between segments
pub const DEFAULT_SILENCE_MS: u64 = 750;

/// Declared and decoded durations further apart than this get a warning
pub const DECLARED_DURATION_TOLERANCE_MS: u64 = 250;

/// Longest accepted gap between segments (one hour)
pub const MAX_SILENCE_MS: u64 = 60 * 60 * 1000;

/// What happens to the gap before a segment that fails to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilencePolicy {
    /// Keep the gap; spacing stays rhythmic
    #[default]
    Commit,
    /// Remove the gap again
    Rollback,
}

/// Merge parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    pub format: AudioFormat,
    pub silence_ms: u64,
    pub silence_policy: SilencePolicy,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            silence_ms: DEFAULT_SILENCE_MS,
            silence_policy: SilencePolicy::Commit,
        }
    }
}

/// Output of a merge: the timeline plus one chapter per merged segment
#[derive(Debug, Clone)]
pub struct Merged {
    pub timeline: Timeline,
    pub chapters: Vec<Chapter>,
    /// Input segments that were skipped
    pub skipped: usize,
    /// External decoder binary that was missing for at least one segment
    pub missing_tool: Option<String>,
}

impl Merged {
    pub fn total_duration_ms(&self) -> u64 {
        self.timeline.position_ms()
    }
}

/// Per-segment outcome, decided explicitly by the merge loop
enum SegmentOutcome {
    Merged(Chapter),
    Skipped(SegmentLoadError),
}

/// Merge `segments` into one timeline.
///
/// Fails with [`AssemblyError::Empty`] if no segment could be merged.
/// Segments whose decoder tool is not installed are skipped like any other
/// load failure; the binary is reported in [`Merged::missing_tool`].
pub async fn merge(
    segments: &[Segment],
    options: &MergeOptions,
    decoder: &dyn SegmentDecoder,
) -> Result<Merged, AssemblyError> {
    info!(
        segments = segments.len(),
        silence_ms = options.silence_ms,
        decoder = decoder.name(),
        "Merging audio segments"
    );

    let mut timeline = Timeline::new(options.format);
    let mut chapters = Vec::with_capacity(segments.len());
    let mut skipped = 0;
    let mut missing_tool = None;

    for (i, segment) in segments.iter().enumerate() {
        let before_gap = timeline.mark();
        if i > 0 {
            timeline.append_silence(options.silence_ms)?;
        }

        match merge_one(&mut timeline, segment, decoder).await {
            SegmentOutcome::Merged(chapter) => {
                debug!(
                    title = %chapter.title,
                    start_ms = chapter.start_ms,
                    end_ms = chapter.end_ms,
                    "Appended segment"
                );
                chapters.push(chapter);
            }
            SegmentOutcome::Skipped(e) => {
                error!(
                    segment = %segment.label,
                    path = %segment.audio_path.display(),
                    decoder = decoder.name(),
                    error = %e,
                    "Failed to load segment, skipping"
                );
                if let SegmentLoadError::ToolMissing(ref binary) = e {
                    if missing_tool.is_none() {
                        missing_tool = Some(binary.clone());
                    }
                }
                skipped += 1;
                if options.silence_policy == SilencePolicy::Rollback {
                    timeline.rollback(before_gap);
                }
            }
        }
    }

    if chapters.is_empty() {
        error!(total = segments.len(), "No segment could be merged");
        return Err(AssemblyError::Empty {
            total: segments.len(),
            skipped,
        });
    }

    info!(
        chapters = chapters.len(),
        skipped,
        total_ms = timeline.position_ms(),
        "Merge complete"
    );

    Ok(Merged {
        timeline,
        chapters,
        skipped,
        missing_tool,
    })
}

async fn merge_one(
    timeline: &mut Timeline,
    segment: &Segment,
    decoder: &dyn SegmentDecoder,
) -> SegmentOutcome {
    let path = segment.audio_path.as_path();
    if !path.exists() {
        return SegmentOutcome::Skipped(SegmentLoadError::Missing(path.to_path_buf()));
    }

    let declared = segment.usable_declared_duration();
    if declared.is_none() {
        warn!(
            segment = %segment.label,
            declared = ?segment.declared_duration_ms,
            "No usable declared duration, measuring decoded audio"
        );
    }

    let clip = match decoder.decode(path, timeline.format()).await {
        Ok(clip) => clip,
        Err(e) => return SegmentOutcome::Skipped(e),
    };

    let start_ms = timeline.position_ms();
    let duration_ms = match timeline.append_clip(&clip) {
        Ok(ms) => ms,
        Err(e) => return SegmentOutcome::Skipped(e),
    };

    if let Some(declared_ms) = declared {
        if declared_ms.abs_diff(duration_ms) > DECLARED_DURATION_TOLERANCE_MS {
            warn!(
                segment = %segment.label,
                declared_ms,
                decoded_ms = duration_ms,
                "Declared duration disagrees with decoded audio, using decoded"
            );
        }
    }

    SegmentOutcome::Merged(Chapter::new(
        segment.label.clone(),
        start_ms,
        timeline.position_ms(),
    ))
}
