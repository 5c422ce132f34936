//! Merge Integration Tests
//!
//! Chapter boundaries, silence accounting and skip behavior of the merger.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chaptercast::audio::{
    AudioFormat, Clip, SegmentDecoder, SegmentLoadError, WavDecoder, MAX_TIMELINE_MS,
};
use chaptercast::core::{merge, AssemblyError, MergeOptions, SilencePolicy};
use chaptercast::domain::{Chapter, Segment};
use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempDir;

const FORMAT: AudioFormat = AudioFormat {
    sample_rate: 24_000,
    channels: 1,
};

/// Write a mono 16-bit WAV of exactly `ms` milliseconds
fn write_clip(dir: &Path, name: &str, ms: u64) -> PathBuf {
    let path = dir.join(name);
    let spec = WavSpec {
        channels: FORMAT.channels,
        sample_rate: FORMAT.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for i in 0..FORMAT.frames_for_ms(ms) {
        writer.write_sample(((i % 200) as i16) - 100).unwrap();
    }
    writer.finalize().unwrap();
    path
}

fn options(silence_ms: u64) -> MergeOptions {
    MergeOptions {
        format: FORMAT,
        silence_ms,
        silence_policy: SilencePolicy::Commit,
    }
}

/// Decoder that serves fixed durations by file name, without touching audio.
///
/// Unknown names fail as corrupt, or as a missing tool when `missing_tool`
/// is set.
struct FakeDecoder {
    durations: HashMap<String, u64>,
    missing_tool: bool,
}

impl FakeDecoder {
    fn new(durations: &[(&str, u64)]) -> Self {
        Self {
            durations: durations
                .iter()
                .map(|(name, ms)| (name.to_string(), *ms))
                .collect(),
            missing_tool: false,
        }
    }
}

#[async_trait]
impl SegmentDecoder for FakeDecoder {
    fn name(&self) -> &str {
        "fake"
    }

    async fn decode(&self, path: &Path, format: AudioFormat) -> Result<Clip, SegmentLoadError> {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        match self.durations.get(&name) {
            Some(&ms) => {
                let frames = format.frames_for_ms(ms);
                Ok(Clip::new(format, vec![1; format.samples_for_frames(frames)]))
            }
            None if self.missing_tool => Err(SegmentLoadError::ToolMissing("ffmpeg".to_string())),
            None => Err(SegmentLoadError::Corrupt(format!("cannot decode {}", name))),
        }
    }
}

/// Files must exist on disk for the merger to attempt decoding
fn touch(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, b"x").unwrap();
            path
        })
        .collect()
}

#[tokio::test]
async fn test_three_segments_scenario() {
    let temp = TempDir::new().unwrap();
    let segments = vec![
        Segment::new("Intro", write_clip(temp.path(), "a.wav", 5000)).with_declared_duration(5000),
        Segment::new("Bloomberg", write_clip(temp.path(), "b.wav", 3000)).with_declared_duration(3000),
        Segment::new("Outro", write_clip(temp.path(), "c.wav", 4000)).with_declared_duration(4000),
    ];

    let merged = merge(&segments, &options(750), &WavDecoder).await.unwrap();

    assert_eq!(
        merged.chapters,
        vec![
            Chapter::new("Intro", 0, 5000),
            Chapter::new("Bloomberg", 5750, 8750),
            Chapter::new("Outro", 9500, 13500),
        ]
    );
    assert_eq!(merged.total_duration_ms(), 13500);
    assert_eq!(merged.timeline.frames(), FORMAT.frames_for_ms(13500));
    assert_eq!(merged.skipped, 0);
}

#[tokio::test]
async fn test_decoded_duration_wins_over_declared() {
    let temp = TempDir::new().unwrap();
    let segments = vec![
        Segment::new("A", write_clip(temp.path(), "a.wav", 2000)).with_declared_duration(9999),
        Segment::new("B", write_clip(temp.path(), "b.wav", 1500)).with_declared_duration(0),
        Segment::new("C", write_clip(temp.path(), "c.wav", 1000)).with_declared_duration(-5),
    ];

    let merged = merge(&segments, &options(100), &WavDecoder).await.unwrap();

    let durations: Vec<u64> = merged.chapters.iter().map(|c| c.duration_ms()).collect();
    assert_eq!(durations, vec![2000, 1500, 1000]);
}

#[tokio::test]
async fn test_second_segment_fails_to_load() {
    let temp = TempDir::new().unwrap();
    let broken = temp.path().join("broken.wav");
    std::fs::write(&broken, b"not audio").unwrap();

    let segments = vec![
        Segment::new("Good", write_clip(temp.path(), "good.wav", 2500)),
        Segment::new("Broken", broken),
    ];

    let merged = merge(&segments, &options(750), &WavDecoder).await.unwrap();

    assert_eq!(merged.chapters, vec![Chapter::new("Good", 0, 2500)]);
    assert_eq!(merged.skipped, 1);
    // Gap before the failed segment stays committed
    assert_eq!(merged.total_duration_ms(), 3250);
}

#[tokio::test]
async fn test_gap_before_failed_segment_is_kept_by_default() {
    let temp = TempDir::new().unwrap();
    let paths = touch(temp.path(), &["a", "b", "c"]);
    let decoder = FakeDecoder::new(&[("a", 1000), ("c", 1000)]);

    let segments: Vec<Segment> = paths
        .iter()
        .zip(["A", "B", "C"])
        .map(|(p, l)| Segment::new(l, p))
        .collect();

    let merged = merge(&segments, &options(500), &decoder).await.unwrap();

    assert_eq!(
        merged.chapters,
        vec![Chapter::new("A", 0, 1000), Chapter::new("C", 2000, 3000)]
    );
}

#[tokio::test]
async fn test_rollback_policy_removes_orphaned_gap() {
    let temp = TempDir::new().unwrap();
    let paths = touch(temp.path(), &["a", "b", "c"]);
    let decoder = FakeDecoder::new(&[("a", 1000), ("c", 1000)]);

    let segments: Vec<Segment> = paths
        .iter()
        .zip(["A", "B", "C"])
        .map(|(p, l)| Segment::new(l, p))
        .collect();

    let merge_options = MergeOptions {
        silence_policy: SilencePolicy::Rollback,
        ..options(500)
    };
    let merged = merge(&segments, &merge_options, &decoder).await.unwrap();

    assert_eq!(
        merged.chapters,
        vec![Chapter::new("A", 0, 1000), Chapter::new("C", 1500, 2500)]
    );
    assert_eq!(merged.total_duration_ms(), 2500);
}

#[tokio::test]
async fn test_missing_file_is_skipped() {
    let temp = TempDir::new().unwrap();
    let segments = vec![
        Segment::new("Gone", temp.path().join("gone.wav")),
        Segment::new("Here", write_clip(temp.path(), "here.wav", 1000)),
    ];

    let merged = merge(&segments, &options(750), &WavDecoder).await.unwrap();

    // Silence precedes every segment after the first, loaded or not
    assert_eq!(merged.chapters, vec![Chapter::new("Here", 750, 1750)]);
}

#[tokio::test]
async fn test_all_segments_fail() {
    let temp = TempDir::new().unwrap();
    let segments = vec![
        Segment::new("A", temp.path().join("a.wav")),
        Segment::new("B", temp.path().join("b.wav")),
    ];

    let err = merge(&segments, &options(750), &WavDecoder).await.unwrap_err();
    assert!(matches!(
        err,
        AssemblyError::Empty {
            total: 2,
            skipped: 2
        }
    ));
}

#[tokio::test]
async fn test_empty_input() {
    let err = merge(&[], &options(750), &WavDecoder).await.unwrap_err();
    assert!(matches!(err, AssemblyError::Empty { total: 0, .. }));
}

#[tokio::test]
async fn test_missing_decoder_tool_skips_segment() {
    let temp = TempDir::new().unwrap();
    let paths = touch(temp.path(), &["a.wav", "b.mp3", "c.wav"]);
    let mut decoder = FakeDecoder::new(&[("a.wav", 1000), ("c.wav", 2000)]);
    decoder.missing_tool = true;

    let segments: Vec<Segment> = paths
        .iter()
        .zip(["A", "B", "C"])
        .map(|(p, l)| Segment::new(l, p))
        .collect();

    let merged = merge(&segments, &options(500), &decoder).await.unwrap();

    assert_eq!(
        merged.chapters,
        vec![Chapter::new("A", 0, 1000), Chapter::new("C", 2000, 4000)]
    );
    assert_eq!(merged.skipped, 1);
    assert_eq!(merged.missing_tool.as_deref(), Some("ffmpeg"));
}

#[tokio::test]
async fn test_missing_decoder_tool_everywhere_is_empty() {
    let temp = TempDir::new().unwrap();
    let paths = touch(temp.path(), &["a.mp3"]);
    let mut decoder = FakeDecoder::new(&[]);
    decoder.missing_tool = true;

    let err = merge(&[Segment::new("A", &paths[0])], &options(750), &decoder)
        .await
        .unwrap_err();
    assert!(matches!(err, AssemblyError::Empty { total: 1, skipped: 1 }));
}

#[tokio::test]
async fn test_oversized_silence_fails_without_panicking() {
    let temp = TempDir::new().unwrap();
    let paths = touch(temp.path(), &["a", "b"]);
    let decoder = FakeDecoder::new(&[("a", 1000), ("b", 1000)]);

    let segments: Vec<Segment> = paths.iter().map(|p| Segment::new("x", p)).collect();

    for silence_ms in [u64::MAX / 1000, u64::MAX, MAX_TIMELINE_MS] {
        let err = merge(&segments, &options(silence_ms), &decoder)
            .await
            .unwrap_err();
        assert!(matches!(err, AssemblyError::TimelineFull(_)));
    }
}

#[tokio::test]
async fn test_chapter_properties_hold_for_many_segments() {
    let temp = TempDir::new().unwrap();
    let names: Vec<String> = (0..12).map(|i| format!("seg{}", i)).collect();
    let name_refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    let paths = touch(temp.path(), &name_refs);

    // Every third segment fails to decode
    let durations: Vec<(&str, u64)> = name_refs
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 3 != 1)
        .map(|(i, n)| (*n, 700 + 37 * i as u64))
        .collect();
    let decoder = FakeDecoder::new(&durations);

    let segments: Vec<Segment> = paths
        .iter()
        .enumerate()
        .map(|(i, p)| Segment::new(format!("Segment {}", i), p))
        .collect();

    let silence_ms = 333;
    let merged = merge(&segments, &options(silence_ms), &decoder).await.unwrap();

    assert_eq!(merged.chapters.len(), durations.len());
    assert!(merged.chapters.len() <= segments.len());

    for (chapter, (_, ms)) in merged.chapters.iter().zip(&durations) {
        assert_eq!(chapter.duration_ms(), *ms);
        assert!(chapter.start_ms < chapter.end_ms);
        assert!(chapter.end_ms <= merged.total_duration_ms());
    }

    // Run it again: identical offsets
    let again = merge(&segments, &options(silence_ms), &decoder).await.unwrap();
    assert_eq!(again.chapters, merged.chapters);
}

#[tokio::test]
async fn test_consecutive_gap_is_exact_at_odd_sample_rates() {
    let temp = TempDir::new().unwrap();
    let paths = touch(temp.path(), &["a", "b", "c"]);
    let decoder = FakeDecoder::new(&[("a", 1234), ("b", 999), ("c", 1)]);

    let segments: Vec<Segment> = paths
        .iter()
        .map(|p| Segment::new("x", p))
        .collect();

    let merge_options = MergeOptions {
        format: AudioFormat::new(44_100, 2),
        silence_ms: 750,
        silence_policy: SilencePolicy::Commit,
    };
    let merged = merge(&segments, &merge_options, &decoder).await.unwrap();

    for pair in merged.chapters.windows(2) {
        assert_eq!(pair[1].start_ms - pair[0].end_ms, 750);
    }
    assert_eq!(
        merged.timeline.frames(),
        merge_options.format.frames_for_ms(merged.total_duration_ms())
    );
}
