//! Assembly engine: merge, write scratch artifacts, encode.
//!
//! One call to [`Assembler::assemble`] owns its scratch directory for its
//! whole lifetime. The merged WAV and the metadata file are
//! [`NamedTempFile`]s, so they are deleted on every exit path; only the
//! final output survives.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::audio::{AutoDecoder, SegmentDecoder};
use crate::config::Config;
use crate::domain::{AssemblyResult, Chapter, Segment};

use super::error::AssemblyError;
use super::merger::{merge, MergeOptions, Merged};
use super::metadata::write_metadata;
use super::transcode::{Transcoder, OUTPUT_EXTENSION};

/// Input for one assembly run
#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    /// Ordered segments
    pub segments: Vec<Segment>,

    /// Directory receiving the final file (created if missing)
    pub output_dir: PathBuf,

    /// File name of the final output, without extension
    pub output_base_name: String,

    /// Podcast title override
    pub title: Option<String>,

    /// Private scratch directory; a temporary one is created when absent
    pub scratch_dir: Option<PathBuf>,
}

impl AssemblyRequest {
    pub fn new(
        segments: Vec<Segment>,
        output_dir: impl Into<PathBuf>,
        output_base_name: impl Into<String>,
    ) -> Self {
        Self {
            segments,
            output_dir: output_dir.into(),
            output_base_name: output_base_name.into(),
            title: None,
            scratch_dir: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.output_base_name, OUTPUT_EXTENSION))
    }
}

/// Chapter layout computed without encoding anything
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyPlan {
    pub chapters: Vec<Chapter>,
    pub total_duration_ms: u64,
    pub skipped: usize,
}

/// `daily_digest_<YYYY-MM-DD>`
pub fn default_output_base_name(date: NaiveDate) -> String {
    format!("daily_digest_{}", date.format("%Y-%m-%d"))
}

/// Where scratch files go for one run
struct Scratch {
    dir: PathBuf,
    // Removed after the files inside it
    _owned: Option<TempDir>,
}

impl Scratch {
    fn open(dir: Option<&Path>) -> Result<Self, AssemblyError> {
        match dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|source| AssemblyError::Scratch {
                    dir: dir.to_path_buf(),
                    source,
                })?;
                Ok(Self {
                    dir: dir.to_path_buf(),
                    _owned: None,
                })
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("chaptercast-")
                    .tempdir()
                    .map_err(|source| AssemblyError::Scratch {
                        dir: std::env::temp_dir(),
                        source,
                    })?;
                Ok(Self {
                    dir: temp.path().to_path_buf(),
                    _owned: Some(temp),
                })
            }
        }
    }

    fn file(&self, prefix: &str, suffix: &str) -> Result<NamedTempFile, AssemblyError> {
        tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(&self.dir)
            .map_err(|source| AssemblyError::Scratch {
                dir: self.dir.clone(),
                source,
            })
    }
}

/// Opens the writer the chapter metadata goes through
type MetadataSink = fn(&mut File) -> Box<dyn Write + '_>;

fn buffered(file: &mut File) -> Box<dyn Write + '_> {
    Box::new(BufWriter::new(file))
}

/// Podcast assembly engine
pub struct Assembler {
    merge_options: MergeOptions,
    transcoder: Transcoder,
    podcast_title: String,
    artist: String,
    decoder: Box<dyn SegmentDecoder>,
}

impl Assembler {
    /// Create an assembler using the default decoder
    pub fn new(config: &Config) -> Self {
        let decoder = AutoDecoder::new(config.ffmpeg_path.clone());
        Self::with_decoder(config, Box::new(decoder))
    }

    /// Create an assembler with a caller-supplied decoder
    pub fn with_decoder(config: &Config, decoder: Box<dyn SegmentDecoder>) -> Self {
        let transcoder = Transcoder::new(config.ffmpeg_path.clone())
            .with_codec(config.codec.clone())
            .with_bitrate(config.bitrate.clone())
            .with_timeout(config.transcode_timeout());

        Self {
            merge_options: config.merge_options(),
            transcoder,
            podcast_title: config.podcast_title.clone(),
            artist: config.artist.clone(),
            decoder,
        }
    }

    pub fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }

    pub fn merge_options(&self) -> &MergeOptions {
        &self.merge_options
    }

    /// Compute the chapter layout only.
    ///
    /// Segments that need a missing decoder tool are skipped, so the
    /// layout still shows what the remaining segments produce.
    pub async fn plan(&self, segments: &[Segment]) -> Result<AssemblyPlan, AssemblyError> {
        let merged = merge(segments, &self.merge_options, self.decoder.as_ref()).await?;
        Ok(AssemblyPlan {
            total_duration_ms: merged.total_duration_ms(),
            skipped: merged.skipped,
            chapters: merged.chapters,
        })
    }

    /// Run one full assembly
    #[instrument(
        skip(self, request),
        fields(run_id = %Uuid::new_v4(), segments = request.segments.len())
    )]
    pub async fn assemble(&self, request: &AssemblyRequest) -> Result<AssemblyResult, AssemblyError> {
        info!(output_dir = %request.output_dir.display(), "Starting podcast assembly");

        std::fs::create_dir_all(&request.output_dir).map_err(|source| {
            AssemblyError::OutputDir {
                dir: request.output_dir.clone(),
                source,
            }
        })?;

        let merged = merge(&request.segments, &self.merge_options, self.decoder.as_ref()).await?;

        // Segments dropped for lack of a decoder fail the run
        if let Some(binary) = merged.missing_tool.clone() {
            return Err(AssemblyError::ToolMissing { binary });
        }

        let scratch = Scratch::open(request.scratch_dir.as_deref())?;
        let title = request.title.as_deref().unwrap_or(&self.podcast_title);
        let output_path = request.output_path();

        self.encode(&scratch, &merged, title, &output_path, buffered).await?;

        info!(
            output = %output_path.display(),
            chapters = merged.chapters.len(),
            total_ms = merged.total_duration_ms(),
            "Podcast assembly finished"
        );

        Ok(AssemblyResult {
            output_path,
            total_duration_ms: merged.total_duration_ms(),
            chapters: merged.chapters,
        })
    }

    /// Write both scratch files and run the transcoder over them
    async fn encode(
        &self,
        scratch: &Scratch,
        merged: &Merged,
        title: &str,
        output_path: &Path,
        metadata_sink: MetadataSink,
    ) -> Result<(), AssemblyError> {
        let mut merged_file = scratch.file("concat_", ".wav")?;
        debug!(path = %merged_file.path().display(), "Writing merged audio");
        {
            let mut writer = BufWriter::new(merged_file.as_file_mut());
            merged.timeline.write_wav(&mut writer)?;
            writer.flush().map_err(hound::Error::IoError)?;
        }

        let mut metadata_file = scratch.file("metadata_", ".txt")?;
        write_metadata(
            metadata_sink(metadata_file.as_file_mut()),
            &merged.chapters,
            title,
            &self.artist,
        )?;

        self.transcoder
            .transcode(merged_file.path(), metadata_file.path(), output_path)
            .await?;

        for file in [merged_file, metadata_file] {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                warn!(path = %path.display(), error = %e, "Could not remove scratch file");
            }
        }
        Ok(())
    }
}
