//! Segments and the manifest that carries them.
//!
//! The speech-synthesis stage hands over an ordered list of segments,
//! one per synthesized clip, as a JSON or YAML manifest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One labeled speech clip to be merged into the podcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Display name of the source (becomes the chapter title)
    #[serde(alias = "source")]
    pub label: String,

    /// Path to the decoded audio clip
    #[serde(alias = "path", alias = "file")]
    pub audio_path: PathBuf,

    /// Duration reported by the producer of the clip.
    ///
    /// Advisory only. Absent, zero or negative values make the merger
    /// re-measure the clip.
    #[serde(default, alias = "duration_ms", skip_serializing_if = "Option::is_none")]
    pub declared_duration_ms: Option<i64>,
}

impl Segment {
    /// Create a segment without a declared duration
    pub fn new(label: impl Into<String>, audio_path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            audio_path: audio_path.into(),
            declared_duration_ms: None,
        }
    }

    /// Attach the producer's declared duration
    pub fn with_declared_duration(mut self, duration_ms: i64) -> Self {
        self.declared_duration_ms = Some(duration_ms);
        self
    }

    /// Declared duration if it is usable as a validation hint
    pub fn usable_declared_duration(&self) -> Option<u64> {
        match self.declared_duration_ms {
            Some(ms) if ms > 0 => Some(ms as u64),
            _ => None,
        }
    }
}

/// Manifest produced by the speech-synthesis stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentManifest {
    /// Optional podcast title override
    #[serde(default)]
    pub title: Option<String>,

    /// Ordered segments
    pub segments: Vec<Segment>,
}

/// Either a full manifest or a bare list of segments
#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestShape {
    Full(SegmentManifest),
    List(Vec<Segment>),
}

impl From<ManifestShape> for SegmentManifest {
    fn from(shape: ManifestShape) -> Self {
        match shape {
            ManifestShape::Full(manifest) => manifest,
            ManifestShape::List(segments) => SegmentManifest {
                title: None,
                segments,
            },
        }
    }
}

impl SegmentManifest {
    /// Load a manifest from disk.
    ///
    /// `.yaml`/`.yml` files are parsed as YAML, everything else as JSON.
    /// Relative audio paths are resolved against the manifest's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let mut manifest = if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;

        if let Some(base) = path.parent() {
            manifest.resolve_relative_to(base);
        }

        Ok(manifest)
    }

    /// Parse a manifest from JSON content
    pub fn from_json(content: &str) -> Result<Self> {
        let shape: ManifestShape =
            serde_json::from_str(content).context("Invalid manifest JSON")?;
        Ok(shape.into())
    }

    /// Parse a manifest from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        let shape: ManifestShape =
            serde_yaml::from_str(content).context("Invalid manifest YAML")?;
        Ok(shape.into())
    }

    /// Rewrite relative audio paths so they are relative to `base`
    pub fn resolve_relative_to(&mut self, base: &Path) {
        for segment in &mut self.segments {
            if segment.audio_path.is_relative() {
                segment.audio_path = base.join(&segment.audio_path);
            }
        }
    }
}
