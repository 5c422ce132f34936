//! Configuration for chaptercast.
//!
//! Configuration sources (highest priority first):
//! 1. CLI flags (applied by the caller on top of the resolved config)
//! 2. Environment variables (CHAPTERCAST_FFMPEG, CHAPTERCAST_SILENCE_MS,
//!    CHAPTERCAST_OUTPUT_DIR, CHAPTERCAST_TITLE)
//! 3. Config file (.chaptercast/config.yaml)
//! 4. Defaults
//!
//! Config file discovery:
//! - An explicit `--config <path>` wins
//! - Otherwise searches current directory and parents for .chaptercast/config.yaml
//! - Otherwise falls back to <user config dir>/chaptercast/config.yaml
//! - Relative paths in the config file are relative to the project root
//!   (the parent of .chaptercast/)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::audio::AudioFormat;
use crate::core::merger::{MergeOptions, SilencePolicy, DEFAULT_SILENCE_MS, MAX_SILENCE_MS};
use crate::core::metadata::{DEFAULT_ARTIST, DEFAULT_PODCAST_TITLE};

pub const ENV_FFMPEG: &str = "CHAPTERCAST_FFMPEG";
pub const ENV_SILENCE_MS: &str = "CHAPTERCAST_SILENCE_MS";
pub const ENV_OUTPUT_DIR: &str = "CHAPTERCAST_OUTPUT_DIR";
pub const ENV_TITLE: &str = "CHAPTERCAST_TITLE";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub assembly: AssemblySection,
    #[serde(default)]
    pub podcast: PodcastSection,
    #[serde(default)]
    pub ffmpeg: FfmpegSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssemblySection {
    pub silence_ms: Option<u64>,
    pub silence_policy: Option<SilencePolicy>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodcastSection {
    pub title: Option<String>,
    pub artist: Option<String>,
    /// Output directory (relative to the project root)
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FfmpegSection {
    pub path: Option<String>,
    pub codec: Option<String>,
    pub bitrate: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Resolved configuration
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub silence_ms: u64,
    pub silence_policy: SilencePolicy,
    pub podcast_title: String,
    pub artist: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub ffmpeg_path: String,
    pub codec: String,
    pub bitrate: Option<String>,
    pub transcode_timeout_seconds: u64,
    pub output_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            silence_ms: DEFAULT_SILENCE_MS,
            silence_policy: SilencePolicy::Commit,
            podcast_title: DEFAULT_PODCAST_TITLE.to_string(),
            artist: DEFAULT_ARTIST.to_string(),
            sample_rate: 24_000,
            channels: 1,
            ffmpeg_path: "ffmpeg".to_string(),
            codec: "aac".to_string(),
            bitrate: None,
            transcode_timeout_seconds: 600,
            output_dir: PathBuf::from("podcasts"),
            config_file: None,
        }
    }
}

impl Config {
    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate, self.channels)
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            format: self.audio_format(),
            silence_ms: self.silence_ms,
            silence_policy: self.silence_policy,
        }
    }

    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_seconds)
    }

    /// Reject settings that can never produce a valid run
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            anyhow::bail!("sample_rate must be greater than zero");
        }
        if self.channels == 0 {
            anyhow::bail!("channels must be greater than zero");
        }
        if self.silence_ms > MAX_SILENCE_MS {
            anyhow::bail!(
                "silence_ms must be at most {} (one hour), got {}",
                MAX_SILENCE_MS,
                self.silence_ms
            );
        }
        if self.transcode_timeout_seconds == 0 {
            anyhow::bail!("ffmpeg timeout_seconds must be greater than zero");
        }
        if self.ffmpeg_path.trim().is_empty() {
            anyhow::bail!("ffmpeg path cannot be empty");
        }
        Ok(())
    }

    /// Overlay values from a parsed config file
    fn apply_file(&mut self, file: ConfigFile, base_dir: &Path) {
        let ConfigFile {
            assembly,
            podcast,
            ffmpeg,
            ..
        } = file;

        if let Some(v) = assembly.silence_ms {
            self.silence_ms = v;
        }
        if let Some(v) = assembly.silence_policy {
            self.silence_policy = v;
        }
        if let Some(v) = assembly.sample_rate {
            self.sample_rate = v;
        }
        if let Some(v) = assembly.channels {
            self.channels = v;
        }

        if let Some(v) = podcast.title {
            self.podcast_title = v;
        }
        if let Some(v) = podcast.artist {
            self.artist = v;
        }
        if let Some(ref v) = podcast.output_dir {
            self.output_dir = resolve_path(base_dir, v);
        }

        if let Some(v) = ffmpeg.path {
            self.ffmpeg_path = v;
        }
        if let Some(v) = ffmpeg.codec {
            self.codec = v;
        }
        if ffmpeg.bitrate.is_some() {
            self.bitrate = ffmpeg.bitrate;
        }
        if let Some(v) = ffmpeg.timeout_seconds {
            self.transcode_timeout_seconds = v;
        }
    }

    /// Overlay environment variables, looked up through `lookup`
    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_FFMPEG) {
            self.ffmpeg_path = v;
        }
        if let Some(v) = lookup(ENV_SILENCE_MS) {
            self.silence_ms = v
                .trim()
                .parse()
                .with_context(|| format!("{} is not a whole number: {}", ENV_SILENCE_MS, v))?;
        }
        if let Some(v) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_TITLE) {
            self.podcast_title = v;
        }
        Ok(())
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".chaptercast").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let user_config = dirs::config_dir()?.join("chaptercast").join("config.yaml");
    user_config.exists().then_some(user_config)
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Project root for a config file: the parent of `.chaptercast/`, or the
/// file's own directory for a config outside such a directory
fn base_dir_for(config_path: &Path) -> PathBuf {
    let parent = config_path.parent().unwrap_or(Path::new("."));
    if parent.file_name().map(|n| n == ".chaptercast").unwrap_or(false) {
        parent.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}

/// Load configuration from all sources
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config_file = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let mut config = Config::default();

    if let Some(ref path) = config_file {
        let file = load_config_file(path)?;
        config.apply_file(file, &base_dir_for(path));
        config.config_file = Some(path.clone());
    }

    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;

    Ok(config)
}
