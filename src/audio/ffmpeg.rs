//! Decoding arbitrary audio through the ffmpeg binary.
//!
//! The clip is decoded, resampled and down/up-mixed by ffmpeg and read back
//! as raw little-endian 16-bit PCM from stdout.

use std::io;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{AudioFormat, Clip, SegmentDecoder, SegmentLoadError};

/// Decoder that shells out to ffmpeg
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    binary_path: String,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::with_binary_path("ffmpeg")
    }
}

impl FfmpegDecoder {
    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    pub fn binary_path(&self) -> &str {
        &self.binary_path
    }

    fn build_command(&self, path: &Path, format: AudioFormat) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-f", "s16le", "-acodec", "pcm_s16le", "-ac"])
            .arg(format.channels.to_string())
            .arg("-ar")
            .arg(format.sample_rate.to_string())
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl SegmentDecoder for FfmpegDecoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn decode(&self, path: &Path, format: AudioFormat) -> Result<Clip, SegmentLoadError> {
        if !path.exists() {
            return Err(SegmentLoadError::Missing(path.to_path_buf()));
        }

        let output = match self.build_command(path, format).output().await {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SegmentLoadError::ToolMissing(self.binary_path.clone()));
            }
            Err(e) => return Err(SegmentLoadError::Io(e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SegmentLoadError::Corrupt(stderr.trim().to_string()));
        }

        let clip = Clip::new(format, pcm_from_le_bytes(&output.stdout));
        if clip.duration_ms() == 0 {
            return Err(SegmentLoadError::Empty);
        }

        Ok(clip)
    }
}

/// Interpret raw s16le bytes; a trailing odd byte is dropped
fn pcm_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
