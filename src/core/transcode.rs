//! ffmpeg invocation for the final chaptered encode.
//!
//! Input 0 is the merged WAV, input 1 the FFMETADATA1 file. Metadata and
//! chapters come from input 1; audio is re-encoded into an M4A container.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::error::AssemblyError;

/// Extension of the final container
pub const OUTPUT_EXTENSION: &str = "m4a";

/// Runs the external encoder
#[derive(Debug, Clone)]
pub struct Transcoder {
    binary_path: String,
    codec: String,
    bitrate: Option<String>,
    timeout: Duration,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Transcoder {
    pub fn new(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            codec: "aac".to_string(),
            bitrate: None,
            timeout: Duration::from_secs(600),
        }
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    pub fn with_bitrate(mut self, bitrate: Option<String>) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary_path(&self) -> &str {
        &self.binary_path
    }

    /// Arguments for one encode; the output path is always last.
    ///
    /// Paths are passed through as-is, so non-UTF-8 directories survive.
    pub fn args(&self, merged_audio: &Path, metadata: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "warning".into(),
            "-i".into(),
            merged_audio.into(),
            "-i".into(),
            metadata.into(),
            "-map_metadata".into(),
            "1".into(),
            "-codec:a".into(),
            self.codec.as_str().into(),
        ];
        if let Some(ref bitrate) = self.bitrate {
            args.push("-b:a".into());
            args.push(bitrate.as_str().into());
        }
        args.push(output.into());
        args
    }

    /// Encode `merged_audio` with `metadata` into `output`.
    ///
    /// Overwrites `output`. On any failure after the process started, a
    /// partially written `output` is removed.
    pub async fn transcode(
        &self,
        merged_audio: &Path,
        metadata: &Path,
        output: &Path,
    ) -> Result<(), AssemblyError> {
        let args = self.args(merged_audio, metadata, output);
        debug!(binary = %self.binary_path, ?args, "Running transcode");

        let child = match Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                error!(binary = %self.binary_path, "Transcoder binary not found");
                return Err(AssemblyError::ToolMissing {
                    binary: self.binary_path.clone(),
                });
            }
            Err(e) => {
                return Err(AssemblyError::Transcode {
                    exit_code: -1,
                    stderr: format!("failed to start {}: {}", self.binary_path, e),
                });
            }
        };

        // Dropping the child on timeout kills it (kill_on_drop)
        let output_result = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result,
            Err(_) => {
                error!(timeout = ?self.timeout, "Transcode timed out, process killed");
                remove_partial_output(output);
                return Err(AssemblyError::TranscodeTimeout(self.timeout));
            }
        };

        let process_output = match output_result {
            Ok(process_output) => process_output,
            Err(e) => {
                remove_partial_output(output);
                return Err(AssemblyError::Transcode {
                    exit_code: -1,
                    stderr: format!("failed to wait for {}: {}", self.binary_path, e),
                });
            }
        };

        let stderr = String::from_utf8_lossy(&process_output.stderr)
            .trim()
            .to_string();

        if !process_output.status.success() {
            let exit_code = process_output.status.code().unwrap_or(-1);
            error!(exit_code, %stderr, "Transcode failed");
            remove_partial_output(output);
            return Err(AssemblyError::Transcode { exit_code, stderr });
        }

        if !stderr.is_empty() {
            warn!(%stderr, "Transcoder reported diagnostics");
        }

        info!(output = %output.display(), "Transcode complete");
        Ok(())
    }

    /// Check that the binary runs; returns the first line of its version banner
    pub async fn health_check(&self) -> Result<String, AssemblyError> {
        let output = match Command::new(&self.binary_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AssemblyError::ToolMissing {
                    binary: self.binary_path.clone(),
                });
            }
            Err(e) => {
                return Err(AssemblyError::Transcode {
                    exit_code: -1,
                    stderr: e.to_string(),
                });
            }
        };

        if !output.status.success() {
            return Err(AssemblyError::Transcode {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().to_string())
    }
}

fn remove_partial_output(output: &Path) {
    if output.exists() {
        match std::fs::remove_file(output) {
            Ok(()) => debug!(path = %output.display(), "Removed partial output"),
            Err(e) => warn!(path = %output.display(), error = %e, "Could not remove partial output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_order() {
        let transcoder = Transcoder::new("ffmpeg");
        let args = transcoder.args(
            Path::new("/s/concat.wav"),
            Path::new("/s/metadata.txt"),
            Path::new("/out/digest.m4a"),
        );

        assert_eq!(
            args,
            vec![
                "-y",
                "-hide_banner",
                "-loglevel",
                "warning",
                "-i",
                "/s/concat.wav",
                "-i",
                "/s/metadata.txt",
                "-map_metadata",
                "1",
                "-codec:a",
                "aac",
                "/out/digest.m4a",
            ]
        );
    }

    #[test]
    fn test_bitrate_goes_before_output() {
        let transcoder = Transcoder::new("ffmpeg").with_bitrate(Some("128k".to_string()));
        let args = transcoder.args(Path::new("a"), Path::new("m"), Path::new("o.m4a"));

        let n = args.len();
        assert_eq!(&args[n - 3..], &["-b:a", "128k", "o.m4a"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_paths_are_passed_unchanged() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let output = Path::new(OsStr::from_bytes(b"/out\xff/digest.m4a"));
        let merged = Path::new(OsStr::from_bytes(b"/scratch\xfe/concat.wav"));
        let args = Transcoder::new("ffmpeg").args(merged, Path::new("/s/m.txt"), output);

        assert_eq!(args[5], merged.as_os_str());
        assert_eq!(args.last().unwrap(), output.as_os_str());
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let transcoder = Transcoder::new("/nonexistent/bin/ffmpeg");

        let err = transcoder.health_check().await.unwrap_err();
        assert!(matches!(err, AssemblyError::ToolMissing { .. }));

        let err = transcoder
            .transcode(Path::new("a.wav"), Path::new("m.txt"), Path::new("o.m4a"))
            .await
            .unwrap_err();
        assert!(matches!(err, AssemblyError::ToolMissing { .. }));
    }
}
