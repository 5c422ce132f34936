//! Native WAV decoding via hound.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use hound::{SampleFormat, WavReader};

use super::{AudioFormat, Clip, SegmentDecoder, SegmentLoadError};

/// Decoder for PCM WAV files already in the timeline's layout
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl WavDecoder {
    /// Read a WAV file synchronously
    pub fn read(path: &Path, format: AudioFormat) -> Result<Clip, SegmentLoadError> {
        let reader = WavReader::open(path).map_err(|e| map_hound_error(path, e))?;
        let spec = reader.spec();

        let found = AudioFormat::new(spec.sample_rate, spec.channels);
        if found != format {
            return Err(SegmentLoadError::FormatMismatch {
                expected: format,
                found,
            });
        }

        let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => reader
                .into_samples::<i16>()
                .collect::<Result<_, _>>()
                .map_err(|e| map_hound_error(path, e))?,
            (SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .map(|s| s.map(float_to_i16))
                .collect::<Result<_, _>>()
                .map_err(|e| map_hound_error(path, e))?,
            (sample_format, bits) => {
                return Err(SegmentLoadError::Unsupported(format!(
                    "{:?} {}-bit WAV",
                    sample_format, bits
                )));
            }
        };

        let clip = Clip::new(format, samples);
        if clip.duration_ms() == 0 {
            return Err(SegmentLoadError::Empty);
        }

        Ok(clip)
    }
}

#[async_trait]
impl SegmentDecoder for WavDecoder {
    fn name(&self) -> &str {
        "wav"
    }

    async fn decode(&self, path: &Path, format: AudioFormat) -> Result<Clip, SegmentLoadError> {
        Self::read(path, format)
    }
}

fn float_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

fn map_hound_error(path: &Path, err: hound::Error) -> SegmentLoadError {
    match err {
        hound::Error::IoError(e) if e.kind() == io::ErrorKind::NotFound => {
            SegmentLoadError::Missing(path.to_path_buf())
        }
        hound::Error::IoError(e) => SegmentLoadError::Io(e),
        hound::Error::Unsupported => {
            SegmentLoadError::Unsupported("WAV feature not supported".to_string())
        }
        other => SegmentLoadError::Corrupt(other.to_string()),
    }
}
