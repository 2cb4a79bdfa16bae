//! Recorded clip container and 16-bit WAV encoding.
//!
//! A [`RecordedClip`] owns its audio as a self-deleting temp file
//! ([`tempfile::TempPath`]) so every exit path of a transcription cycle —
//! upload, discard, failure — releases the file automatically on drop.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;
use tempfile::TempPath;

use super::capture::CaptureError;

// ---------------------------------------------------------------------------
// RecordedClip
// ---------------------------------------------------------------------------

/// One finished microphone recording: a temp WAV file plus its length.
///
/// The file is deleted when the clip is dropped.
pub struct RecordedClip {
    path: TempPath,
    duration_secs: f64,
}

impl RecordedClip {
    pub fn new(path: TempPath, duration_secs: f64) -> Self {
        Self {
            path,
            duration_secs,
        }
    }

    /// Captured length in seconds, derived from the sample count.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Location of the WAV file (valid until the clip is dropped).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the complete WAV file into memory for upload.
    pub fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

impl std::fmt::Debug for RecordedClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordedClip")
            .field("path", &self.path.display().to_string())
            .field("duration_secs", &self.duration_secs)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// WAV encoding
// ---------------------------------------------------------------------------

/// Encode mono `f32` samples as a 16-bit PCM WAV temp file.
///
/// The samples are written at their native `sample_rate` — the transcription
/// service resamples server-side, so no local rate conversion is needed.
pub(crate) fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<RecordedClip, CaptureError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let file = tempfile::Builder::new()
        .prefix("voxscribe-")
        .suffix(".wav")
        .tempfile()?;
    let path = file.into_temp_path();

    let mut writer = WavWriter::create(&path, spec)?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * f32::from(i16::MAX)) as i16)?;
    }
    writer.finalize()?;

    let duration_secs = samples.len() as f64 / f64::from(sample_rate);
    Ok(RecordedClip::new(path, duration_secs))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
