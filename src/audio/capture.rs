//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] is the start/stop interface the pipeline drives.
//! [`MicRecorder`] is the production implementation: each recording runs on
//! its own thread that owns the cpal stream (streams are not `Send`),
//! downmixes to mono at the device's native rate, and hands the samples
//! back for WAV encoding when stopped.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

use super::clip::{encode_wav, RecordedClip};

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running the audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("capture already in progress")]
    AlreadyRecording,

    #[error("no capture in progress")]
    NotRecording,

    #[error("capture thread failed: {0}")]
    Worker(String),

    #[error("failed to encode WAV: {0}")]
    Encode(#[from] hound::Error),

    #[error("failed to write clip: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// AudioCapture trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe start/stop interface for microphone capture.
///
/// One recording may be in flight at a time; `start` while recording and
/// `stop` while idle are errors.
pub trait AudioCapture: Send + Sync {
    /// Begin capturing from the default input device.
    fn start(&self) -> Result<(), CaptureError>;

    /// Stop capturing and hand back the encoded clip.
    fn stop(&self) -> Result<RecordedClip, CaptureError>;
}

// Compile-time assertion: Box<dyn AudioCapture> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioCapture>) {}
};

// ---------------------------------------------------------------------------
// MicRecorder
// ---------------------------------------------------------------------------

/// Raw mono samples plus the rate they were captured at.
struct CapturedAudio {
    samples: Vec<f32>,
    sample_rate: u32,
}

struct Session {
    stop: Arc<AtomicBool>,
    worker: JoinHandle<Result<CapturedAudio, CaptureError>>,
}

/// Production microphone recorder using the system default input device.
///
/// # Example
///
/// ```rust,no_run
/// use voxscribe::audio::{AudioCapture, MicRecorder};
///
/// let recorder = MicRecorder::new();
/// recorder.start().unwrap();
/// // ... speak ...
/// let clip = recorder.stop().unwrap();
/// println!("captured {:.1} s", clip.duration_secs());
/// ```
pub struct MicRecorder {
    session: Mutex<Option<Session>>,
}

impl MicRecorder {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }
}

impl Default for MicRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCapture for MicRecorder {
    fn start(&self) -> Result<(), CaptureError> {
        let mut session = self.session.lock().unwrap();
        if session.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || capture_worker(stop_flag, ready_tx))
            .map_err(|e| CaptureError::Worker(e.to_string()))?;

        // The stream is built inside the worker (cpal streams are not
        // `Send`); wait for it to come up so start failures surface here.
        match ready_rx.recv() {
            Ok(Ok(())) => {
                *session = Some(Session { stop, worker });
                log::info!("Audio: recording started");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(CaptureError::Worker(
                    "capture thread exited before starting".into(),
                ))
            }
        }
    }

    fn stop(&self) -> Result<RecordedClip, CaptureError> {
        let session = self
            .session
            .lock()
            .unwrap()
            .take()
            .ok_or(CaptureError::NotRecording)?;

        session.stop.store(true, Ordering::Relaxed);
        let captured = session
            .worker
            .join()
            .map_err(|_| CaptureError::Worker("capture thread panicked".into()))??;

        log::info!(
            "Audio: recording stopped — {} samples at {} Hz",
            captured.samples.len(),
            captured.sample_rate
        );
        encode_wav(&captured.samples, captured.sample_rate)
    }
}

// ---------------------------------------------------------------------------
// Capture worker
// ---------------------------------------------------------------------------

/// Runs on the per-recording thread: owns the stream, polls the stop flag,
/// returns the accumulated mono samples.
fn capture_worker(
    stop: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<(), CaptureError>>,
) -> Result<CapturedAudio, CaptureError> {
    let samples: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));

    let (stream, sample_rate) = match open_stream(Arc::clone(&samples)) {
        Ok(ok) => ok,
        Err(e) => {
            // start() reports this error; the thread result is discarded.
            let _ = ready.send(Err(e));
            return Err(CaptureError::Worker("stream startup failed".into()));
        }
    };
    let _ = ready.send(Ok(()));

    while !stop.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(10));
    }

    // Stop the hardware stream before draining the buffer.
    drop(stream);

    let samples = std::mem::take(&mut *samples.lock().unwrap());
    Ok(CapturedAudio {
        samples,
        sample_rate,
    })
}

/// Open and start an input stream on the default device, feeding mono
/// samples into `sink`.
fn open_stream(sink: Arc<Mutex<Vec<f32>>>) -> Result<(cpal::Stream, u32), CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;
    let supported = device.default_input_config()?;

    let channels = supported.channels() as usize;
    let sample_rate = supported.sample_rate().0;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    log::debug!(
        "Audio: input stream {channels} ch @ {sample_rate} Hz ({sample_format})"
    );

    let err_fn = |err: cpal::StreamError| {
        log::error!("Audio: stream error: {err}");
    };

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                downmix_into(&mut sink.lock().unwrap(), data, channels);
            },
            err_fn,
            None,
        )?,
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let floats: Vec<f32> = data
                    .iter()
                    .map(|&s| f32::from(s) / f32::from(i16::MAX))
                    .collect();
                downmix_into(&mut sink.lock().unwrap(), &floats, channels);
            },
            err_fn,
            None,
        )?,
        other => return Err(CaptureError::UnsupportedFormat(other.to_string())),
    };

    stream.play()?;
    Ok((stream, sample_rate))
}

/// Append `data` to `sink`, averaging interleaved frames down to mono.
fn downmix_into(sink: &mut Vec<f32>, data: &[f32], channels: usize) {
    if channels <= 1 {
        sink.extend_from_slice(data);
    } else {
        sink.extend(
            data.chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }
}

// ---------------------------------------------------------------------------
// MockCapture  (test-only)
// ---------------------------------------------------------------------------

/// Scripted [`AudioCapture`] for pipeline tests — no device, no thread.
#[cfg(test)]
pub struct MockCapture {
    /// Error returned by the next `start` call, if any.
    start_error: Mutex<Option<CaptureError>>,
    /// Duration reported on every clip produced by `stop`.
    duration_secs: f64,
    recording: AtomicBool,
}

#[cfg(test)]
impl MockCapture {
    /// A capture whose clips report `duration_secs`.
    pub fn with_clip(duration_secs: f64) -> Self {
        Self {
            start_error: Mutex::new(None),
            duration_secs,
            recording: AtomicBool::new(false),
        }
    }

    /// A capture whose first `start` fails with [`CaptureError::NoDevice`].
    pub fn failing_start() -> Self {
        Self {
            start_error: Mutex::new(Some(CaptureError::NoDevice)),
            duration_secs: 0.0,
            recording: AtomicBool::new(false),
        }
    }
}

#[cfg(test)]
impl AudioCapture for MockCapture {
    fn start(&self) -> Result<(), CaptureError> {
        if let Some(e) = self.start_error.lock().unwrap().take() {
            return Err(e);
        }
        if self.recording.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::AlreadyRecording);
        }
        Ok(())
    }

    fn stop(&self) -> Result<RecordedClip, CaptureError> {
        if !self.recording.swap(false, Ordering::SeqCst) {
            return Err(CaptureError::NotRecording);
        }
        let mut file = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .expect("temp file");
        std::io::Write::write_all(&mut file, b"RIFFfake-wav-payload").expect("write");
        Ok(RecordedClip::new(file.into_temp_path(), self.duration_secs))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
