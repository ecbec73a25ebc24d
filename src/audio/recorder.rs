use super::backend::{AudioFrame, CaptureBackend};
use super::clip::AudioClip;
use crate::error::CaptureError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Accumulated capture state for one record→stop cycle
#[derive(Default)]
struct CaptureBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

/// Drives one microphone capture cycle at a time.
///
/// Owns the chunk buffer and the finalized clip for the duration of a single
/// record→stop cycle; starting a new cycle tears down any previous capture
/// first, so two captures never interleave samples.
pub struct Recorder {
    backend: Box<dyn CaptureBackend>,
    buffer: Arc<Mutex<CaptureBuffer>>,
    is_recording: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    drain_task: Option<JoinHandle<()>>,
    clip: Option<AudioClip>,
    last_error: Option<String>,
}

impl Recorder {
    pub fn new(backend: Box<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            buffer: Arc::new(Mutex::new(CaptureBuffer::default())),
            is_recording: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            drain_task: None,
            clip: None,
            last_error: None,
        }
    }

    /// Start capturing.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        self.start_tapped().await.map(|_| ())
    }

    /// Start capturing, returning a tap of the live frame stream.
    ///
    /// The tap is a best-effort copy for live consumers (transcription); a
    /// slow consumer drops frames without affecting the recording itself.
    pub async fn start_tapped(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        // Idempotent restart: any previous capture is torn down first
        self.teardown().await;
        self.last_error = None;

        {
            let mut buffer = self.buffer.lock().unwrap();
            *buffer = CaptureBuffer::default();
        }

        let mut frame_rx = match self.backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.is_recording.store(false, Ordering::SeqCst);
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let (tap_tx, tap_rx) = mpsc::channel(64);
        let buffer = Arc::clone(&self.buffer);
        let paused = Arc::clone(&self.paused);

        self.drain_task = Some(tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                if paused.load(Ordering::SeqCst) {
                    continue;
                }

                let _ = tap_tx.try_send(frame.clone());

                let mut buf = buffer.lock().unwrap();
                if buf.sample_rate == 0 {
                    buf.sample_rate = frame.sample_rate;
                    buf.channels = frame.channels;
                } else if buf.sample_rate != frame.sample_rate || buf.channels != frame.channels {
                    warn!(
                        "Frame format changed mid-capture ({}Hz/{}ch -> {}Hz/{}ch), dropping frame",
                        buf.sample_rate, buf.channels, frame.sample_rate, frame.channels
                    );
                    continue;
                }
                buf.samples.extend_from_slice(&frame.samples);
            }
        }));

        self.paused.store(false, Ordering::SeqCst);
        self.is_recording.store(true, Ordering::SeqCst);
        info!("Recording started ({})", self.backend.name());

        Ok(tap_rx)
    }

    /// Stop capturing and finalize the pending clip.
    ///
    /// No-op when already stopped (returns the last finalized clip, if any).
    /// The capture stream is released even when finalizing goes wrong; an
    /// empty clip is a valid result meaning nothing was captured.
    pub async fn stop(&mut self) -> Option<AudioClip> {
        if !self.is_recording.load(Ordering::SeqCst) {
            return self.clip.clone();
        }

        // A paused capture still gets its finalize path
        if self.paused.load(Ordering::SeqCst) {
            self.resume();
        }

        self.is_recording.store(false, Ordering::SeqCst);

        // Best-effort stream release; closing the stream ends the drain task
        if let Err(e) = self.backend.stop().await {
            error!("Failed to release capture stream: {}", e);
            self.last_error = Some(e.to_string());
        }

        if let Some(mut task) = self.drain_task.take() {
            if tokio::time::timeout(Duration::from_secs(1), &mut task)
                .await
                .is_err()
            {
                warn!("Capture drain task did not finish, aborting");
                task.abort();
            }
        }

        let clip = {
            let buf = self.buffer.lock().unwrap();
            AudioClip::new(
                buf.samples.clone(),
                if buf.sample_rate == 0 { 44100 } else { buf.sample_rate },
                if buf.channels == 0 { 1 } else { buf.channels },
            )
        };

        info!(
            "Recording stopped: {:.1}s captured ({} samples)",
            clip.duration_seconds(),
            clip.samples.len()
        );

        self.clip = Some(clip.clone());
        Some(clip)
    }

    /// Suspend frame accumulation without releasing the device.
    pub fn pause(&self) {
        if self.is_recording.load(Ordering::SeqCst) {
            self.paused.store(true, Ordering::SeqCst);
        }
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Discard the finalized clip and chunk buffer.
    ///
    /// Does not affect recording state.
    pub fn clear(&mut self) {
        self.clip = None;
        let mut buffer = self.buffer.lock().unwrap();
        *buffer = CaptureBuffer::default();
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    pub fn clip(&self) -> Option<&AudioClip> {
        self.clip.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    async fn teardown(&mut self) {
        if self.backend.is_capturing() {
            if let Err(e) = self.backend.stop().await {
                warn!("Failed to stop previous capture: {}", e);
            }
        }
        if let Some(task) = self.drain_task.take() {
            task.abort();
        }
        self.is_recording.store(false, Ordering::SeqCst);
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        // Force-stop: the backend's own teardown releases the device; here we
        // only make sure no drain task outlives the recorder
        if let Some(task) = self.drain_task.take() {
            task.abort();
        }
        self.is_recording.store(false, Ordering::SeqCst);
    }
}
