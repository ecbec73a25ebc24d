use super::participant::Participant;
use super::sync::{Message, RoomSync};
use crate::api::ClipStore;
use crate::audio::{AudioClip, Recorder};
use crate::error::CaptureError;
use crate::transcribe::LiveTranscriber;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Composes the recorder, live transcriber, clip store and room sync into
/// the record→stop→upload→emit pipeline.
///
/// Two flags gate the pipeline: `uploading` blocks new captures while a send
/// is in flight, and `pending_upload` guarantees a finalized clip is uploaded
/// exactly once even when the flush is invoked repeatedly.
pub struct RoomController {
    recorder: Recorder,
    transcriber: LiveTranscriber,
    store: Arc<dyn ClipStore>,
    sync: RoomSync,
    uploading: bool,
    pending_upload: bool,
    pending: Option<(AudioClip, String)>,
    banner: Option<String>,
}

impl RoomController {
    pub fn new(
        recorder: Recorder,
        transcriber: LiveTranscriber,
        store: Arc<dyn ClipStore>,
        sync: RoomSync,
    ) -> Self {
        Self {
            recorder,
            transcriber,
            store,
            sync,
            uploading: false,
            pending_upload: false,
            pending: None,
            banner: None,
        }
    }

    /// Start a capture cycle.
    ///
    /// Ignored while a previous capture's upload is still in flight. A
    /// capture failure becomes a banner message; a transcription failure is
    /// only logged - recording proceeds without a live transcript.
    pub async fn start_recording(&mut self) -> Result<(), CaptureError> {
        if self.uploading {
            warn!("Upload in flight; ignoring record request");
            return Ok(());
        }

        self.banner = None;
        self.recorder.clear();
        self.pending_upload = false;
        self.pending = None;

        let frames = match self.recorder.start_tapped().await {
            Ok(frames) => frames,
            Err(e) => {
                self.banner = Some(e.to_string());
                return Err(e);
            }
        };

        if let Err(e) = self.transcriber.start_live(frames).await {
            warn!("Live transcription unavailable: {}", e);
        }

        Ok(())
    }

    /// Stop the capture, then upload and emit the audio message.
    ///
    /// The live transcript is captured synchronously before it is discarded.
    /// An empty capture uploads nothing.
    pub async fn stop_recording(&mut self) {
        let transcript = self.transcriber.stop_live().await;

        if let Some(clip) = self.recorder.stop().await {
            if clip.is_empty() {
                info!("Nothing captured; skipping upload");
            } else {
                self.pending = Some((clip, transcript));
                self.pending_upload = true;
            }
        }

        self.flush_upload().await;
    }

    /// Upload the pending clip and emit the audio message, exactly once.
    ///
    /// Safe to invoke repeatedly: the pending flag is cleared before any
    /// second call can reach the store, and the uploading flag rejects
    /// re-entry while the transfer is in flight.
    pub async fn flush_upload(&mut self) {
        if !self.pending_upload || self.uploading {
            return;
        }

        let Some((clip, transcript)) = self.pending.clone() else {
            self.pending_upload = false;
            return;
        };

        self.uploading = true;
        self.pending_upload = false;

        match self.store.upload(&clip).await {
            Ok(stored) => {
                if let Err(e) = self.sync.send_audio(&stored.audio_url, &transcript).await {
                    self.banner = Some(format!("Failed to send audio message: {e}"));
                } else {
                    info!("Audio message sent: {}", stored.audio_url);
                }
                self.pending = None;
                self.recorder.clear();
            }
            Err(e) => {
                // No automatic retry; the record control is usable again
                self.banner = Some(e.to_string());
                self.pending = None;
            }
        }

        self.uploading = false;
    }

    /// Emit a text message; returns whether the composer should be cleared.
    pub async fn send_text(&self, content: &str) -> Result<bool> {
        self.sync.send_text(content).await
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    /// Transcript accumulated so far in the active capture.
    pub fn live_transcript(&self) -> String {
        self.transcriber.current_transcript()
    }

    /// User-visible error from the last capture or send attempt.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.sync.messages()
    }

    /// Roster in display order: humans before personas.
    pub fn participants(&self) -> Vec<Participant> {
        self.sync.participants_sorted()
    }

    pub fn sync(&self) -> &RoomSync {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut RoomSync {
        &mut self.sync
    }
}
