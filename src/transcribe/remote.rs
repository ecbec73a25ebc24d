use super::engine::{RecognitionEvent, SpeechEngine, SpeechEngineFactory};
use crate::audio::AudioFrame;
use crate::error::RecognitionError;
use async_trait::async_trait;
use base64::Engine;
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Audio frame published to the transcription service
#[derive(Debug, Serialize, Deserialize)]
pub struct SttAudioFrame {
    pub session_id: String,
    pub sequence: u32,
    /// Base64-encoded little-endian i16 PCM
    pub pcm: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// RFC3339 timestamp
    pub timestamp: String,
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Transcript result received from the transcription service
#[derive(Debug, Serialize, Deserialize)]
pub struct SttTranscript {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    pub confidence: Option<f32>,
}

fn audio_subject(session_id: &str) -> String {
    format!("stt.audio.session-{}", session_id)
}

/// Transcript results arrive on stt.text.partial and stt.text.final; we
/// subscribe to both and filter by session id in the payload
const TRANSCRIPT_SUBJECT: &str = "stt.text.>";

/// Speech engine backed by a remote transcription service over NATS.
///
/// Capture frames are published as base64 PCM; partial and final transcript
/// messages come back on the text subjects and are mapped to recognition
/// events.
pub struct NatsSpeechEngine {
    client: async_nats::Client,
    session_id: String,
    tasks: Vec<JoinHandle<()>>,
}

impl NatsSpeechEngine {
    pub fn new(client: async_nats::Client, session_id: String) -> Self {
        Self {
            client,
            session_id,
            tasks: Vec::new(),
        }
    }
}

#[async_trait]
impl SpeechEngine for NatsSpeechEngine {
    async fn start(
        &mut self,
        mut frames: mpsc::Receiver<AudioFrame>,
    ) -> Result<mpsc::Receiver<RecognitionEvent>, RecognitionError> {
        let mut subscriber = self
            .client
            .subscribe(TRANSCRIPT_SUBJECT)
            .await
            .map_err(|e| RecognitionError::Channel(e.to_string()))?;

        info!(
            "Recognition started for session {} (subscribed to {})",
            self.session_id, TRANSCRIPT_SUBJECT
        );

        let (event_tx, event_rx) = mpsc::channel(64);

        // Pump capture frames out to the transcription service
        let client = self.client.clone();
        let session_id = self.session_id.clone();
        let sequence = Arc::new(AtomicU32::new(0));
        let pump_sequence = Arc::clone(&sequence);

        self.tasks.push(tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                let pcm_bytes: Vec<u8> = frame
                    .samples
                    .iter()
                    .flat_map(|s| s.to_le_bytes())
                    .collect();

                let message = SttAudioFrame {
                    session_id: session_id.clone(),
                    sequence: pump_sequence.fetch_add(1, Ordering::SeqCst),
                    pcm: base64::engine::general_purpose::STANDARD.encode(&pcm_bytes),
                    sample_rate: frame.sample_rate,
                    channels: frame.channels,
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    final_frame: false,
                };

                let payload = match serde_json::to_vec(&message) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("Failed to encode audio frame: {}", e);
                        continue;
                    }
                };

                if let Err(e) = client.publish(audio_subject(&session_id), payload.into()).await {
                    warn!("Failed to publish audio frame: {}", e);
                }
            }

            // Frame stream ended: send the final marker so the service
            // flushes its last segment
            let marker = SttAudioFrame {
                session_id: session_id.clone(),
                sequence: pump_sequence.load(Ordering::SeqCst),
                pcm: String::new(),
                sample_rate: 0,
                channels: 0,
                timestamp: chrono::Utc::now().to_rfc3339(),
                final_frame: true,
            };
            if let Ok(payload) = serde_json::to_vec(&marker) {
                if let Err(e) = client.publish(audio_subject(&session_id), payload.into()).await {
                    warn!("Failed to publish final frame marker: {}", e);
                }
            }
        }));

        // Map transcript messages back to recognition events
        let session_id = self.session_id.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<SttTranscript>(&msg.payload) {
                    Ok(transcript) => {
                        if transcript.session_id != session_id {
                            continue;
                        }

                        let event = RecognitionEvent {
                            text: transcript.text,
                            is_final: !transcript.partial,
                        };
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse transcript message: {}", e);
                    }
                }
            }
        }));

        Ok(event_rx)
    }

    async fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    fn name(&self) -> &str {
        "nats-stt"
    }
}

/// Capability provider backed by a live NATS connection.
pub struct NatsSpeechFactory {
    client: async_nats::Client,
    session_id: String,
}

impl NatsSpeechFactory {
    pub fn new(client: async_nats::Client, session_id: String) -> Self {
        Self { client, session_id }
    }
}

impl SpeechEngineFactory for NatsSpeechFactory {
    fn create(&self) -> Option<Box<dyn SpeechEngine>> {
        Some(Box::new(NatsSpeechEngine::new(
            self.client.clone(),
            self.session_id.clone(),
        )))
    }
}
