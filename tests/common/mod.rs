// Shared fakes for driving the room pipeline without devices or servers.
//
// Each fake fills one of the crate's injection seams: capture backend,
// speech engine, clip store, room channel.

#![allow(dead_code)]

use async_trait::async_trait;
use parley::api::{ClipStore, StoredClip};
use parley::audio::{AudioClip, AudioFrame, CaptureBackend};
use parley::error::{CaptureError, RecognitionError, StoreError};
use parley::room::{RoomChannel, RoomEvent};
use parley::transcribe::{RecognitionEvent, SpeechEngine, SpeechEngineFactory};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};

/// A capture backend that plays a scripted list of frames.
///
/// Frames are delivered as soon as capture starts; the frame channel stays
/// open until `stop` releases it, mirroring a real device stream.
pub struct ScriptedBackend {
    frames: Vec<AudioFrame>,
    tx: Option<mpsc::Sender<AudioFrame>>,
    capturing: bool,
    pub fail_with: Option<fn() -> CaptureError>,
}

impl ScriptedBackend {
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames,
            tx: None,
            capturing: false,
            fail_with: None,
        }
    }

    pub fn failing(error: fn() -> CaptureError) -> Self {
        Self {
            frames: Vec::new(),
            tx: None,
            capturing: false,
            fail_with: Some(error),
        }
    }
}

#[async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if let Some(make_error) = self.fail_with {
            return Err(make_error());
        }

        let (tx, rx) = mpsc::channel(self.frames.len() + 1);
        for frame in &self.frames {
            tx.send(frame.clone()).await.expect("scripted frame fits");
        }
        self.tx = Some(tx);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.tx = None;
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn frame(samples: Vec<i16>, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples,
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

pub fn clip(samples: Vec<i16>) -> AudioClip {
    AudioClip::new(samples, 16000, 1)
}

/// A speech engine that emits a scripted list of recognition events.
pub struct ScriptedEngine {
    events: Vec<RecognitionEvent>,
    tx: Option<mpsc::Sender<RecognitionEvent>>,
    error: Option<RecognitionError>,
    fail_start: bool,
}

impl ScriptedEngine {
    pub fn new(events: Vec<RecognitionEvent>) -> Self {
        Self {
            events,
            tx: None,
            error: None,
            fail_start: false,
        }
    }
}

#[async_trait]
impl SpeechEngine for ScriptedEngine {
    async fn start(
        &mut self,
        _frames: mpsc::Receiver<AudioFrame>,
    ) -> Result<mpsc::Receiver<RecognitionEvent>, RecognitionError> {
        if self.fail_start {
            return Err(RecognitionError::Engine("scripted failure".into()));
        }

        let (tx, rx) = mpsc::channel(self.events.len() + 1);
        for event in &self.events {
            tx.send(event.clone()).await.expect("scripted event fits");
        }
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) {
        self.tx = None;
    }

    fn take_error(&mut self) -> Option<RecognitionError> {
        self.error.take()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Factory handing out scripted engines; the shared script can be swapped
/// between cycles.
pub struct ScriptedEngineFactory {
    script: Mutex<Vec<RecognitionEvent>>,
    pub fail_start: AtomicBool,
    pub fail_after: Mutex<Option<RecognitionError>>,
}

impl ScriptedEngineFactory {
    pub fn new(script: Vec<RecognitionEvent>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            fail_start: AtomicBool::new(false),
            fail_after: Mutex::new(None),
        })
    }

    pub fn set_script(&self, script: Vec<RecognitionEvent>) {
        *self.script.lock().unwrap() = script;
    }
}

impl SpeechEngineFactory for ScriptedEngineFactory {
    fn create(&self) -> Option<Box<dyn SpeechEngine>> {
        let mut engine = ScriptedEngine::new(self.script.lock().unwrap().clone());
        engine.fail_start = self.fail_start.load(Ordering::SeqCst);
        engine.error = self.fail_after.lock().unwrap().take();
        Some(Box::new(engine))
    }
}

pub fn final_event(text: &str) -> RecognitionEvent {
    RecognitionEvent {
        text: text.to_string(),
        is_final: true,
    }
}

pub fn interim_event(text: &str) -> RecognitionEvent {
    RecognitionEvent {
        text: text.to_string(),
        is_final: false,
    }
}

/// A clip store that records uploads and hands back a fixed URL.
pub struct StubClipStore {
    pub audio_url: String,
    pub uploads: AtomicUsize,
    pub fail: AtomicBool,
}

impl StubClipStore {
    pub fn returning(audio_url: &str) -> Arc<Self> {
        Arc::new(Self {
            audio_url: audio_url.to_string(),
            uploads: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClipStore for StubClipStore {
    async fn upload(&self, _clip: &AudioClip) -> Result<StoredClip, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::UploadFailed("stub refused".into()));
        }

        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(StoredClip {
            audio_url: self.audio_url.clone(),
            filename: "recording.wav".to_string(),
            transcript: None,
        })
    }

    async fn delete(&self, _filename: &str) -> Result<(), StoreError> {
        Ok(())
    }

    fn url_for(&self, filename: &str) -> String {
        format!("stub://{filename}")
    }
}

/// An in-process room channel: publishes fan out to every subscriber
/// (including the publisher, like the real fabric) and are recorded for
/// assertions.
pub struct LoopbackChannel {
    bus: broadcast::Sender<RoomEvent>,
    pub published: Mutex<Vec<RoomEvent>>,
}

impl LoopbackChannel {
    pub fn new() -> Arc<Self> {
        let (bus, _) = broadcast::channel(256);
        Arc::new(Self {
            bus,
            published: Mutex::new(Vec::new()),
        })
    }

    pub fn published_events(&self) -> Vec<RoomEvent> {
        self.published.lock().unwrap().clone()
    }

    /// Inject an event as if the server had emitted it.
    pub fn emit(&self, event: RoomEvent) {
        let _ = self.bus.send(event);
    }
}

#[async_trait]
impl RoomChannel for LoopbackChannel {
    async fn publish(&self, event: &RoomEvent) -> anyhow::Result<()> {
        self.published.lock().unwrap().push(event.clone());
        let _ = self.bus.send(event.clone());
        Ok(())
    }

    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<RoomEvent>> {
        let mut bus_rx = self.bus.subscribe();
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            while let Ok(event) = bus_rx.recv().await {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

/// Park the current task long enough for spawned listeners to drain.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}
