use super::engine::{SpeechEngine, SpeechEngineFactory};
use crate::audio::AudioFrame;
use crate::error::RecognitionError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Default)]
struct TranscriptState {
    finals: String,
    interim: String,
}

/// Accumulates a live transcript during an active recording.
///
/// Finalized segments only ever grow; the interim suffix is replaced on every
/// engine event, so the observable transcript never regresses past a
/// finalized segment.
pub struct LiveTranscriber {
    factory: Arc<dyn SpeechEngineFactory>,
    engine: Option<Box<dyn SpeechEngine>>,
    state: Arc<Mutex<TranscriptState>>,
    task: Option<JoinHandle<()>>,
}

impl LiveTranscriber {
    pub fn new(factory: Arc<dyn SpeechEngineFactory>) -> Self {
        Self {
            factory,
            engine: None,
            state: Arc::new(Mutex::new(TranscriptState::default())),
            task: None,
        }
    }

    /// Start live transcription over the given capture frame tap.
    ///
    /// When recognition is unsupported on this host this is a silent no-op.
    /// The accumulated transcript is reset so a new cycle starts fresh.
    pub async fn start_live(
        &mut self,
        frames: mpsc::Receiver<AudioFrame>,
    ) -> Result<(), RecognitionError> {
        self.shutdown_engine().await;

        let Some(mut engine) = self.factory.create() else {
            debug!("Continuous recognition unsupported on this host; transcript disabled");
            return Ok(());
        };

        {
            let mut state = self.state.lock().unwrap();
            *state = TranscriptState::default();
        }

        let events = engine.start(frames).await?;
        info!("Live transcription started ({})", engine.name());
        self.engine = Some(engine);

        let state = Arc::clone(&self.state);
        self.task = Some(tokio::spawn(async move {
            let mut events = events;
            while let Some(event) = events.recv().await {
                let mut st = state.lock().unwrap();
                if event.is_final {
                    st.finals.push_str(&event.text);
                    st.interim.clear();
                } else {
                    st.interim = event.text;
                }
            }
            // Channel closed: engine stopped or faulted; the transcript
            // simply stops updating
        }));

        Ok(())
    }

    /// The currently observable transcript: finalized text plus the interim
    /// suffix.
    pub fn current_transcript(&self) -> String {
        let st = self.state.lock().unwrap();
        let mut text = st.finals.clone();
        text.push_str(&st.interim);
        text
    }

    pub fn is_transcribing(&self) -> bool {
        self.engine.is_some()
    }

    /// Halt recognition and return the accumulated final transcript.
    ///
    /// Interim text is discarded. Idempotent: calling while inactive returns
    /// the last frozen final transcript.
    pub async fn stop_live(&mut self) -> String {
        self.shutdown_engine().await;

        let mut st = self.state.lock().unwrap();
        st.interim.clear();
        st.finals.clone()
    }

    async fn shutdown_engine(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.stop().await;
        }
        if let Some(mut task) = self.task.take() {
            // Engine stop closes the event channel; give the consumer a
            // moment to drain any final event before cutting it off
            if tokio::time::timeout(Duration::from_millis(500), &mut task)
                .await
                .is_err()
            {
                task.abort();
            }
        }
    }
}
