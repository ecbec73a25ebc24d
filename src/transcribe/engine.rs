use crate::audio::AudioFrame;
use crate::error::RecognitionError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// One recognition result.
///
/// A final event carries a completed segment that is appended permanently to
/// the running transcript. A non-final event carries the cumulative text of
/// the in-progress segment and replaces any previous interim text.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionEvent {
    pub text: String,
    pub is_final: bool,
}

/// Continuous speech recognition engine.
///
/// Engines consume the capture frame stream and emit recognition events. On
/// an engine fault the event channel closes and the fault is retrievable via
/// `take_error`; live consumers simply stop receiving updates.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Start recognizing the given frame stream.
    async fn start(
        &mut self,
        frames: mpsc::Receiver<AudioFrame>,
    ) -> Result<mpsc::Receiver<RecognitionEvent>, RecognitionError>;

    /// Halt recognition and release engine resources.
    async fn stop(&mut self);

    /// Retrieve a fault that closed the event stream, if one occurred.
    fn take_error(&mut self) -> Option<RecognitionError> {
        None
    }

    fn name(&self) -> &str;
}

/// Capability provider for speech recognition.
///
/// `create` returning `None` means continuous recognition is unsupported on
/// this host. That is a capability gap, not an error: live transcription
/// silently degrades to an empty transcript.
pub trait SpeechEngineFactory: Send + Sync {
    fn create(&self) -> Option<Box<dyn SpeechEngine>>;
}

/// The unavailable variant of the capability provider.
pub struct RecognitionUnsupported;

impl SpeechEngineFactory for RecognitionUnsupported {
    fn create(&self) -> Option<Box<dyn SpeechEngine>> {
        None
    }
}
