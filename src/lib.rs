pub mod api;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod room;
pub mod transcribe;

pub use api::{ApiClient, ClipStore, HttpClipStore, StoredClip};
pub use audio::{
    AudioClip, AudioFrame, AudioOutput, CaptureBackend, CaptureConfig, CpalBackend, CpalOutput,
    Player, PlayerState, Recorder,
};
pub use config::{AuthToken, Config};
pub use error::{ApiError, CaptureError, PlaybackError, RecognitionError, StoreError};
pub use room::{
    Identity, Message, MessageKind, NatsRoomChannel, Participant, RoomChannel, RoomController,
    RoomEvent, RoomState, RoomSync, Roster,
};
pub use transcribe::{
    LiveTranscriber, NatsSpeechFactory, RecognitionEvent, RecognitionUnsupported, SpeechEngine,
    SpeechEngineFactory,
};
