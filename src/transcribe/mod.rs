//! Speech-to-text during and after capture
//!
//! The live path accumulates a transcript while recording; the one-shot path
//! replays a finalized clip through a fresh engine. Both depend on the
//! `SpeechEngineFactory` capability provider, so hosts without an engine
//! degrade silently instead of erroring.

pub mod engine;
pub mod live;
pub mod oneshot;
pub mod remote;

pub use engine::{RecognitionEvent, RecognitionUnsupported, SpeechEngine, SpeechEngineFactory};
pub use live::LiveTranscriber;
pub use oneshot::transcribe_clip;
pub use remote::{NatsSpeechEngine, NatsSpeechFactory};
