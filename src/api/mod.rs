pub mod audio_store;
pub mod client;
pub mod types;

pub use audio_store::{ClipStore, HttpClipStore, StoredClip};
pub use client::ApiClient;
pub use types::{
    AnalysisParticipant, AnalysisReport, Bot, GenerateAnalysisRequest, NewSession, Session,
    SessionKind, SessionParticipant,
};
