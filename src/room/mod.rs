//! Room synchronization
//!
//! This module keeps one room visit's in-memory state - the ordered message
//! log and the de-duplicated participant roster - in sync with the realtime
//! channel, and composes the capture/transcribe/upload pipeline on top of it.

pub mod channel;
pub mod controller;
pub mod events;
pub mod participant;
pub mod roster;
pub mod sync;

pub use channel::{NatsRoomChannel, RoomChannel};
pub use controller::RoomController;
pub use events::{AudioPayload, RoomEvent, TextPayload, WireParticipant};
pub use participant::Participant;
pub use roster::Roster;
pub use sync::{Identity, Message, MessageKind, RoomPhase, RoomState, RoomSync, AUDIO_PLACEHOLDER};
