use super::channel::RoomChannel;
use super::events::{AudioPayload, RoomEvent, TextPayload};
use super::participant::Participant;
use super::roster::Roster;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

/// Placeholder transcript for audio messages that arrived without one
pub const AUDIO_PLACEHOLDER: &str = "[Audio Message]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Audio,
}

/// One chat message. Immutable once appended; the message list only grows.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
    pub audio_url: Option<String>,
    pub transcript: Option<String>,
}

/// In-memory state of one room visit: the ordered message log and the
/// participant roster. Rebuilt per visit, discarded on leaving.
#[derive(Debug, Default)]
pub struct RoomState {
    pub messages: Vec<Message>,
    pub roster: Roster,
    /// Idempotency keys of messages already appended this visit
    seen: HashSet<Uuid>,
}

impl RoomState {
    /// Apply one incoming event, in arrival order.
    ///
    /// Messages are appended as delivered (no reordering); an event whose
    /// idempotency key was already appended is dropped, which shields the log
    /// from channel redelivery after a reconnect.
    pub fn apply_event(&mut self, event: RoomEvent) {
        match event {
            // Client-to-server announce; the server answers with
            // user-joined / room-participants, so there is nothing to do here
            RoomEvent::JoinRoom { .. } => {}

            RoomEvent::UserJoined {
                socket_id,
                user_id,
                user_name,
            } => {
                self.roster
                    .user_joined(Participant::human(socket_id, user_id, user_name));
            }

            RoomEvent::UserLeft { socket_id } => {
                self.roster.user_left(&socket_id);
            }

            RoomEvent::RoomParticipants { participants } => {
                let snapshot = participants
                    .into_iter()
                    .filter_map(|p| p.into_participant())
                    .collect();
                self.roster.apply_snapshot(snapshot);
            }

            RoomEvent::TextMessage(payload) => self.append_text(payload),

            RoomEvent::AudioMessage(payload) => self.append_audio(payload),
        }
    }

    fn append_text(&mut self, payload: TextPayload) {
        let Some(id) = self.claim_id(payload.message_id) else {
            return;
        };

        self.messages.push(Message {
            id,
            user_id: payload.user_id.clone(),
            user_name: payload.user_name.clone(),
            content: payload.content,
            timestamp: payload.timestamp,
            kind: MessageKind::Text,
            audio_url: None,
            transcript: None,
        });

        if payload.is_ai.unwrap_or(false) {
            self.roster
                .reconcile_automated_name(&payload.user_id, &payload.user_name);
        }
    }

    fn append_audio(&mut self, payload: AudioPayload) {
        let Some(id) = self.claim_id(payload.message_id) else {
            return;
        };

        let transcript = if payload.transcript.trim().is_empty() {
            AUDIO_PLACEHOLDER.to_string()
        } else {
            payload.transcript
        };

        self.messages.push(Message {
            id,
            user_id: payload.user_id.clone(),
            user_name: payload.user_name.clone(),
            content: transcript.clone(),
            timestamp: payload.timestamp,
            kind: MessageKind::Audio,
            audio_url: Some(payload.audio_url),
            transcript: Some(transcript),
        });

        if payload.is_ai.unwrap_or(false) {
            self.roster
                .reconcile_automated_name(&payload.user_id, &payload.user_name);
        }
    }

    /// Dedup gate: known ids are rejected, unknown ids are recorded.
    /// Messages without an id (older peers) always pass with a local id.
    fn claim_id(&mut self, wire_id: Option<Uuid>) -> Option<Uuid> {
        match wire_id {
            Some(id) => {
                if self.seen.insert(id) {
                    Some(id)
                } else {
                    None
                }
            }
            None => Some(Uuid::new_v4()),
        }
    }
}

/// Identity announced to the room on join
#[derive(Debug, Clone)]
pub struct Identity {
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Connecting,
    Joined,
    Left,
}

/// Keeps one room visit's state in sync with the realtime channel.
///
/// `Connecting → Joined → (receiving events)* → Left`. Incoming events are
/// applied in arrival order by a listener task; outgoing messages are
/// published with client timestamps and idempotency keys.
pub struct RoomSync {
    channel: Arc<dyn RoomChannel>,
    identity: Identity,
    state: Arc<Mutex<RoomState>>,
    listener: Option<JoinHandle<()>>,
    phase: RoomPhase,
}

impl RoomSync {
    pub fn new(channel: Arc<dyn RoomChannel>, identity: Identity) -> Self {
        Self {
            channel,
            identity,
            state: Arc::new(Mutex::new(RoomState::default())),
            listener: None,
            phase: RoomPhase::Connecting,
        }
    }

    /// Attach to the channel and announce identity.
    pub async fn join(&mut self) -> Result<()> {
        let mut events = self.channel.subscribe().await?;

        self.channel
            .publish(&RoomEvent::JoinRoom {
                room_id: self.identity.room_id.clone(),
                user_id: self.identity.user_id.clone(),
                user_name: self.identity.user_name.clone(),
            })
            .await?;

        let state = Arc::clone(&self.state);
        self.listener = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                state.lock().unwrap().apply_event(event);
            }
        }));

        self.phase = RoomPhase::Joined;
        info!(
            "Joined room {} as {}",
            self.identity.room_id, self.identity.user_name
        );
        Ok(())
    }

    /// Emit a text message.
    ///
    /// Blank or whitespace-only content is a no-op; returns whether anything
    /// was emitted so the caller knows to clear its composer.
    pub async fn send_text(&self, content: &str) -> Result<bool> {
        if content.trim().is_empty() {
            return Ok(false);
        }

        self.channel
            .publish(&RoomEvent::TextMessage(TextPayload {
                message_id: Some(Uuid::new_v4()),
                room_id: self.identity.room_id.clone(),
                user_id: self.identity.user_id.clone(),
                user_name: self.identity.user_name.clone(),
                content: content.to_string(),
                timestamp: Utc::now(),
                is_ai: None,
            }))
            .await?;

        Ok(true)
    }

    /// Emit an audio message carrying the playable URL and the transcript
    /// captured during live transcription.
    pub async fn send_audio(&self, audio_url: &str, transcript: &str) -> Result<()> {
        let transcript = if transcript.trim().is_empty() {
            AUDIO_PLACEHOLDER.to_string()
        } else {
            transcript.to_string()
        };

        self.channel
            .publish(&RoomEvent::AudioMessage(AudioPayload {
                message_id: Some(Uuid::new_v4()),
                room_id: self.identity.room_id.clone(),
                user_id: self.identity.user_id.clone(),
                user_name: self.identity.user_name.clone(),
                content: transcript.clone(),
                audio_url: audio_url.to_string(),
                transcript,
                timestamp: Utc::now(),
                is_ai: None,
            }))
            .await?;

        Ok(())
    }

    /// Seed the automated roster from the session's bot list (or generic
    /// placeholders until the backend has assigned persona names).
    pub fn seed_automated(&self, personas: Vec<Participant>) {
        self.state.lock().unwrap().roster.set_automated(personas);
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// Snapshot of the message log, in arrival order.
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().unwrap().messages.clone()
    }

    /// Snapshot of the roster in display order.
    pub fn participants_sorted(&self) -> Vec<Participant> {
        self.state.lock().unwrap().roster.sorted()
    }

    pub fn participant_count(&self) -> usize {
        self.state.lock().unwrap().roster.len()
    }

    /// Detach from the channel; the listener registered for this visit is
    /// torn down and the state is left to be discarded with the sync.
    pub fn leave(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.phase = RoomPhase::Left;
        info!("Left room {}", self.identity.room_id);
    }
}

impl Drop for RoomSync {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
