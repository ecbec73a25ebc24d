use super::participant::Participant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// A text message payload on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPayload {
    /// Client-generated idempotency key; absent from older peers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_ai: Option<bool>,
}

/// An audio message payload on the wire: a retrievable URL plus the live
/// transcript captured while it was recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub audio_url: String,
    pub transcript: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_ai: Option<bool>,
}

/// Raw participant shape in a roster snapshot, as the server sends it.
///
/// Converted into the [`Participant`] union exactly once, here at the
/// boundary; downstream code never re-inspects shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireParticipant {
    #[serde(default)]
    pub socket_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub user_name: String,
    #[serde(default)]
    pub is_ai: Option<bool>,
}

impl WireParticipant {
    pub fn into_participant(self) -> Option<Participant> {
        if self.is_ai.unwrap_or(false) {
            let user_id = self
                .user_id
                .unwrap_or_else(|| format!("ai-{}", self.user_name));
            return Some(Participant::automated(user_id, self.user_name));
        }

        match (self.socket_id, self.user_id) {
            (Some(socket_id), Some(user_id)) => {
                Some(Participant::human(socket_id, user_id, self.user_name))
            }
            _ => {
                warn!("Dropping malformed participant entry: {}", self.user_name);
                None
            }
        }
    }
}

/// Events on the realtime room channel.
///
/// The tag values are the channel's event names: the client emits
/// `join-room`, `text-message` and `audio-message`; the server emits
/// `user-joined`, `user-left`, `room-participants` and echoes messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum RoomEvent {
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: String,
        user_id: String,
        user_name: String,
    },
    #[serde(rename_all = "camelCase")]
    UserJoined {
        socket_id: String,
        user_id: String,
        user_name: String,
    },
    #[serde(rename_all = "camelCase")]
    UserLeft { socket_id: String },
    RoomParticipants { participants: Vec<WireParticipant> },
    TextMessage(TextPayload),
    AudioMessage(AudioPayload),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_tags_match_channel_names() {
        let joined = RoomEvent::UserJoined {
            socket_id: "s1".into(),
            user_id: "u1".into(),
            user_name: "Alice".into(),
        };
        let json = serde_json::to_string(&joined).unwrap();
        assert!(json.contains("\"event\":\"user-joined\""));
        assert!(json.contains("\"socketId\":\"s1\""));

        let announce = RoomEvent::JoinRoom {
            room_id: "r1".into(),
            user_id: "u1".into(),
            user_name: "Alice".into(),
        };
        assert!(serde_json::to_string(&announce)
            .unwrap()
            .contains("\"event\":\"join-room\""));
    }

    #[test]
    fn message_payload_roundtrip() {
        let event = RoomEvent::TextMessage(TextPayload {
            message_id: Some(Uuid::new_v4()),
            room_id: "r1".into(),
            user_id: "u1".into(),
            user_name: "Alice".into(),
            content: "hello".into(),
            timestamp: Utc::now(),
            is_ai: None,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"text-message\""));
        // Absent flags stay off the wire entirely
        assert!(!json.contains("isAi"));

        let parsed: RoomEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn message_without_id_still_parses() {
        let json = r#"{
            "event": "text-message",
            "roomId": "r1",
            "userId": "ai-0",
            "userName": "Morgan",
            "content": "hi",
            "timestamp": "2026-08-04T10:00:00Z",
            "isAi": true
        }"#;

        let parsed: RoomEvent = serde_json::from_str(json).unwrap();
        let RoomEvent::TextMessage(payload) = parsed else {
            panic!("expected a text message");
        };
        assert!(payload.message_id.is_none());
        assert_eq!(payload.is_ai, Some(true));
    }

    #[test]
    fn wire_participant_converts_once_at_the_boundary() {
        let human = WireParticipant {
            socket_id: Some("s1".into()),
            user_id: Some("u1".into()),
            user_name: "Alice".into(),
            is_ai: None,
        };
        assert_eq!(
            human.into_participant(),
            Some(Participant::human("s1", "u1", "Alice"))
        );

        let bot = WireParticipant {
            socket_id: None,
            user_id: None,
            user_name: "Morgan".into(),
            is_ai: Some(true),
        };
        let participant = bot.into_participant().unwrap();
        assert!(participant.is_automated());
        assert_eq!(participant.key(), "ai-Morgan");

        // A human entry without identifiers cannot be placed in the roster
        let malformed = WireParticipant {
            socket_id: None,
            user_id: None,
            user_name: "ghost".into(),
            is_ai: None,
        };
        assert_eq!(malformed.into_participant(), None);
    }
}
