use crate::api::Bot;
use serde::{Deserialize, Serialize};

/// A roster entry, disambiguated once at the wire boundary.
///
/// Humans are keyed by their user id; automated personas by their display
/// name (the backend may hand several placeholder entries the same persona
/// name while bots initialize).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Participant {
    Human {
        /// Realtime connection identifier, used for departure events
        connection_id: String,
        user_id: String,
        name: String,
    },
    Automated {
        user_id: String,
        name: String,
    },
}

impl Participant {
    pub fn human(
        connection_id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Participant::Human {
            connection_id: connection_id.into(),
            user_id: user_id.into(),
            name: name.into(),
        }
    }

    pub fn automated(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Participant::Automated {
            user_id: user_id.into(),
            name: name.into(),
        }
    }

    /// Generic persona used until the backend assigns real bot names
    pub fn generic_automated(index: u32) -> Self {
        Participant::Automated {
            user_id: format!("ai-{index}"),
            name: format!("AI Participant {}", index + 1),
        }
    }

    pub fn from_bot(bot: &Bot) -> Self {
        Participant::Automated {
            user_id: bot.id.clone(),
            name: bot.name.clone(),
        }
    }

    /// De-duplication key: user id for humans, `ai-<name>` for personas
    pub fn key(&self) -> String {
        match self {
            Participant::Human { user_id, .. } => user_id.clone(),
            Participant::Automated { name, .. } => format!("ai-{name}"),
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Participant::Human { user_id, .. } => user_id,
            Participant::Automated { user_id, .. } => user_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Participant::Human { name, .. } => name,
            Participant::Automated { name, .. } => name,
        }
    }

    pub fn is_automated(&self) -> bool {
        matches!(self, Participant::Automated { .. })
    }

    /// Trailing numeral of the display name, for persona ordering
    /// ("AI Participant 2" sorts after "AI Participant 1")
    pub fn trailing_number(&self) -> i64 {
        self.name()
            .split_whitespace()
            .last()
            .and_then(|token| token.parse().ok())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_keyed_by_user_id() {
        let p = Participant::human("conn-1", "user-1", "Alice");
        assert_eq!(p.key(), "user-1");
        assert!(!p.is_automated());
    }

    #[test]
    fn automated_keyed_by_name() {
        let p = Participant::automated("bot-7", "Morgan");
        assert_eq!(p.key(), "ai-Morgan");
        assert!(p.is_automated());
    }

    #[test]
    fn trailing_number_parses_or_defaults() {
        assert_eq!(
            Participant::automated("ai-1", "AI Participant 2").trailing_number(),
            2
        );
        assert_eq!(Participant::automated("bot-7", "Morgan").trailing_number(), 0);
        assert_eq!(Participant::human("c", "u", "Alice").trailing_number(), 0);
    }

    #[test]
    fn generic_personas_number_from_one() {
        let p = Participant::generic_automated(0);
        assert_eq!(p.name(), "AI Participant 1");
        assert_eq!(p.user_id(), "ai-0");
    }
}
