use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session kind offered by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionKind {
    #[serde(rename = "group-discussion")]
    GroupDiscussion,
    #[serde(rename = "interview")]
    Interview,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::GroupDiscussion => write!(f, "group-discussion"),
            SessionKind::Interview => write!(f, "interview"),
        }
    }
}

/// Request body for session creation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<DateTime<Utc>>,
    pub duration: u32,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub topic: String,
    pub max_participants: u32,
    pub ai_participants: u32,
    pub real_participants: u32,
}

/// Reference to a registered user inside session documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserRef {
    /// Best display name available for this user
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Unknown User")
    }
}

/// A participant slot inside a session document.
///
/// The backend mixes registered users and automated personas in one list;
/// the shape is disambiguated here, once, at the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionParticipant {
    Registered {
        user: UserRef,
    },
    Automated {
        #[serde(rename = "userName")]
        user_name: String,
    },
}

/// Session document as returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub participants: Vec<SessionParticipant>,
    #[serde(default)]
    pub ai_participants: u32,
    #[serde(default)]
    pub real_participants: Option<u32>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub share_link: Option<String>,
    #[serde(default)]
    pub created_by: Option<UserRef>,
}

/// Automated persona attached to a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct BotsResponse {
    pub success: bool,
    #[serde(default)]
    pub bots: Vec<Bot>,
}

/// Generated performance analysis for a finished session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(rename = "_id")]
    pub id: String,
    pub session: AnalysisSession,
    pub participants: Vec<ParticipantReport>,
    pub overall: OverallAssessment,
    pub transcript: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSession {
    pub title: String,
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: SessionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantType {
    Human,
    Ai,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantReport {
    pub user_name: String,
    pub participant_type: ParticipantType,
    pub participation: Participation,
    pub feedback: Feedback,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participation {
    pub speaking_time: f64,
    pub contributions: u32,
    pub clarity: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub overall_score: f64,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallAssessment {
    pub engagement: f64,
    pub collaboration: f64,
    pub topic_relevance: f64,
    pub summary: String,
    pub key_points: Vec<String>,
}

/// Request body for on-demand analysis generation
#[derive(Debug, Clone, Serialize)]
pub struct GenerateAnalysisRequest {
    pub transcript: String,
    pub participants: Vec<AnalysisParticipant>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisParticipant {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParticipantType,
    pub user_id: Option<String>,
}

impl AnalysisParticipant {
    /// Build the analysis participant list from a session document.
    ///
    /// Unidentifiable entries are dropped rather than sent as placeholders.
    pub fn from_session(session: &Session) -> Vec<Self> {
        session
            .participants
            .iter()
            .filter_map(|p| match p {
                SessionParticipant::Registered { user } => Some(Self {
                    name: user.display_name().to_string(),
                    kind: ParticipantType::Human,
                    user_id: Some(user.id.clone()),
                }),
                SessionParticipant::Automated { user_name } => Some(Self {
                    name: user_name.clone(),
                    kind: ParticipantType::Ai,
                    user_id: None,
                }),
            })
            .filter(|p| !p.name.is_empty() && p.name != "Unknown User")
            .collect()
    }
}
