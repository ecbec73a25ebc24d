use super::types::{
    AnalysisParticipant, AnalysisReport, Bot, BotsResponse, GenerateAnalysisRequest, NewSession,
    Session,
};
use crate::config::AuthToken;
use crate::error::ApiError;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Backend error envelope ({"message": "..."})
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// REST client for the practice platform backend.
///
/// Holds an explicit base URL and bearer token; nothing here reads ambient
/// state.
pub struct ApiClient {
    base_url: String,
    token: Option<AuthToken>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<AuthToken>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    /// POST /api/sessions/create
    pub async fn create_session(&self, new_session: &NewSession) -> Result<Session, ApiError> {
        let url = format!("{}/api/sessions/create", self.base_url);
        let response = self
            .authorized(self.http.post(&url).json(new_session))
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        let session: Session = decode(response, ApiError::RequestFailed).await?;
        info!("Created session {} ({})", session.id, session.title);
        Ok(session)
    }

    /// GET /api/sessions/my-sessions
    pub async fn my_sessions(&self) -> Result<Vec<Session>, ApiError> {
        let url = format!("{}/api/sessions/my-sessions", self.base_url);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| ApiError::SessionLoadFailed(e.to_string()))?;

        decode(response, ApiError::SessionLoadFailed).await
    }

    /// GET /api/sessions/:id
    pub async fn get_session(&self, session_id: &str) -> Result<Session, ApiError> {
        let url = format!("{}/api/sessions/{}", self.base_url, session_id);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| ApiError::SessionLoadFailed(e.to_string()))?;

        decode(response, ApiError::SessionLoadFailed).await
    }

    /// GET /api/sessions/join/:shareLink - inspect a session before joining
    pub async fn session_by_link(&self, share_link: &str) -> Result<Session, ApiError> {
        let url = format!("{}/api/sessions/join/{}", self.base_url, share_link);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| ApiError::SessionLoadFailed(e.to_string()))?;

        decode(response, ApiError::SessionLoadFailed).await
    }

    /// POST /api/sessions/join/:shareLink
    pub async fn join_by_link(&self, share_link: &str) -> Result<(), ApiError> {
        let url = format!("{}/api/sessions/join/{}", self.base_url, share_link);
        let response = self
            .authorized(self.http.post(&url))
            .send()
            .await
            .map_err(|e| ApiError::JoinFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::JoinFailed(error_message(response).await));
        }
        Ok(())
    }

    /// POST /api/sessions/:id/end
    pub async fn end_session(&self, session_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/api/sessions/{}/end", self.base_url, session_id);
        let response = self
            .authorized(self.http.post(&url))
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::RequestFailed(error_message(response).await));
        }

        info!("Session {} ended", session_id);
        Ok(())
    }

    /// GET /api/ai-bots/bots/:sessionId
    ///
    /// The roster may not be initialized yet; that is reported as an empty
    /// list, and callers fall back to generic persona names.
    pub async fn list_bots(&self, session_id: &str) -> Result<Vec<Bot>, ApiError> {
        let url = format!("{}/api/ai-bots/bots/{}", self.base_url, session_id);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| ApiError::SessionLoadFailed(e.to_string()))?;

        let body: BotsResponse = decode(response, ApiError::SessionLoadFailed).await?;
        if !body.success {
            warn!("Bot roster not initialized for session {}", session_id);
            return Ok(Vec::new());
        }
        Ok(body.bots)
    }

    /// GET /api/analysis/:sessionId
    pub async fn get_analysis(&self, session_id: &str) -> Result<AnalysisReport, ApiError> {
        let url = format!("{}/api/analysis/{}", self.base_url, session_id);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| ApiError::AnalysisFailed(e.to_string()))?;

        decode(response, ApiError::AnalysisFailed).await
    }

    /// POST /api/analysis/generate/:sessionId
    pub async fn generate_analysis(
        &self,
        session_id: &str,
        request: &GenerateAnalysisRequest,
    ) -> Result<AnalysisReport, ApiError> {
        let url = format!("{}/api/analysis/generate/{}", self.base_url, session_id);
        let response = self
            .authorized(self.http.post(&url).json(request))
            .send()
            .await
            .map_err(|e| ApiError::AnalysisFailed(e.to_string()))?;

        decode(response, ApiError::AnalysisFailed).await
    }

    /// Fetch the analysis, generating it first when none exists yet.
    ///
    /// A missing report (404) triggers generation from the session's
    /// participant list and a placeholder transcript, then a normal fetch.
    pub async fn analysis_or_generate(
        &self,
        session_id: &str,
    ) -> Result<AnalysisReport, ApiError> {
        let url = format!("{}/api/analysis/{}", self.base_url, session_id);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| ApiError::AnalysisFailed(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            info!("No analysis for session {} yet, generating", session_id);

            let session = self.get_session(session_id).await?;
            let participants = AnalysisParticipant::from_session(&session);
            let transcript = format!(
                "Discussion about {} with {} participants.",
                session.topic,
                participants.len()
            );

            let request = GenerateAnalysisRequest {
                transcript,
                participants,
            };
            return self.generate_analysis(session_id, &request).await;
        }

        decode(response, ApiError::AnalysisFailed).await
    }
}

/// Decode a JSON body, mapping failure statuses to the given error kind with
/// the backend's own message when it sends one.
async fn decode<T: serde::de::DeserializeOwned>(
    response: Response,
    to_error: fn(String) -> ApiError,
) -> Result<T, ApiError> {
    if !response.status().is_success() {
        return Err(to_error(error_message(response).await));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| to_error(format!("invalid response body: {e}")))
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            message: Some(message),
        }) => message,
        _ => format!("unexpected status {status}"),
    }
}
