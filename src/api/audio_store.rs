use crate::audio::AudioClip;
use crate::config::AuthToken;
use crate::error::StoreError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

/// Multipart field name the backend expects for clip uploads
const UPLOAD_FIELD: &str = "audio";
const UPLOAD_FILENAME: &str = "recording.wav";
const UPLOAD_MIME: &str = "audio/wav";

const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Hard request timeout so a stalled upload cannot leave the uploading guard
/// engaged indefinitely
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Result of a successful clip upload
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredClip {
    pub audio_url: String,
    pub filename: String,
    #[serde(default)]
    pub transcript: Option<String>,
}

/// Remote storage for finalized audio clips.
///
/// A trait so the room orchestration can be exercised against a stub
/// endpoint; production uses [`HttpClipStore`].
#[async_trait]
pub trait ClipStore: Send + Sync {
    /// Upload a finalized clip; returns its retrievable URL and filename.
    ///
    /// No retry is built in - the caller decides whether to try again.
    async fn upload(&self, clip: &AudioClip) -> Result<StoredClip, StoreError>;

    /// Remove a previously uploaded clip.
    async fn delete(&self, filename: &str) -> Result<(), StoreError>;

    /// Construct the retrieval URL for a stored filename. No network call.
    fn url_for(&self, filename: &str) -> String;
}

pub struct HttpClipStore {
    base_url: String,
    token: Option<AuthToken>,
    http: reqwest::Client,
}

impl HttpClipStore {
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

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    /// Ask the backend to transcribe a clip server-side.
    ///
    /// A fallback when no live transcript was captured; failures degrade to
    /// an empty transcript instead of erroring.
    pub async fn transcribe_remote(&self, clip: &AudioClip) -> String {
        let Ok(form) = clip_form(clip) else {
            return String::new();
        };

        let url = format!("{}/api/audio/transcribe", self.base_url);
        let result = self
            .authorized(self.http.post(&url).multipart(form))
            .send()
            .await;

        #[derive(Deserialize)]
        struct TranscribeBody {
            #[serde(default)]
            transcript: Option<String>,
        }

        match result {
            Ok(response) if response.status().is_success() => response
                .json::<TranscribeBody>()
                .await
                .ok()
                .and_then(|b| b.transcript)
                .unwrap_or_default(),
            Ok(response) => {
                warn!("Server-side transcription failed: {}", response.status());
                String::new()
            }
            Err(e) => {
                warn!("Server-side transcription failed: {}", e);
                String::new()
            }
        }
    }
}

fn clip_form(clip: &AudioClip) -> Result<Form, StoreError> {
    let wav_bytes = clip
        .to_wav_bytes()
        .map_err(|e| StoreError::UploadFailed(e.to_string()))?;

    let part = Part::bytes(wav_bytes)
        .file_name(UPLOAD_FILENAME)
        .mime_str(UPLOAD_MIME)
        .map_err(|e| StoreError::UploadFailed(e.to_string()))?;

    Ok(Form::new().part(UPLOAD_FIELD, part))
}

#[async_trait]
impl ClipStore for HttpClipStore {
    async fn upload(&self, clip: &AudioClip) -> Result<StoredClip, StoreError> {
        let form = clip_form(clip)?;
        let url = format!("{}/api/audio/upload", self.base_url);

        let response = self
            .authorized(self.http.post(&url).multipart(form))
            .send()
            .await
            .map_err(|e| StoreError::UploadFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::UploadFailed(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let stored: StoredClip = response
            .json()
            .await
            .map_err(|e| StoreError::UploadFailed(e.to_string()))?;

        info!("Clip uploaded: {}", stored.audio_url);
        Ok(stored)
    }

    async fn delete(&self, filename: &str) -> Result<(), StoreError> {
        let url = format!("{}/api/audio/file/{}", self.base_url, filename);
        let response = self
            .authorized(self.http.delete(&url))
            .send()
            .await
            .map_err(|e| StoreError::DeleteFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::DeleteFailed(format!(
                "unexpected status {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn url_for(&self, filename: &str) -> String {
        format!("{}/api/audio/file/{}", self.base_url, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_is_pure_construction() {
        let store = HttpClipStore::new("https://api.example.com/", None);
        assert_eq!(
            store.url_for("recording-42.wav"),
            "https://api.example.com/api/audio/file/recording-42.wav"
        );
    }

    #[test]
    fn stored_clip_parses_wire_shape() {
        let json = r#"{
            "audioUrl": "https://api.example.com/api/audio/file/x.wav",
            "filename": "x.wav"
        }"#;
        let stored: StoredClip = serde_json::from_str(json).unwrap();
        assert_eq!(stored.filename, "x.wav");
        assert!(stored.transcript.is_none());
    }

    #[test]
    fn clip_form_rejects_nothing_for_valid_clip() {
        let clip = AudioClip::new(vec![1, 2, 3, 4], 16000, 1);
        assert!(clip_form(&clip).is_ok());
    }
}
