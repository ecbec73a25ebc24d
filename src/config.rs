use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub api: ApiConfig,
    pub channel: ChannelConfig,
    pub audio: AudioSettings,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST backend, without a trailing slash
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelConfig {
    /// NATS server URL carrying the realtime room channel
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Deserialize, Default)]
pub struct AuthConfig {
    /// Override for the token file location (default: user config dir)
    pub token_path: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Bearer token persisted in a local file, attached to authorized requests.
///
/// There is no ambient token state: the loaded value is passed explicitly into
/// each component that needs it.
#[derive(Debug, Clone)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Load the token from the configured file, if one exists.
    pub fn load(auth: &AuthConfig) -> Result<Option<Self>> {
        let path = Self::token_file(auth)?;
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read token file: {}", path.display()))?;
        let token = raw.trim();
        if token.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self(token.to_string())))
    }

    /// Persist the token for later sessions.
    pub fn save(&self, auth: &AuthConfig) -> Result<()> {
        let path = Self::token_file(auth)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create token dir: {}", parent.display()))?;
        }

        std::fs::write(&path, &self.0)
            .with_context(|| format!("Failed to write token file: {}", path.display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn token_file(auth: &AuthConfig) -> Result<PathBuf> {
        if let Some(path) = &auth.token_path {
            return Ok(PathBuf::from(path));
        }

        let base = dirs::config_dir().context("No user config directory available")?;
        Ok(base.join("parley").join("token"))
    }
}
