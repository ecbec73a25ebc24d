use thiserror::Error;

/// Microphone capture faults.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone access denied")]
    PermissionDenied,

    #[error("no usable capture device")]
    DeviceUnavailable,

    #[error("capture stream error: {0}")]
    Stream(String),

    #[error("capture worker unavailable")]
    Worker,
}

/// Speech recognition engine faults.
///
/// An *unsupported* host is not an error: the engine factory returns `None`
/// and live transcription silently degrades to no transcript.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("recognition engine error: {0}")]
    Engine(String),

    #[error("recognition channel error: {0}")]
    Channel(String),
}

/// Remote clip storage faults.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to upload audio: {0}")]
    UploadFailed(String),

    #[error("failed to delete audio: {0}")]
    DeleteFailed(String),
}

/// Playback faults (fetching, parsing, or feeding the output device).
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to load audio: {0}")]
    Load(String),

    #[error("output device error: {0}")]
    Device(String),
}

/// REST backend faults, surfaced as user-visible messages.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to load session: {0}")]
    SessionLoadFailed(String),

    #[error("failed to join session: {0}")]
    JoinFailed(String),

    #[error("failed to load analysis: {0}")]
    AnalysisFailed(String),

    #[error("request failed: {0}")]
    RequestFailed(String),
}
