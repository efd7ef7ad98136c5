use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - please edit it and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Missing required config field: {field}")]
    ConfigMissingField { field: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Media errors
    #[error("Media resource not found: {uri}")]
    ResourceNotFound { uri: String },

    #[error("Failed to parse caption document: {reason}")]
    CaptionParse { reason: String },

    #[error("Failed to parse playlist manifest: {reason}")]
    ManifestParse { reason: String },

    #[error("Playback of {uri} could not start: {reason}")]
    PlaybackStartFailed { uri: String, reason: String },

    // Playlist state errors
    #[error("Playlist is empty, nothing to play")]
    PlaylistEmpty,

    #[error("Playlist index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Item {index} is already loading")]
    LoadInProgress { index: usize },

    #[error("Restart is only possible once the playlist has stopped (currently {phase})")]
    RestartRejected { phase: String },

    // Network errors
    #[error("Request for {uri} returned status {status}")]
    HttpStatus { uri: String, status: u16 },

    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Network request failed: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
