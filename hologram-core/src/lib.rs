pub mod config;
pub mod controller;
pub mod cue;
pub mod display;
pub mod engine;
pub mod error;
pub mod loader;
pub mod media;
pub mod paths;
pub mod playback;
pub mod playlist;
pub mod sync;
pub mod time;
pub mod toggle;

pub use config::{
    DisplayConfig, HologramConfig, LoggingConfig, MediaConfig, PlaybackConfig,
};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use controller::{Command, LoadTicket, Phase, PlaylistController};
pub use cue::{Caption, Cue, CueTrack, DEFAULT_CAPTION_COLOR, DEFAULT_GROUP_KEY};
pub use display::{broadcast_caption, CaptionRegion, DisplaySurface};
pub use engine::{Engine, EngineEvent, EngineHandle, EngineOptions, PlayerEvent};
pub use error::{CoreError, Result};
pub use loader::{loader_for_root, FileLoader, HttpLoader, MemoryLoader, ResourceLoader};
pub use media::{ClockStream, MediaStream, StreamEvent};
pub use paths::{
    config_dir, config_path, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME,
};
pub use playback::PlaybackState;
pub use playlist::{MediaItem, MediaLayout, Playlist};
pub use sync::{DriftCorrection, SyncClock, DEFAULT_DRIFT_TOLERANCE};
pub use time::{duration_from_secs, format_time_readout, DurationExt};
pub use toggle::{PlaybackToggle, ToggleAction, ToggleLabel};
