use crate::cue::{DEFAULT_CAPTION_COLOR, DEFAULT_GROUP_KEY};
use crate::error::{CoreError, Result};
use crate::playlist::MediaLayout;
use crate::time::duration_from_secs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HologramConfig {
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory or http(s) base URL every other location is relative to
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default = "default_manifest")]
    pub manifest: String,
    /// Key of the entry list when the manifest is a JSON object
    #[serde(default = "default_manifest_key")]
    pub manifest_key: String,
    #[serde(default = "default_caption_dir")]
    pub caption_dir: String,
    #[serde(default = "default_caption_ext")]
    pub caption_ext: String,
    /// Key of the cue list when a caption document is a JSON object
    #[serde(default = "default_caption_group_key")]
    pub caption_group_key: String,
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,
    #[serde(default = "default_audio_ext")]
    pub audio_ext: String,
    #[serde(default = "default_true")]
    pub secondary_audio: bool,
    /// Length assumed for videos whose manifest entry has none
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: Option<f64>,
    /// Short sound replayed whenever the video starts or resumes
    #[serde(default)]
    pub play_chime: Option<String>,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_manifest() -> String {
    "videos.json".to_string()
}

fn default_manifest_key() -> String {
    "videos".to_string()
}

fn default_caption_dir() -> String {
    "subtitles".to_string()
}

fn default_caption_ext() -> String {
    "json".to_string()
}

fn default_caption_group_key() -> String {
    DEFAULT_GROUP_KEY.to_string()
}

fn default_audio_dir() -> String {
    "audio".to_string()
}

fn default_audio_ext() -> String {
    "mp3".to_string()
}

const fn default_true() -> bool {
    true
}

#[allow(clippy::unnecessary_wraps)]
const fn default_duration_secs() -> Option<f64> {
    Some(30.0)
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            manifest: default_manifest(),
            manifest_key: default_manifest_key(),
            caption_dir: default_caption_dir(),
            caption_ext: default_caption_ext(),
            caption_group_key: default_caption_group_key(),
            audio_dir: default_audio_dir(),
            audio_ext: default_audio_ext(),
            secondary_audio: true,
            default_duration_secs: default_duration_secs(),
            play_chime: None,
        }
    }
}

impl MediaConfig {
    /// Resource layout used to derive per-item locations
    #[must_use]
    pub fn layout(&self) -> MediaLayout {
        MediaLayout {
            manifest_key: self.manifest_key.clone(),
            caption_dir: self.caption_dir.clone(),
            caption_ext: self.caption_ext.clone(),
            audio_dir: self.audio_dir.clone(),
            audio_ext: self.audio_ext.clone(),
            secondary_audio: self.secondary_audio,
        }
    }

    #[must_use]
    pub fn default_duration(&self) -> Option<Duration> {
        self.default_duration_secs.and_then(duration_from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Autoplay muted until the first user interaction
    #[serde(default = "default_true")]
    pub start_muted: bool,
    /// Wrap to the first video instead of stopping at the end
    #[serde(default)]
    pub loop_playlist: bool,
    #[serde(default = "default_drift_tolerance_ms")]
    pub drift_tolerance_ms: u64,
    /// How often stream positions are sampled
    #[serde(default = "default_time_update_ms")]
    pub time_update_ms: u64,
}

const fn default_drift_tolerance_ms() -> u64 {
    200
}

const fn default_time_update_ms() -> u64 {
    250
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            start_muted: true,
            loop_playlist: false,
            drift_tolerance_ms: default_drift_tolerance_ms(),
            time_update_ms: default_time_update_ms(),
        }
    }
}

impl PlaybackConfig {
    #[must_use]
    pub const fn drift_tolerance(&self) -> Duration {
        Duration::from_millis(self.drift_tolerance_ms)
    }

    #[must_use]
    pub const fn time_update_interval(&self) -> Duration {
        Duration::from_millis(self.time_update_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Caption color for cues that do not set one
    #[serde(default = "default_caption_color")]
    pub caption_color: String,
}

const fn default_frame_rate() -> u32 {
    60
}

fn default_caption_color() -> String {
    DEFAULT_CAPTION_COLOR.to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            caption_color: default_caption_color(),
        }
    }
}

impl DisplayConfig {
    /// Time between redraws
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a file in the cache directory
    #[serde(default)]
    pub enabled: bool,
}

impl HologramConfig {
    /// Get the config file path (~/.config/hologram/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template on
    /// first run, or an error if the file cannot be read, parsed or
    /// validated.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            // Write template config
            fs::write(&config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        Self::load_from(&config_path)
    }

    /// Load and validate a config file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate config text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.media.manifest.trim().is_empty() {
            return Err(CoreError::ConfigMissingField {
                field: "media.manifest".to_string(),
            });
        }
        if self.media.root.trim().is_empty() {
            return Err(CoreError::ConfigMissingField {
                field: "media.root".to_string(),
            });
        }
        if let Some(secs) = self.media.default_duration_secs {
            if duration_from_secs(secs).is_none() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("media.default_duration_secs must be a non-negative number, got {secs}"),
                });
            }
        }
        if self.playback.time_update_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "playback.time_update_ms must be greater than 0".to_string(),
            });
        }
        if self.display.frame_rate == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "display.frame_rate must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

const CONFIG_TEMPLATE: &str = r##"# Hologram Player Configuration
# ~/.config/hologram/config.toml

[media]
# Directory or http(s) base URL; all paths below are relative to it
root = "."
# JSON list of videos, or an object with the list under manifest_key
manifest = "videos.json"
manifest_key = "videos"
# Captions for videos/<name>.mp4 are read from <caption_dir>/<name>.<caption_ext>
caption_dir = "subtitles"
caption_ext = "json"
# Used when a caption document is an object of cue lists
caption_group_key = "top"
# Optional secondary audio track: <audio_dir>/<name>.<audio_ext>
audio_dir = "audio"
audio_ext = "mp3"
secondary_audio = true
# Length assumed for manifest entries without "duration_secs"
default_duration_secs = 30.0
# Sound played whenever the video starts or resumes
# play_chime = "beep.mp3"

[playback]
start_muted = true
loop_playlist = false
drift_tolerance_ms = 200
time_update_ms = 250

[display]
frame_rate = 60
caption_color = "white"

[logging]
# Also write logs to the cache directory
enabled = false
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_matches_defaults() {
        let config = HologramConfig::from_toml(CONFIG_TEMPLATE).unwrap();
        let defaults = HologramConfig::default();

        assert_eq!(config.media.layout(), defaults.media.layout());
        assert_eq!(config.media.manifest, defaults.media.manifest);
        assert_eq!(config.media.default_duration(), Some(Duration::from_secs(30)));
        assert!(config.media.play_chime.is_none());
        assert!(config.playback.start_muted);
        assert!(!config.playback.loop_playlist);
        assert_eq!(config.playback.drift_tolerance(), Duration::from_millis(200));
        assert_eq!(config.playback.time_update_interval(), Duration::from_millis(250));
        assert_eq!(config.display.frame_rate, 60);
        assert_eq!(config.display.caption_color, "white");
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = HologramConfig::from_toml("").unwrap();
        assert_eq!(config.media.root, ".");
        assert_eq!(config.media.layout(), MediaLayout::default());
    }

    #[test]
    fn test_partial_override() {
        let config = HologramConfig::from_toml(
            r#"
[media]
root = "https://cdn.example.com/show"
play_chime = "beep.mp3"
secondary_audio = false

[playback]
loop_playlist = true
"#,
        )
        .unwrap();
        assert_eq!(config.media.root, "https://cdn.example.com/show");
        assert_eq!(config.media.play_chime.as_deref(), Some("beep.mp3"));
        assert!(!config.media.layout().secondary_audio);
        assert!(config.playback.loop_playlist);
        assert_eq!(config.playback.drift_tolerance_ms, 200);
    }

    #[test]
    fn test_frame_interval() {
        let display = DisplayConfig {
            frame_rate: 50,
            ..DisplayConfig::default()
        };
        assert_eq!(display.frame_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            HologramConfig::from_toml("[display]\nframe_rate = 0"),
            Err(CoreError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            HologramConfig::from_toml("[playback]\ntime_update_ms = 0"),
            Err(CoreError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            HologramConfig::from_toml("[media]\nmanifest = \"\""),
            Err(CoreError::ConfigMissingField { field }) if field == "media.manifest"
        ));
        assert!(matches!(
            HologramConfig::from_toml("[media]\ndefault_duration_secs = -5.0"),
            Err(CoreError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            HologramConfig::from_toml("[media"),
            Err(CoreError::ConfigParseError(_))
        ));
    }
}
