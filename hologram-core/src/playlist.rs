//! Playlist manifest parsing and per-item resource derivation.

use crate::error::{CoreError, Result};
use crate::loader::ResourceLoader;
use crate::time::duration_from_secs;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Where the companion resources of a video live, relative to the media root.
///
/// For `videos/intro.mp4` the defaults give `subtitles/intro.json` and
/// `audio/intro.mp3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLayout {
    /// Key holding the entry list when the manifest is an object
    pub manifest_key: String,
    pub caption_dir: String,
    pub caption_ext: String,
    pub audio_dir: String,
    pub audio_ext: String,
    /// Whether a secondary audio track is looked up at all
    pub secondary_audio: bool,
}

impl Default for MediaLayout {
    fn default() -> Self {
        Self {
            manifest_key: "videos".to_string(),
            caption_dir: "subtitles".to_string(),
            caption_ext: "json".to_string(),
            audio_dir: "audio".to_string(),
            audio_ext: "mp3".to_string(),
            secondary_audio: true,
        }
    }
}

/// One playlist entry with its derived companion resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub primary_uri: String,
    pub caption_uri: String,
    pub audio_uri: Option<String>,
    /// Length announced by the manifest, if any
    pub duration_hint: Option<Duration>,
}

impl MediaItem {
    /// Create an item, deriving caption and audio locations from the base
    /// name of `primary_uri`.
    pub fn new(primary_uri: impl Into<String>, layout: &MediaLayout) -> Self {
        let primary_uri = primary_uri.into();
        let base = base_name(&primary_uri);

        let caption_uri = join_path(
            &layout.caption_dir,
            &format!("{base}.{}", layout.caption_ext),
        );
        let audio_uri = layout
            .secondary_audio
            .then(|| join_path(&layout.audio_dir, &format!("{base}.{}", layout.audio_ext)));

        Self {
            primary_uri,
            caption_uri,
            audio_uri,
            duration_hint: None,
        }
    }

    #[must_use]
    pub const fn with_duration_hint(mut self, duration: Duration) -> Self {
        self.duration_hint = Some(duration);
        self
    }

    /// File name of the primary resource without directory or extension
    #[must_use]
    pub fn base_name(&self) -> &str {
        base_name(&self.primary_uri)
    }
}

/// Ordered, immutable list of media items
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    items: Vec<MediaItem>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestEntry {
    Uri(String),
    Detailed {
        uri: String,
        #[serde(default)]
        duration_secs: Option<f64>,
    },
}

impl Playlist {
    #[must_use]
    pub const fn new(items: Vec<MediaItem>) -> Self {
        Self { items }
    }

    /// Parse a JSON manifest.
    ///
    /// The manifest is either an array of entries or an object holding the
    /// array under `layout.manifest_key`. Entries are plain URI strings or
    /// `{ "uri": ..., "duration_secs": ... }` objects.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ManifestParse`] if the document has neither shape
    /// or an entry is malformed.
    pub fn parse_manifest(input: &str, layout: &MediaLayout) -> Result<Self> {
        let document: Value =
            serde_json::from_str(input).map_err(|e| CoreError::ManifestParse {
                reason: e.to_string(),
            })?;

        let entries = match document {
            Value::Array(entries) => Value::Array(entries),
            Value::Object(mut fields) => {
                fields
                    .remove(&layout.manifest_key)
                    .ok_or_else(|| CoreError::ManifestParse {
                        reason: format!("missing \"{}\" list", layout.manifest_key),
                    })?
            }
            other => {
                return Err(CoreError::ManifestParse {
                    reason: format!("expected an array or object, found {other}"),
                })
            }
        };

        let entries: Vec<ManifestEntry> =
            serde_json::from_value(entries).map_err(|e| CoreError::ManifestParse {
                reason: e.to_string(),
            })?;

        let items = entries
            .into_iter()
            .map(|entry| match entry {
                ManifestEntry::Uri(uri) => Ok(MediaItem::new(uri, layout)),
                ManifestEntry::Detailed { uri, duration_secs } => {
                    let item = MediaItem::new(uri, layout);
                    match duration_secs {
                        None => Ok(item),
                        Some(secs) => duration_from_secs(secs)
                            .map(|d| item.with_duration_hint(d))
                            .ok_or_else(|| CoreError::ManifestParse {
                                reason: format!("invalid duration {secs}"),
                            }),
                    }
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { items })
    }

    /// Fetch and parse the manifest.
    ///
    /// Failures are logged and produce an empty playlist, which the caller
    /// reports as [`CoreError::PlaylistEmpty`].
    pub async fn fetch(loader: &dyn ResourceLoader, manifest_uri: &str, layout: &MediaLayout) -> Self {
        let text = match loader.fetch_text(manifest_uri).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to fetch playlist manifest {}: {}", manifest_uri, e);
                return Self::default();
            }
        };

        match Self::parse_manifest(&text, layout) {
            Ok(playlist) => {
                info!(
                    "Loaded playlist manifest {} ({} items)",
                    manifest_uri,
                    playlist.len()
                );
                playlist
            }
            Err(e) => {
                warn!("Ignoring playlist manifest {}: {}", manifest_uri, e);
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    #[must_use]
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// File name without directory, query or extension
fn base_name(uri: &str) -> &str {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    }
}

fn join_path(dir: &str, file: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{dir}/{file}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("videos/intro.mp4"), "intro");
        assert_eq!(base_name("intro.mp4"), "intro");
        assert_eq!(base_name("https://cdn.example.com/a/b/clip.v2.webm?x=1"), "clip.v2");
        assert_eq!(base_name("videos/.hidden"), ".hidden");
        assert_eq!(base_name("videos/noext"), "noext");
    }

    #[test]
    fn test_media_item_derives_companions() {
        let item = MediaItem::new("videos/intro.mp4", &MediaLayout::default());
        assert_eq!(item.caption_uri, "subtitles/intro.json");
        assert_eq!(item.audio_uri.as_deref(), Some("audio/intro.mp3"));
        assert_eq!(item.base_name(), "intro");
        assert!(item.duration_hint.is_none());
    }

    #[test]
    fn test_media_item_without_secondary_audio() {
        let layout = MediaLayout {
            caption_dir: String::new(),
            secondary_audio: false,
            ..MediaLayout::default()
        };
        let item = MediaItem::new("videos/intro.mp4", &layout);
        assert_eq!(item.caption_uri, "intro.json");
        assert!(item.audio_uri.is_none());
    }

    #[test]
    fn test_parse_manifest_array() {
        let playlist = Playlist::parse_manifest(
            r#"["videos/a.mp4", "videos/b.mp4"]"#,
            &MediaLayout::default(),
        )
        .unwrap();
        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.get(1).unwrap().primary_uri, "videos/b.mp4");
        assert!(playlist.get(2).is_none());
    }

    #[test]
    fn test_parse_manifest_object_with_durations() {
        let input = r#"{
            "videos": [
                { "uri": "videos/a.mp4", "duration_secs": 12.5 },
                "videos/b.mp4"
            ]
        }"#;
        let playlist = Playlist::parse_manifest(input, &MediaLayout::default()).unwrap();
        assert_eq!(
            playlist.items()[0].duration_hint,
            Some(Duration::from_millis(12_500))
        );
        assert!(playlist.items()[1].duration_hint.is_none());
    }

    #[test]
    fn test_parse_manifest_empty_list() {
        let playlist = Playlist::parse_manifest("[]", &MediaLayout::default()).unwrap();
        assert!(playlist.is_empty());
    }

    #[test]
    fn test_parse_manifest_errors() {
        let layout = MediaLayout::default();
        for input in [
            "{",
            r#"{ "clips": [] }"#,
            r#""videos/a.mp4""#,
            r#"[{ "uri": "a.mp4", "duration_secs": -3 }]"#,
            "[1, 2]",
        ] {
            assert!(
                matches!(
                    Playlist::parse_manifest(input, &layout),
                    Err(CoreError::ManifestParse { .. })
                ),
                "expected manifest failure for {input}"
            );
        }
    }
}
