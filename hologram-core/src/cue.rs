use crate::error::{CoreError, Result};
use crate::time::duration_from_secs;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Grouping key looked up when a caption document is an object rather than
/// a flat array.
pub const DEFAULT_GROUP_KEY: &str = "top";

/// Caption color used when a cue does not carry its own.
pub const DEFAULT_CAPTION_COLOR: &str = "white";

/// A single time-coded caption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    /// Position at which this cue becomes active
    pub time: Duration,
    pub text: String,
    /// Explicit color, `None` falls back to the track default
    pub color: Option<String>,
}

impl Cue {
    pub fn new(time: Duration, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
            color: None,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Resolved caption pushed to the display surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caption<'a> {
    pub text: &'a str,
    pub color: &'a str,
}

impl Caption<'_> {
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Cues of one media item, sorted by time.
///
/// The sorted order partitions the timeline into half-open intervals
/// `[cue[i].time, cue[i + 1].time)`, the last one open-ended.
#[derive(Debug, Clone)]
pub struct CueTrack {
    cues: Vec<Cue>,
    default_color: String,
}

/// Cue record as it appears in a caption document
#[derive(Debug, Deserialize)]
struct RawCue {
    time: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    color: Option<String>,
}

impl CueTrack {
    /// Build a track, sorting the cues by time.
    ///
    /// The sort is stable so cues sharing a timestamp keep their document
    /// order; the last of them wins during resolution.
    pub fn new(mut cues: Vec<Cue>, default_color: impl Into<String>) -> Self {
        cues.sort_by_key(|cue| cue.time);
        Self {
            cues,
            default_color: default_color.into(),
        }
    }

    /// A track that never shows anything
    pub fn empty(default_color: impl Into<String>) -> Self {
        Self::new(Vec::new(), default_color)
    }

    /// Parse a JSON caption document.
    ///
    /// Accepts either a flat array of `{ time, text, color? }` records or an
    /// object holding such an array under `group_key`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CaptionParse`] if the document is not valid JSON,
    /// has neither accepted shape, or contains a negative or non-finite time.
    pub fn parse(input: &str, group_key: &str, default_color: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(input).map_err(|e| CoreError::CaptionParse {
            reason: e.to_string(),
        })?;

        let records = match document {
            Value::Array(records) => Value::Array(records),
            Value::Object(mut groups) => {
                groups
                    .remove(group_key)
                    .ok_or_else(|| CoreError::CaptionParse {
                        reason: format!("missing \"{group_key}\" cue group"),
                    })?
            }
            other => {
                return Err(CoreError::CaptionParse {
                    reason: format!("expected an array or object, found {other}"),
                })
            }
        };

        let raw: Vec<RawCue> =
            serde_json::from_value(records).map_err(|e| CoreError::CaptionParse {
                reason: e.to_string(),
            })?;

        let cues = raw
            .into_iter()
            .map(|cue| {
                let time = duration_from_secs(cue.time).ok_or_else(|| CoreError::CaptionParse {
                    reason: format!("invalid cue time {}", cue.time),
                })?;
                Ok(Cue {
                    time,
                    text: cue.text,
                    color: cue.color,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(cues, default_color))
    }

    /// Index of the cue active at `position`
    #[must_use]
    pub fn active_index(&self, position: Duration) -> Option<usize> {
        // Number of cues starting at or before the position
        let started = self.cues.partition_point(|cue| cue.time <= position);
        started.checked_sub(1)
    }

    /// Cue active at `position`, if any
    #[must_use]
    pub fn active_cue(&self, position: Duration) -> Option<&Cue> {
        self.active_index(position).map(|i| &self.cues[i])
    }

    /// Resolve the caption to display at `position`.
    ///
    /// Before the first cue, or on an empty track, this is the blank caption
    /// in the default color.
    #[must_use]
    pub fn resolve(&self, position: Duration) -> Caption<'_> {
        self.active_cue(position).map_or_else(
            || self.blank(),
            |cue| Caption {
                text: &cue.text,
                color: cue.color.as_deref().unwrap_or(&self.default_color),
            },
        )
    }

    /// Resolve from raw seconds; negative or NaN positions give the blank caption.
    #[must_use]
    pub fn resolve_secs(&self, secs: f64) -> Caption<'_> {
        duration_from_secs(secs).map_or_else(|| self.blank(), |position| self.resolve(position))
    }

    fn blank(&self) -> Caption<'_> {
        Caption {
            text: "",
            color: &self.default_color,
        }
    }

    #[must_use]
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    #[must_use]
    pub fn default_color(&self) -> &str {
        &self.default_color
    }
}

impl Default for CueTrack {
    fn default() -> Self {
        Self::empty(DEFAULT_CAPTION_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track() -> CueTrack {
        CueTrack::new(
            vec![
                Cue::new(Duration::from_secs(0), "A"),
                Cue::new(Duration::from_secs(2), ""),
                Cue::new(Duration::from_secs(4), "B"),
            ],
            DEFAULT_CAPTION_COLOR,
        )
    }

    #[test]
    fn test_resolve_greatest_time_not_after_position() {
        let track = sample_track();
        assert_eq!(track.resolve(Duration::from_secs(1)).text, "A");
        assert_eq!(track.resolve(Duration::from_secs(2)).text, "");
        assert_eq!(track.resolve(Duration::from_secs(5)).text, "B");
    }

    #[test]
    fn test_resolve_before_first_cue_is_blank() {
        let track = sample_track();
        let caption = track.resolve_secs(-1.0);
        assert!(caption.is_blank());
        assert_eq!(caption.color, "white");

        let late_start = CueTrack::new(
            vec![Cue::new(Duration::from_secs(3), "late")],
            DEFAULT_CAPTION_COLOR,
        );
        assert!(late_start.resolve(Duration::from_secs(1)).is_blank());
    }

    #[test]
    fn test_resolve_inclusive_lower_bound() {
        let track = sample_track();
        assert_eq!(track.resolve(Duration::from_secs(4)).text, "B");
        assert_eq!(track.resolve(Duration::from_millis(3999)).text, "");
    }

    #[test]
    fn test_resolve_empty_track() {
        let track = CueTrack::default();
        assert!(track.is_empty());
        assert_eq!(
            track.resolve(Duration::from_secs(10)),
            Caption {
                text: "",
                color: "white"
            }
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let track = sample_track();
        let first = track.resolve(Duration::from_millis(4500));
        let second = track.resolve(Duration::from_millis(4500));
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_nan_is_blank() {
        let track = sample_track();
        assert!(track.resolve_secs(f64::NAN).is_blank());
        assert_eq!(track.resolve_secs(1.5).text, "A");
    }

    #[test]
    fn test_unsorted_cues_are_sorted() {
        let track = CueTrack::new(
            vec![
                Cue::new(Duration::from_secs(4), "B"),
                Cue::new(Duration::from_secs(0), "A"),
            ],
            DEFAULT_CAPTION_COLOR,
        );
        assert_eq!(track.cues()[0].text, "A");
        assert_eq!(track.resolve(Duration::from_secs(1)).text, "A");
        assert_eq!(track.resolve(Duration::from_secs(6)).text, "B");
    }

    #[test]
    fn test_tied_times_last_in_document_order_wins() {
        let track = CueTrack::new(
            vec![
                Cue::new(Duration::from_secs(1), "first"),
                Cue::new(Duration::from_secs(1), "second"),
            ],
            DEFAULT_CAPTION_COLOR,
        );
        assert_eq!(track.cues()[0].text, "first");
        assert_eq!(track.resolve(Duration::from_secs(1)).text, "second");
    }

    #[test]
    fn test_cue_color_overrides_default() {
        let track = CueTrack::new(
            vec![
                Cue::new(Duration::ZERO, "plain"),
                Cue::new(Duration::from_secs(2), "red").with_color("#ff0000"),
            ],
            "yellow",
        );
        assert_eq!(track.resolve(Duration::from_secs(1)).color, "yellow");
        assert_eq!(track.resolve(Duration::from_secs(3)).color, "#ff0000");
    }

    #[test]
    fn test_parse_flat_array() {
        let input = r#"[
            { "time": 4, "text": "Let's dive deeper!", "color": "cyan" },
            { "time": 0, "text": "Welcome to the Hologram Experience!" },
            { "time": 2, "text": "" }
        ]"#;
        let track = CueTrack::parse(input, DEFAULT_GROUP_KEY, DEFAULT_CAPTION_COLOR).unwrap();
        assert_eq!(track.len(), 3);
        assert_eq!(
            track.resolve(Duration::from_millis(500)).text,
            "Welcome to the Hologram Experience!"
        );
        let late = track.resolve(Duration::from_secs(9));
        assert_eq!(late.text, "Let's dive deeper!");
        assert_eq!(late.color, "cyan");
    }

    #[test]
    fn test_parse_grouped_document() {
        let input = r#"{
            "top": [
                { "time": 0, "text": "Welcome" },
                { "time": 2.5, "text": "Halfway" }
            ],
            "bottom": [
                { "time": 0, "text": "ignored" }
            ]
        }"#;
        let track = CueTrack::parse(input, "top", DEFAULT_CAPTION_COLOR).unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track.cues()[1].time, Duration::from_millis(2500));
    }

    #[test]
    fn test_parse_missing_group_key() {
        let input = r#"{ "bottom": [] }"#;
        let result = CueTrack::parse(input, "top", DEFAULT_CAPTION_COLOR);
        assert!(matches!(result, Err(CoreError::CaptionParse { .. })));
    }

    #[test]
    fn test_parse_rejects_negative_time() {
        let input = r#"[{ "time": -1, "text": "early" }]"#;
        let result = CueTrack::parse(input, DEFAULT_GROUP_KEY, DEFAULT_CAPTION_COLOR);
        assert!(matches!(result, Err(CoreError::CaptionParse { .. })));
    }

    #[test]
    fn test_parse_malformed_document() {
        for input in ["not json", "42", r#"[{ "text": "no time" }]"#] {
            let result = CueTrack::parse(input, DEFAULT_GROUP_KEY, DEFAULT_CAPTION_COLOR);
            assert!(
                matches!(result, Err(CoreError::CaptionParse { .. })),
                "expected parse failure for {input}"
            );
        }
    }
}
