//! Media stream abstraction and a clock-driven implementation.

use crate::error::{CoreError, Result};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Lifecycle notifications a stream queues for the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Playback reached the end of the source
    Ended,
    /// Playback broke after it had started (decode error, lost source...)
    Failed(String),
}

/// A playable media element (the video, the secondary audio, the chime).
///
/// Implementations report asynchronous lifecycle changes by queueing
/// [`StreamEvent`]s, which the engine drains on every time-update tick.
pub trait MediaStream: Send {
    /// Replace the current source. Resets position and pending events.
    fn load(&mut self, uri: &str, duration_hint: Option<Duration>);

    /// Start or resume playback.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PlaybackStartFailed`] if the stream refuses to
    /// start.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn seek(&mut self, position: Duration);

    fn position(&self) -> Duration;

    /// Total length, once known
    fn duration(&self) -> Option<Duration>;

    fn is_playing(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    /// Next queued lifecycle event
    fn take_event(&mut self) -> Option<StreamEvent>;
}

/// Stream whose position follows the tokio clock.
///
/// Stands in for a decoder wherever only timing matters: the headless
/// player and tests (with a paused runtime the clock only moves on
/// `tokio::time::advance`). A source without a known length refuses to play.
#[derive(Debug, Default)]
pub struct ClockStream {
    source: Option<String>,
    duration: Option<Duration>,
    default_duration: Option<Duration>,
    /// Position at the last pause/seek
    offset: Duration,
    /// Set while playing
    resumed_at: Option<Instant>,
    muted: bool,
    events: VecDeque<StreamEvent>,
}

impl ClockStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Length used for sources loaded without a duration hint
    #[must_use]
    pub const fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = Some(duration);
        self
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    #[must_use]
    pub const fn is_muted(&self) -> bool {
        self.muted
    }

    fn clamp(&self, position: Duration) -> Duration {
        self.duration.map_or(position, |duration| position.min(duration))
    }

    fn at_end(&self) -> bool {
        self.duration
            .is_some_and(|duration| self.position() >= duration)
    }
}

impl MediaStream for ClockStream {
    fn load(&mut self, uri: &str, duration_hint: Option<Duration>) {
        self.source = Some(uri.to_string());
        self.duration = duration_hint.or(self.default_duration);
        self.offset = Duration::ZERO;
        self.resumed_at = None;
        self.events.clear();
    }

    fn play(&mut self) -> Result<()> {
        let Some(source) = &self.source else {
            return Err(CoreError::PlaybackStartFailed {
                uri: String::new(),
                reason: "no source loaded".to_string(),
            });
        };
        if self.duration.is_none() {
            return Err(CoreError::PlaybackStartFailed {
                uri: source.clone(),
                reason: "stream length unknown".to_string(),
            });
        }
        if self.is_playing() {
            return Ok(());
        }
        // Playing a finished stream starts it over
        if self.at_end() {
            self.offset = Duration::ZERO;
        }
        self.resumed_at = Some(Instant::now());
        Ok(())
    }

    fn pause(&mut self) {
        self.offset = self.position();
        self.resumed_at = None;
    }

    fn seek(&mut self, position: Duration) {
        self.offset = self.clamp(position);
        if self.resumed_at.is_some() {
            self.resumed_at = Some(Instant::now());
        }
    }

    fn position(&self) -> Duration {
        let position = self
            .resumed_at
            .map_or(self.offset, |resumed| self.offset + resumed.elapsed());
        self.clamp(position)
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.resumed_at.is_some() && !self.at_end()
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn take_event(&mut self) -> Option<StreamEvent> {
        if self.resumed_at.is_some() && self.at_end() {
            self.pause();
            self.events.push_back(StreamEvent::Ended);
        }
        self.events.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_clock_stream_follows_clock() {
        let mut stream = ClockStream::new();
        stream.load("videos/a.mp4", Some(Duration::from_secs(10)));
        stream.play().unwrap();
        assert!(stream.is_playing());

        advance(Duration::from_secs(3)).await;
        assert_eq!(stream.position(), Duration::from_secs(3));

        stream.pause();
        advance(Duration::from_secs(3)).await;
        assert_eq!(stream.position(), Duration::from_secs(3));
        assert!(!stream.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_stream_ends_once() {
        let mut stream = ClockStream::new();
        stream.load("videos/a.mp4", Some(Duration::from_secs(2)));
        stream.play().unwrap();
        assert_eq!(stream.take_event(), None);

        advance(Duration::from_secs(5)).await;
        assert_eq!(stream.position(), Duration::from_secs(2));
        assert!(!stream.is_playing());
        assert_eq!(stream.take_event(), Some(StreamEvent::Ended));
        assert_eq!(stream.take_event(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_stream_seek_while_playing() {
        let mut stream = ClockStream::new();
        stream.load("audio/a.mp3", Some(Duration::from_secs(60)));
        stream.play().unwrap();
        advance(Duration::from_secs(1)).await;

        stream.seek(Duration::from_secs(10));
        advance(Duration::from_secs(1)).await;
        assert_eq!(stream.position(), Duration::from_secs(11));

        stream.seek(Duration::from_secs(600));
        assert_eq!(stream.position(), Duration::from_secs(60));
    }

    #[test]
    fn test_clock_stream_refuses_unknown_length() {
        let mut stream = ClockStream::new();
        assert!(matches!(
            stream.play(),
            Err(CoreError::PlaybackStartFailed { .. })
        ));

        stream.load("videos/a.mp4", None);
        assert!(matches!(
            stream.play(),
            Err(CoreError::PlaybackStartFailed { uri, .. }) if uri == "videos/a.mp4"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_stream_default_duration() {
        let mut stream = ClockStream::new().with_default_duration(Duration::from_secs(30));
        stream.load("videos/a.mp4", None);
        assert_eq!(stream.duration(), Some(Duration::from_secs(30)));
        stream.load("videos/b.mp4", Some(Duration::from_secs(5)));
        assert_eq!(stream.duration(), Some(Duration::from_secs(5)));
        assert_eq!(stream.source(), Some("videos/b.mp4"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_stream_replays_from_start_after_end() {
        let mut stream = ClockStream::new();
        stream.load("beep.mp3", Some(Duration::from_millis(500)));
        stream.play().unwrap();
        advance(Duration::from_secs(1)).await;
        assert!(!stream.is_playing());

        stream.play().unwrap();
        assert_eq!(stream.position(), Duration::ZERO);
        assert!(stream.is_playing());
    }
}
