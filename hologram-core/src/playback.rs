use crate::time::format_time_readout;
use std::time::Duration;

/// Snapshot of what the player is doing.
///
/// Written only by the engine on behalf of the playlist controller and the
/// toggle; everything else reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    /// Playlist index of the active item (None before the first load)
    pub current_index: Option<usize>,
    /// Position of the primary (video) stream
    pub primary_position: Duration,
    /// Position of the secondary (audio) stream, when one is bound
    pub secondary_position: Option<Duration>,
    /// Total length of the primary stream, once known
    pub duration: Option<Duration>,
    /// Whether the primary stream is currently playing
    pub is_playing: bool,
    /// Whether audio output is muted
    pub is_muted: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_index: None,
            primary_position: Duration::ZERO,
            secondary_position: None,
            duration: None,
            is_playing: false,
            is_muted: true,
        }
    }
}

impl PlaybackState {
    /// Create a state for a fresh player
    #[must_use]
    pub fn new(start_muted: bool) -> Self {
        Self {
            is_muted: start_muted,
            ..Self::default()
        }
    }

    /// Reset positions for a newly loaded item
    pub fn begin_item(&mut self, index: usize) {
        self.current_index = Some(index);
        self.primary_position = Duration::ZERO;
        self.secondary_position = None;
        self.duration = None;
        self.is_playing = false;
    }

    /// Distance between the two streams, if a secondary is bound
    #[must_use]
    pub fn drift(&self) -> Option<Duration> {
        self.secondary_position
            .map(|secondary| secondary.abs_diff(self.primary_position))
    }

    /// Elapsed/total readout for the time display
    #[must_use]
    pub fn time_readout(&self) -> String {
        format_time_readout(self.primary_position, self.duration)
    }
}
