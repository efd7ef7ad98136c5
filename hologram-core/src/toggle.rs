//! Play/pause control with a restart affordance after the playlist ends.

use crate::controller::Phase;
use std::fmt;

/// Text shown on the toggle control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleLabel {
    /// Nothing has played yet, or the playlist ran out
    #[default]
    Start,
    Play,
    Pause,
}

impl ToggleLabel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Play => "Play",
            Self::Pause => "Pause",
        }
    }
}

impl fmt::Display for ToggleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a click on the toggle should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Pause,
    Resume,
    /// Playlist exhausted: start over from the first item
    Restart,
    /// Nothing is loaded or the item is still loading
    Ignore,
}

/// Binary play/pause control over the primary stream
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackToggle {
    label: ToggleLabel,
}

impl PlaybackToggle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn label(&self) -> ToggleLabel {
        self.label
    }

    /// Decide what a click means in the current phase
    #[must_use]
    pub const fn action(&self, phase: Phase, primary_playing: bool) -> ToggleAction {
        match phase {
            Phase::Stopped => ToggleAction::Restart,
            Phase::Playing(_) if primary_playing => ToggleAction::Pause,
            Phase::Playing(_) => ToggleAction::Resume,
            Phase::Idle | Phase::Loading(_) => ToggleAction::Ignore,
        }
    }

    /// Follow the primary stream's play state.
    ///
    /// Returns `true` if the label changed.
    pub fn follow(&mut self, primary_playing: bool) -> bool {
        let label = if primary_playing {
            ToggleLabel::Pause
        } else {
            ToggleLabel::Play
        };
        self.set(label)
    }

    /// Back to the initial affordance after the playlist ran out.
    ///
    /// Returns `true` if the label changed.
    pub fn reset(&mut self) -> bool {
        self.set(ToggleLabel::Start)
    }

    fn set(&mut self, label: ToggleLabel) -> bool {
        let changed = self.label != label;
        self.label = label;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::LoadTicket;

    const TICKET: LoadTicket = LoadTicket { index: 0, epoch: 0 };

    #[test]
    fn test_initial_label_is_start() {
        assert_eq!(PlaybackToggle::new().label(), ToggleLabel::Start);
        assert_eq!(ToggleLabel::Start.to_string(), "Start");
    }

    #[test]
    fn test_action_by_phase() {
        let toggle = PlaybackToggle::new();
        assert_eq!(toggle.action(Phase::Playing(TICKET), true), ToggleAction::Pause);
        assert_eq!(toggle.action(Phase::Playing(TICKET), false), ToggleAction::Resume);
        assert_eq!(toggle.action(Phase::Stopped, false), ToggleAction::Restart);
        assert_eq!(toggle.action(Phase::Loading(TICKET), false), ToggleAction::Ignore);
        assert_eq!(toggle.action(Phase::Idle, false), ToggleAction::Ignore);
    }

    #[test]
    fn test_label_follows_play_state() {
        let mut toggle = PlaybackToggle::new();
        assert!(toggle.follow(true));
        assert_eq!(toggle.label(), ToggleLabel::Pause);
        assert!(!toggle.follow(true));
        assert!(toggle.follow(false));
        assert_eq!(toggle.label(), ToggleLabel::Play);
    }

    #[test]
    fn test_reset_restores_start() {
        let mut toggle = PlaybackToggle::new();
        toggle.follow(true);
        assert!(toggle.reset());
        assert_eq!(toggle.label(), ToggleLabel::Start);
        assert!(!toggle.reset());
    }
}
