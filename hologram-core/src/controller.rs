//! Sequential playlist state machine.
//!
//! The controller never touches media directly. Each transition returns the
//! [`Command`]s the engine has to carry out, and the engine reports results
//! back through the `on_*` methods. Every asynchronous step is stamped with a
//! [`LoadTicket`]; results carrying a ticket that is no longer current are
//! dropped, so a slow probe for item `i` can never clobber item `i + 1`.

use crate::error::{CoreError, Result};
use crate::playlist::{MediaItem, Playlist};
use std::fmt;
use tracing::{debug, info, warn};

/// Identifies one load attempt of one playlist item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub index: usize,
    /// Monotonic per controller, so reloading the same index gets a new ticket
    pub epoch: u64,
}

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing loaded yet
    Idle,
    /// Probing the primary resource or waiting for it to start
    Loading(LoadTicket),
    /// Primary stream is running (it may be paused by the user)
    Playing(LoadTicket),
    /// Playlist exhausted, waiting for a restart
    Stopped,
}

impl Phase {
    /// Ticket of the active item, if any
    #[must_use]
    pub const fn ticket(&self) -> Option<LoadTicket> {
        match self {
            Self::Loading(ticket) | Self::Playing(ticket) => Some(*ticket),
            Self::Idle | Self::Stopped => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading(_) => "loading",
            Self::Playing(_) => "playing",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side effects requested by a transition, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check that the primary resource exists
    ProbePrimary { ticket: LoadTicket, uri: String },
    /// Fetch and parse the caption document
    FetchCaptions { ticket: LoadTicket, uri: String },
    /// Check for a secondary audio track before binding it
    ProbeSecondary { ticket: LoadTicket, uri: String },
    /// Load the primary stream and start it
    StartPrimary { ticket: LoadTicket, item: MediaItem },
    /// Tear down the active item: pause streams, unbind audio, clear captions
    Unload,
    /// Every item has been visited and playback stopped
    Exhausted,
}

/// Walks the playlist one item at a time
#[derive(Debug)]
pub struct PlaylistController {
    playlist: Playlist,
    phase: Phase,
    next_epoch: u64,
    loop_playlist: bool,
    /// Whether any item started since the pass began at index 0
    started_in_pass: bool,
}

impl PlaylistController {
    #[must_use]
    pub const fn new(playlist: Playlist) -> Self {
        Self {
            playlist,
            phase: Phase::Idle,
            next_epoch: 0,
            loop_playlist: false,
            started_in_pass: false,
        }
    }

    /// Wrap around to the first item instead of stopping at the end.
    ///
    /// A pass in which no item managed to start still stops.
    #[must_use]
    pub const fn with_loop(mut self, loop_playlist: bool) -> Self {
        self.loop_playlist = loop_playlist;
        self
    }

    #[must_use]
    pub const fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        match self.phase.ticket() {
            Some(ticket) => Some(ticket.index),
            None => None,
        }
    }

    /// Item currently loading or playing
    #[must_use]
    pub fn current_item(&self) -> Option<&MediaItem> {
        self.current_index().and_then(|index| self.playlist.get(index))
    }

    /// Whether results stamped with `ticket` still apply
    #[must_use]
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.phase.ticket() == Some(ticket)
    }

    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        matches!(self.phase, Phase::Stopped)
    }

    /// Start loading item `index`, superseding whatever is active.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfRange`] for an index outside the
    /// playlist and [`CoreError::LoadInProgress`] if that index is already
    /// loading.
    pub fn load_and_play(&mut self, index: usize) -> Result<Vec<Command>> {
        if index >= self.playlist.len() {
            return Err(CoreError::IndexOutOfRange {
                index,
                len: self.playlist.len(),
            });
        }
        if let Phase::Loading(ticket) = self.phase {
            if ticket.index == index {
                return Err(CoreError::LoadInProgress { index });
            }
        }

        let mut commands = Vec::new();
        if self.phase.ticket().is_some() {
            commands.push(Command::Unload);
        }
        commands.extend(self.begin(index));
        Ok(commands)
    }

    /// Restart from the first item after the playlist ran out.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RestartRejected`] unless the controller is
    /// stopped.
    pub fn restart(&mut self) -> Result<Vec<Command>> {
        if !self.is_stopped() {
            return Err(CoreError::RestartRejected {
                phase: self.phase.to_string(),
            });
        }
        info!("Restarting playlist");
        self.load_and_play(0)
    }

    /// Result of the primary existence probe
    pub fn on_primary_probed(&mut self, ticket: LoadTicket, found: bool) -> Vec<Command> {
        if self.phase != Phase::Loading(ticket) {
            debug!("Ignoring stale probe result for item {}", ticket.index);
            return Vec::new();
        }

        let Some(item) = self.playlist.get(ticket.index).cloned() else {
            return Vec::new();
        };

        if !found {
            warn!("Media not found: {} (item {})", item.primary_uri, ticket.index);
            return self.advance(ticket.index);
        }

        let mut commands = vec![Command::FetchCaptions {
            ticket,
            uri: item.caption_uri.clone(),
        }];
        if let Some(audio_uri) = &item.audio_uri {
            commands.push(Command::ProbeSecondary {
                ticket,
                uri: audio_uri.clone(),
            });
        }
        commands.push(Command::StartPrimary { ticket, item });
        commands
    }

    /// The primary stream accepted the start request.
    ///
    /// Returns `false` if the ticket is stale.
    pub fn on_primary_started(&mut self, ticket: LoadTicket) -> bool {
        if self.phase != Phase::Loading(ticket) {
            debug!("Ignoring stale start for item {}", ticket.index);
            return false;
        }
        self.phase = Phase::Playing(ticket);
        self.started_in_pass = true;
        true
    }

    /// The primary stream refused to start or failed while running
    pub fn on_primary_failed(&mut self, ticket: LoadTicket) -> Vec<Command> {
        if !self.is_current(ticket) {
            debug!("Ignoring stale failure for item {}", ticket.index);
            return Vec::new();
        }
        warn!("Item {} failed, skipping", ticket.index);
        self.advance(ticket.index)
    }

    /// The primary stream reached its end
    pub fn on_primary_ended(&mut self, ticket: LoadTicket) -> Vec<Command> {
        if self.phase != Phase::Playing(ticket) {
            debug!("Ignoring end of stream for item {}", ticket.index);
            return Vec::new();
        }
        self.advance(ticket.index)
    }

    fn advance(&mut self, from: usize) -> Vec<Command> {
        let mut commands = vec![Command::Unload];
        let next = from + 1;

        if next < self.playlist.len() {
            commands.extend(self.begin(next));
        } else if self.loop_playlist && self.started_in_pass {
            info!("Reached end of playlist, looping back to the first item");
            commands.extend(self.begin(0));
        } else {
            info!("Playlist exhausted after {} item(s)", self.playlist.len());
            self.phase = Phase::Stopped;
            commands.push(Command::Exhausted);
        }
        commands
    }

    fn begin(&mut self, index: usize) -> Option<Command> {
        let item = self.playlist.get(index)?;
        let ticket = LoadTicket {
            index,
            epoch: self.next_epoch,
        };
        self.next_epoch += 1;
        if index == 0 {
            self.started_in_pass = false;
        }
        self.phase = Phase::Loading(ticket);

        info!("Loading item {}: {}", index, item.primary_uri);
        Some(Command::ProbePrimary {
            ticket,
            uri: item.primary_uri.clone(),
        })
    }
}
