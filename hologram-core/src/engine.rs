//! Application context and event dispatcher.
//!
//! The [`Engine`] owns every piece of playback state and processes all
//! inputs on one task: async completions and user input arrive through the
//! inbox, stream lifecycle changes are drained on the time-update tick, and
//! the redraw loop runs on the frame tick. Nothing is shared, so nothing is
//! locked.

use crate::config::HologramConfig;
use crate::controller::{Command, LoadTicket, Phase, PlaylistController};
use crate::cue::{CueTrack, DEFAULT_CAPTION_COLOR, DEFAULT_GROUP_KEY};
use crate::display::{broadcast_caption, DisplaySurface};
use crate::error::{CoreError, Result};
use crate::loader::ResourceLoader;
use crate::media::{MediaStream, StreamEvent};
use crate::playback::PlaybackState;
use crate::playlist::{MediaItem, Playlist};
use crate::sync::{SyncClock, DEFAULT_DRIFT_TOLERANCE};
use crate::toggle::{PlaybackToggle, ToggleAction, ToggleLabel};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Inputs processed by the engine
#[derive(Debug)]
pub enum PlayerEvent {
    /// The play/pause control was clicked
    ToggleClicked,
    /// Any click or key press anywhere
    Interaction,
    /// Existence probe of the primary resource finished
    PrimaryProbed { ticket: LoadTicket, found: bool },
    /// Caption document fetched and parsed (or not)
    CaptionsFetched {
        ticket: LoadTicket,
        result: Result<CueTrack>,
    },
    /// Existence probe of the secondary audio finished
    SecondaryProbed {
        ticket: LoadTicket,
        uri: String,
        found: bool,
    },
}

/// Notifications for observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ItemLoading { index: usize, uri: String },
    ItemStarted { index: usize, uri: String },
    /// The item was skipped (missing resource or playback failure)
    ItemFailed { index: usize, reason: String },
    CaptionsLoaded { index: usize, cues: usize },
    CaptionsUnavailable { index: usize, reason: String },
    SecondaryBound { index: usize, uri: String },
    SecondaryUnavailable { index: usize, uri: String },
    DriftCorrected { from: Duration, to: Duration },
    Paused { position: Duration },
    Resumed { position: Duration },
    Unmuted,
    Restarted,
    PlaylistExhausted,
}

/// Tunables taken from the config file
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub caption_group_key: String,
    pub caption_color: String,
    pub drift_tolerance: Duration,
    pub time_update_interval: Duration,
    pub frame_interval: Duration,
    pub start_muted: bool,
    pub loop_playlist: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            caption_group_key: DEFAULT_GROUP_KEY.to_string(),
            caption_color: DEFAULT_CAPTION_COLOR.to_string(),
            drift_tolerance: DEFAULT_DRIFT_TOLERANCE,
            time_update_interval: Duration::from_millis(250),
            frame_interval: Duration::from_secs(1) / 60,
            start_muted: true,
            loop_playlist: false,
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn from_config(config: &HologramConfig) -> Self {
        Self {
            caption_group_key: config.media.caption_group_key.clone(),
            caption_color: config.display.caption_color.clone(),
            drift_tolerance: config.playback.drift_tolerance(),
            time_update_interval: config.playback.time_update_interval(),
            frame_interval: config.display.frame_interval(),
            start_muted: config.playback.start_muted,
            loop_playlist: config.playback.loop_playlist,
        }
    }
}

/// Cloneable sender for user input
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<PlayerEvent>,
}

impl EngineHandle {
    /// Click the play/pause control. Returns `false` once the engine is gone.
    pub fn toggle(&self) -> bool {
        self.tx.send(PlayerEvent::ToggleClicked).is_ok()
    }

    /// Report a click anywhere. Returns `false` once the engine is gone.
    pub fn interact(&self) -> bool {
        self.tx.send(PlayerEvent::Interaction).is_ok()
    }
}

/// The player
pub struct Engine {
    options: EngineOptions,
    controller: PlaylistController,
    cues: CueTrack,
    sync: SyncClock,
    toggle: PlaybackToggle,
    state: PlaybackState,
    primary: Box<dyn MediaStream>,
    secondary: Box<dyn MediaStream>,
    secondary_bound: bool,
    chime: Option<Box<dyn MediaStream>>,
    surface: Box<dyn DisplaySurface>,
    loader: Arc<dyn ResourceLoader>,
    inbox_tx: mpsc::UnboundedSender<PlayerEvent>,
    inbox_rx: mpsc::UnboundedReceiver<PlayerEvent>,
    event_tx: broadcast::Sender<EngineEvent>,
    last_readout: String,
}

impl Engine {
    pub fn new(
        playlist: Playlist,
        loader: Arc<dyn ResourceLoader>,
        primary: Box<dyn MediaStream>,
        secondary: Box<dyn MediaStream>,
        surface: Box<dyn DisplaySurface>,
        options: EngineOptions,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(256);

        Self {
            controller: PlaylistController::new(playlist).with_loop(options.loop_playlist),
            cues: CueTrack::empty(options.caption_color.clone()),
            sync: SyncClock::new(options.drift_tolerance),
            toggle: PlaybackToggle::new(),
            state: PlaybackState::new(options.start_muted),
            primary,
            secondary,
            secondary_bound: false,
            chime: None,
            surface,
            loader,
            inbox_tx,
            inbox_rx,
            event_tx,
            last_readout: String::new(),
            options,
        }
    }

    /// Replay `uri` on `stream` whenever the primary starts or resumes
    #[must_use]
    pub fn with_chime(mut self, mut stream: Box<dyn MediaStream>, uri: &str) -> Self {
        stream.load(uri, None);
        stream.set_muted(self.state.is_muted);
        self.chime = Some(stream);
        self
    }

    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.inbox_tx.clone(),
        }
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    #[must_use]
    pub const fn state(&self) -> &PlaybackState {
        &self.state
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.controller.phase()
    }

    #[must_use]
    pub const fn cues(&self) -> &CueTrack {
        &self.cues
    }

    #[must_use]
    pub const fn toggle_label(&self) -> ToggleLabel {
        self.toggle.label()
    }

    #[must_use]
    pub const fn secondary_bound(&self) -> bool {
        self.secondary_bound
    }

    /// Begin playing the first item.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PlaylistEmpty`] if there is nothing to play.
    pub fn start(&mut self) -> Result<()> {
        if self.controller.playlist().is_empty() {
            return Err(CoreError::PlaylistEmpty);
        }
        info!(
            "Starting playback of {} item(s)",
            self.controller.playlist().len()
        );
        self.surface.set_toggle_label(self.toggle.label());
        self.update_readout();
        let commands = self.controller.load_and_play(0)?;
        self.execute(commands);
        Ok(())
    }

    /// Process events until `cancel` fires. Starts playback first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PlaylistEmpty`] if there is nothing to play.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        if self.controller.phase() == Phase::Idle {
            self.start()?;
        }

        let mut time_updates = tokio::time::interval(self.options.time_update_interval);
        time_updates.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frames = tokio::time::interval(self.options.frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Engine shutting down");
                    break;
                }
                Some(event) = self.inbox_rx.recv() => {
                    self.handle_event(event);
                }
                _ = time_updates.tick() => {
                    self.on_time_update();
                }
                _ = frames.tick() => {
                    self.on_frame();
                }
            }
        }

        self.primary.pause();
        self.secondary.pause();
        Ok(())
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }

    fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::ToggleClicked => self.on_toggle_clicked(),
            PlayerEvent::Interaction => self.on_interaction(),
            PlayerEvent::PrimaryProbed { ticket, found } => {
                if !found && self.controller.is_current(ticket) {
                    let uri = self.item_uri(ticket.index);
                    self.emit(EngineEvent::ItemFailed {
                        index: ticket.index,
                        reason: CoreError::ResourceNotFound { uri }.to_string(),
                    });
                }
                let commands = self.controller.on_primary_probed(ticket, found);
                self.execute(commands);
            }
            PlayerEvent::CaptionsFetched { ticket, result } => self.on_captions(ticket, result),
            PlayerEvent::SecondaryProbed { ticket, uri, found } => {
                self.on_secondary_probed(ticket, &uri, found);
            }
        }
    }

    /// Run commands in order, including any follow-ups they produce
    fn execute(&mut self, commands: Vec<Command>) {
        let mut queue = VecDeque::from(commands);
        while let Some(command) = queue.pop_front() {
            queue.extend(self.apply(command));
        }
    }

    fn apply(&mut self, command: Command) -> Vec<Command> {
        match command {
            Command::ProbePrimary { ticket, uri } => {
                self.state.begin_item(ticket.index);
                self.emit(EngineEvent::ItemLoading {
                    index: ticket.index,
                    uri: uri.clone(),
                });
                let loader = Arc::clone(&self.loader);
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let found = loader.exists(&uri).await;
                    let _ = tx.send(PlayerEvent::PrimaryProbed { ticket, found });
                });
                Vec::new()
            }
            Command::FetchCaptions { ticket, uri } => {
                let loader = Arc::clone(&self.loader);
                let tx = self.inbox_tx.clone();
                let group_key = self.options.caption_group_key.clone();
                let color = self.options.caption_color.clone();
                tokio::spawn(async move {
                    let result = loader
                        .fetch_text(&uri)
                        .await
                        .and_then(|text| CueTrack::parse(&text, &group_key, &color));
                    let _ = tx.send(PlayerEvent::CaptionsFetched { ticket, result });
                });
                Vec::new()
            }
            Command::ProbeSecondary { ticket, uri } => {
                let loader = Arc::clone(&self.loader);
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let found = loader.exists(&uri).await;
                    let _ = tx.send(PlayerEvent::SecondaryProbed { ticket, uri, found });
                });
                Vec::new()
            }
            Command::StartPrimary { ticket, item } => self.start_primary(ticket, &item),
            Command::Unload => {
                self.unload();
                Vec::new()
            }
            Command::Exhausted => {
                self.state.is_playing = false;
                if self.toggle.reset() {
                    self.surface.set_toggle_label(self.toggle.label());
                }
                self.emit(EngineEvent::PlaylistExhausted);
                Vec::new()
            }
        }
    }

    fn start_primary(&mut self, ticket: LoadTicket, item: &MediaItem) -> Vec<Command> {
        self.primary.load(&item.primary_uri, item.duration_hint);
        self.primary.set_muted(self.state.is_muted);
        self.state.duration = self.primary.duration();

        match self.primary.play() {
            Ok(()) => {
                if self.controller.on_primary_started(ticket) {
                    info!("Playing item {}: {}", ticket.index, item.primary_uri);
                    self.state.is_playing = true;
                    self.after_primary_play();
                    self.emit(EngineEvent::ItemStarted {
                        index: ticket.index,
                        uri: item.primary_uri.clone(),
                    });
                }
                Vec::new()
            }
            Err(e) => {
                warn!("{}", e);
                self.emit(EngineEvent::ItemFailed {
                    index: ticket.index,
                    reason: e.to_string(),
                });
                self.controller.on_primary_failed(ticket)
            }
        }
    }

    /// Follow-up shared by first start and resume
    fn after_primary_play(&mut self) {
        if self.secondary_bound {
            self.sync
                .resume(self.primary.position(), self.secondary.as_mut());
        }
        if self.toggle.follow(true) {
            self.surface.set_toggle_label(self.toggle.label());
        }
        if let Some(chime) = self.chime.as_mut() {
            chime.seek(Duration::ZERO);
            if let Err(e) = chime.play() {
                debug!("Chime could not play: {}", e);
            }
        }
    }

    fn unload(&mut self) {
        self.primary.pause();
        if self.secondary_bound {
            self.sync.pause(self.secondary.as_mut());
            self.secondary_bound = false;
        }
        self.state.is_playing = false;
        self.state.secondary_position = None;
        self.cues = CueTrack::empty(self.options.caption_color.clone());
        // Start stays put until something actually plays
        if self.toggle.label() == ToggleLabel::Pause && self.toggle.follow(false) {
            self.surface.set_toggle_label(self.toggle.label());
        }
    }

    fn on_captions(&mut self, ticket: LoadTicket, result: Result<CueTrack>) {
        if !self.controller.is_current(ticket) {
            debug!("Ignoring captions for superseded item {}", ticket.index);
            return;
        }

        match result {
            Ok(track) => {
                info!("Loaded {} cue(s) for item {}", track.len(), ticket.index);
                self.emit(EngineEvent::CaptionsLoaded {
                    index: ticket.index,
                    cues: track.len(),
                });
                self.cues = track;
            }
            Err(e) => {
                warn!("Captions unavailable for item {}: {}", ticket.index, e);
                self.emit(EngineEvent::CaptionsUnavailable {
                    index: ticket.index,
                    reason: e.to_string(),
                });
                self.cues = CueTrack::empty(self.options.caption_color.clone());
            }
        }
        self.present_caption();
    }

    fn on_secondary_probed(&mut self, ticket: LoadTicket, uri: &str, found: bool) {
        if !self.controller.is_current(ticket) {
            debug!("Ignoring secondary probe for superseded item {}", ticket.index);
            return;
        }
        if !found {
            info!("No secondary audio for item {} ({})", ticket.index, uri);
            self.emit(EngineEvent::SecondaryUnavailable {
                index: ticket.index,
                uri: uri.to_string(),
            });
            return;
        }

        let hint = self
            .controller
            .playlist()
            .get(ticket.index)
            .and_then(|item| item.duration_hint);
        self.secondary.load(uri, hint);
        self.secondary.set_muted(self.state.is_muted);
        self.secondary_bound = true;
        info!("Bound secondary audio {} to item {}", uri, ticket.index);
        self.emit(EngineEvent::SecondaryBound {
            index: ticket.index,
            uri: uri.to_string(),
        });

        if self.primary.is_playing() {
            self.sync
                .resume(self.primary.position(), self.secondary.as_mut());
            self.state.secondary_position = Some(self.secondary.position());
        }
    }

    fn on_toggle_clicked(&mut self) {
        self.on_interaction();
        // A stream that just reached its end must advance, not replay
        self.drain_stream_events();

        match self
            .toggle
            .action(self.controller.phase(), self.primary.is_playing())
        {
            ToggleAction::Pause => {
                self.primary.pause();
                if self.secondary_bound {
                    self.sync.pause(self.secondary.as_mut());
                }
                self.state.is_playing = false;
                self.state.primary_position = self.primary.position();
                if self.toggle.follow(false) {
                    self.surface.set_toggle_label(self.toggle.label());
                }
                info!("Paused at {:?}", self.state.primary_position);
                self.emit(EngineEvent::Paused {
                    position: self.state.primary_position,
                });
            }
            ToggleAction::Resume => self.resume(),
            ToggleAction::Restart => match self.controller.restart() {
                Ok(commands) => {
                    self.emit(EngineEvent::Restarted);
                    self.execute(commands);
                }
                Err(e) => warn!("{}", e),
            },
            ToggleAction::Ignore => {
                debug!("Toggle ignored while {}", self.controller.phase());
            }
        }
    }

    fn resume(&mut self) {
        let Some(ticket) = self.controller.phase().ticket() else {
            return;
        };
        match self.primary.play() {
            Ok(()) => {
                self.state.is_playing = true;
                self.after_primary_play();
                info!("Resumed at {:?}", self.primary.position());
                self.emit(EngineEvent::Resumed {
                    position: self.primary.position(),
                });
            }
            Err(e) => {
                warn!("Resume failed: {}", e);
                self.emit(EngineEvent::ItemFailed {
                    index: ticket.index,
                    reason: e.to_string(),
                });
                let commands = self.controller.on_primary_failed(ticket);
                self.execute(commands);
            }
        }
    }

    /// Any click un-mutes, once
    fn on_interaction(&mut self) {
        if !self.state.is_muted {
            return;
        }
        self.state.is_muted = false;
        self.primary.set_muted(false);
        self.secondary.set_muted(false);
        if let Some(chime) = self.chime.as_mut() {
            chime.set_muted(false);
        }
        info!("Audio unmuted");
        self.emit(EngineEvent::Unmuted);
    }

    /// Apply queued stream lifecycle events to the controller
    fn drain_stream_events(&mut self) {
        if let Some(chime) = self.chime.as_mut() {
            while chime.take_event().is_some() {}
        }

        let Some(ticket) = self.controller.phase().ticket() else {
            return;
        };

        while let Some(event) = self.primary.take_event() {
            let commands = match event {
                StreamEvent::Ended => {
                    info!("Item {} finished", ticket.index);
                    self.controller.on_primary_ended(ticket)
                }
                StreamEvent::Failed(reason) => {
                    warn!("Item {} failed during playback: {}", ticket.index, reason);
                    self.emit(EngineEvent::ItemFailed {
                        index: ticket.index,
                        reason,
                    });
                    self.controller.on_primary_failed(ticket)
                }
            };
            self.execute(commands);
            if !self.controller.is_current(ticket) {
                return;
            }
        }

        if self.secondary_bound {
            while let Some(event) = self.secondary.take_event() {
                if let StreamEvent::Failed(reason) = event {
                    warn!("Secondary audio failed, continuing without it: {}", reason);
                    self.secondary.pause();
                    self.secondary_bound = false;
                    self.state.secondary_position = None;
                    break;
                }
            }
        }
    }

    /// Time-update tick: drain stream lifecycle events, then sample
    /// positions, correct drift and refresh captions and readout
    fn on_time_update(&mut self) {
        self.drain_stream_events();

        if !matches!(self.controller.phase(), Phase::Playing(_)) {
            return;
        }

        let position = self.primary.position();
        self.state.primary_position = position;
        self.state.duration = self.primary.duration();

        if self.secondary_bound {
            if let Some(correction) = self.sync.on_time_update(position, self.secondary.as_mut()) {
                self.emit(EngineEvent::DriftCorrected {
                    from: correction.from,
                    to: correction.to,
                });
            }
            self.state.secondary_position = Some(self.secondary.position());
        }

        self.present_caption();
        self.update_readout();
    }

    /// Redraw tick. Reads playback state, never changes it.
    fn on_frame(&mut self) {
        self.present_caption();
        self.surface.render_frame();
    }

    fn present_caption(&mut self) {
        let caption = self.cues.resolve(self.primary.position());
        broadcast_caption(self.surface.as_mut(), &caption);
    }

    fn update_readout(&mut self) {
        let readout = self.state.time_readout();
        if readout != self.last_readout {
            self.surface.set_time_readout(&readout);
            self.last_readout = readout;
        }
    }

    fn item_uri(&self, index: usize) -> String {
        self.controller
            .playlist()
            .get(index)
            .map(|item| item.primary_uri.clone())
            .unwrap_or_default()
    }
}
