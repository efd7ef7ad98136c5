mod console;
mod input;

use crate::console::ConsoleSurface;
use hologram_core::{
    loader_for_root, ClockStream, CoreError, Engine, EngineEvent, EngineOptions, HologramConfig,
    LoggingConfig, Playlist,
};
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Length assumed for the play chime
const CHIME_LENGTH: Duration = Duration::from_secs(1);

/// Our own crates at info, dependencies only when they warn
const DEFAULT_LOG_FILTER: &str = "warn,hologram=info,hologram_core=info,hologram_app=info";

/// How long blocked stdin reads may hold up exit
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

fn main() {
    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    // Load config or create template on first run
    let config = match HologramConfig::load_or_create() {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created a configuration template at {}. Edit it and run again.",
                path.display()
            );
            std::process::exit(0);
        }
        Err(CoreError::ConfigParseError(parse_error)) => {
            error!(
                "Config file {} has a syntax error: {parse_error}",
                HologramConfig::config_path().display()
            );
            std::process::exit(1);
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let result = runtime.block_on(run(config, cancel_token));
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Build the player from config and run it until cancelled
async fn run(config: HologramConfig, cancel_token: CancellationToken) -> Result<(), CoreError> {
    let loader = loader_for_root(&config.media.root)?;
    info!(
        "Loading media from {} ({} loader)",
        config.media.root,
        loader.name()
    );

    let playlist = Playlist::fetch(
        loader.as_ref(),
        &config.media.manifest,
        &config.media.layout(),
    )
    .await;
    info!("Playlist has {} item(s)", playlist.len());

    let default_duration = config.media.default_duration();
    let mut engine = Engine::new(
        playlist,
        loader,
        Box::new(clock_stream(default_duration)),
        Box::new(clock_stream(default_duration)),
        Box::new(ConsoleSurface::new()),
        EngineOptions::from_config(&config),
    );
    if let Some(chime) = &config.media.play_chime {
        info!("Play chime: {}", chime);
        engine = engine.with_chime(Box::new(clock_stream(Some(CHIME_LENGTH))), chime);
    }

    tokio::spawn(log_engine_events(engine.subscribe()));
    tokio::spawn(input::forward_stdin(engine.handle(), cancel_token.clone()));
    info!("Controls: <enter> or 'p' toggles play/pause, 'q' quits, anything else unmutes");

    engine.run(cancel_token).await
}

fn clock_stream(default_duration: Option<Duration>) -> ClockStream {
    default_duration.map_or_else(ClockStream::new, |duration| {
        ClockStream::new().with_default_duration(duration)
    })
}

/// Log all engine events to the console
async fn log_engine_events(mut rx: broadcast::Receiver<EngineEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match &event {
                EngineEvent::ItemLoading { index, uri } => {
                    info!("Loading item {}: {}", index, uri);
                }
                EngineEvent::ItemStarted { .. } => {
                    // Already logged by the engine
                }
                EngineEvent::ItemFailed { index, reason } => {
                    warn!("Skipped item {}: {}", index, reason);
                }
                EngineEvent::CaptionsLoaded { index, cues } => {
                    info!("Item {} has {} caption cue(s)", index, cues);
                }
                EngineEvent::CaptionsUnavailable { index, .. } => {
                    info!("Item {} plays without captions", index);
                }
                EngineEvent::SecondaryBound { index, uri } => {
                    info!("Item {} plays with audio track {}", index, uri);
                }
                EngineEvent::SecondaryUnavailable { .. } => {}
                EngineEvent::DriftCorrected { from, to } => {
                    info!("Audio re-synced from {:?} to {:?}", from, to);
                }
                EngineEvent::Paused { position } => {
                    info!("Playback paused at {:?}", position);
                }
                EngineEvent::Resumed { position } => {
                    info!("Playback resumed at {:?}", position);
                }
                EngineEvent::Unmuted => {
                    info!("Sound on");
                }
                EngineEvent::Restarted => {
                    info!("Playlist restarted");
                }
                EngineEvent::PlaylistExhausted => {
                    info!("Playlist finished. Press <enter> to start again.");
                }
            },
            Err(broadcast::error::RecvError::Closed) => {
                info!("Engine event channel closed");
                break;
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                info!("Missed {} engine events", n);
            }
        }
    }
}

/// Check if file logging is enabled by reading the config file.
/// This is done before full config loading to set up tracing first.
/// Returns `false` if config doesn't exist or can't be parsed.
fn check_file_logging_enabled() -> bool {
    std::fs::read_to_string(HologramConfig::config_path())
        .is_ok_and(|content| file_logging_enabled_in(&content))
}

/// Read only the `[logging]` section, ignoring mistakes elsewhere
fn file_logging_enabled_in(content: &str) -> bool {
    #[derive(serde::Deserialize)]
    struct LoggingOnly {
        #[serde(default)]
        logging: LoggingConfig,
    }

    toml::from_str::<LoggingOnly>(content).is_ok_and(|c| c.logging.enabled)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer();

    if file_logging_enabled {
        let log_path = hologram_core::paths::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
