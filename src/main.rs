//! companion-voice: voice navigation daemon for the companion app
//!
//! This daemon runs next to the companion UI shell and provides:
//! - Continuous listening sessions against a speech recognizer
//! - Fire-all command matching over the fixed command vocabulary
//! - Spoken feedback with a single superseding speech slot
//! - IPC server for the UI shell to toggle listening/mute and follow events
//!
//! It does NOT render screens, persist transcripts or understand language
//! beyond substring matching.

mod commands;
mod config;
mod control;
mod dispatch;
mod error;
mod events;
mod ipc;
mod lifecycle;
mod session;
mod speech;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::control::VoiceNavigator;
use crate::dispatch::NavigationDispatcher;
use crate::events::VoiceEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::session::SessionManager;
use crate::speech::FeedbackSpeaker;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "companion-voice starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs().context("failed to create data directory")?;
    info!(
        ?config.socket_path,
        recognizer = ?config.recognizer,
        synthesizer = ?config.synthesizer,
        "configuration loaded"
    );

    let mut shutdown = ShutdownSignal::new().context("failed to register signal handlers")?;

    // Create channels for inter-component communication
    // UI actions + recognizer events -> voice navigator, in arrival order
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    // Voice navigator + dispatcher -> IPC server and subscribers
    let (event_tx, _event_rx) = broadcast::channel::<VoiceEvent>(64);

    let session = SessionManager::new(config.build_recognizer(), input_tx.clone());
    if !session.is_available() {
        warn!("speech recognition unavailable - listening toggle will be disabled");
    }
    let speaker = FeedbackSpeaker::new(config.build_synthesizer(), config.voice);
    if !speaker.is_available() {
        warn!("speech synthesis unavailable - feedback will be silent");
    }

    let mut dispatcher = NavigationDispatcher::new(config.repeat_window, event_tx.clone());
    let mut navigator = VoiceNavigator::new(
        session,
        speaker,
        move |command| dispatcher.dispatch(command),
        event_tx.clone(),
    );

    // Create IPC server with the initial snapshot
    let server = Server::new(
        &config.socket_path,
        navigator.status(),
        input_tx,
        event_tx.clone(),
    )?;

    // Subscribe to voice events for IPC status updates
    let mut status_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the voice navigator (processes UI actions and recognizer events)
        _ = navigator.run(input_rx) => {
            info!("voice navigator exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Keep the served status in step with voice events
        _ = async {
            loop {
                match status_rx.recv().await {
                    Ok(event) => {
                        info!(%event, "voice event");
                        server.apply_event(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "voice event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("voice event handler exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    navigator.shutdown();
    server.shutdown().await;

    info!("companion-voice stopped");

    Ok(())
}
