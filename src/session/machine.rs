//! Session manager implementation
//!
//! Every start opens a new generation. Recognizer events are tagged with
//! the generation they were issued for and are only accepted while that
//! generation is the one listening.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::control::Input;
use crate::error::{Result, VoiceError};
use crate::speech::{Recognizer, RecognizerEvent, RecognizerEventKind, RecognizerSink};

/// The three states of a recognition session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not listening
    #[default]
    Idle,
    /// Recognizer running, transcripts accepted
    Listening,
    /// Recognizer failed; always followed by Idle
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Listening => write!(f, "Listening"),
            SessionState::Error => write!(f, "Error"),
        }
    }
}

/// Monotonic session counter used to discard stale recognizer events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of a successful `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new session was opened
    Started,
    /// Already listening; nothing changed
    AlreadyListening,
}

/// What a recognizer event means for the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Event belongs to a finished session, or repeats a confirmation
    Ignored,
    /// The recognizer confirmed the session started
    Confirmed,
    /// New transcript for the current utterance
    Transcript(String),
    /// Recognizer failed; the session is stopped
    Failed(VoiceError),
    /// Recognizer ended on its own; the session is stopped
    Ended,
}

pub struct SessionManager {
    /// Current state
    state: SessionState,
    /// Generation of the most recent session
    generation: Generation,
    /// Whether the current generation's start was confirmed
    confirmed: bool,
    /// Probed once at construction
    available: bool,
    recognizer: Option<Box<dyn Recognizer>>,
    /// Where recognizer sinks deliver their events
    input_tx: mpsc::UnboundedSender<Input>,
    /// Time when the current session started listening
    listening_since: Option<Instant>,
}

impl SessionManager {
    /// Create a session manager, probing the recognizer once
    pub fn new(
        recognizer: Option<Box<dyn Recognizer>>,
        input_tx: mpsc::UnboundedSender<Input>,
    ) -> Self {
        let available = match recognizer.as_ref() {
            Some(r) => {
                let available = r.is_available();
                info!(backend = r.name(), available, "probed speech recognizer");
                available
            }
            None => {
                info!("no speech recognizer configured");
                false
            }
        };

        Self {
            state: SessionState::Idle,
            generation: Generation::default(),
            confirmed: false,
            available,
            recognizer,
            input_tx,
            listening_since: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether listening can be offered at all on this device
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Start a new listening session
    ///
    /// Fails with `CapabilityUnavailable` or `StartFailure` without
    /// changing state. Starting while listening is a no-op.
    pub fn start(&mut self) -> Result<StartOutcome> {
        if self.state == SessionState::Listening {
            debug!(generation = %self.generation, "already listening");
            return Ok(StartOutcome::AlreadyListening);
        }

        let recognizer = match self.recognizer.as_mut() {
            Some(r) if self.available => r,
            _ => {
                warn!("start requested without a speech recognizer");
                return Err(VoiceError::CapabilityUnavailable);
            }
        };

        let generation = self.generation.next();
        let sink = RecognizerSink::new(generation, self.input_tx.clone());
        if let Err(e) = recognizer.start(sink) {
            warn!(?e, %generation, "recognizer rejected start");
            return Err(e);
        }

        self.generation = generation;
        self.confirmed = false;
        self.transition_to(SessionState::Listening);
        Ok(StartOutcome::Started)
    }

    /// Stop listening; returns whether a session was active
    ///
    /// Events from the stopped session that arrive later are ignored.
    pub fn stop(&mut self) -> bool {
        if self.state != SessionState::Listening {
            return false;
        }

        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
        self.transition_to(SessionState::Idle);
        true
    }

    /// Apply a recognizer event, discarding it if it is stale
    pub fn handle_event(&mut self, event: RecognizerEvent) -> SessionUpdate {
        if self.state != SessionState::Listening || event.generation != self.generation {
            debug!(
                event_generation = %event.generation,
                current = %self.generation,
                state = %self.state,
                "discarding stale recognizer event"
            );
            return SessionUpdate::Ignored;
        }

        match event.kind {
            RecognizerEventKind::Started => {
                if self.confirmed {
                    return SessionUpdate::Ignored;
                }
                self.confirmed = true;
                info!(generation = %self.generation, "recognizer confirmed start");
                SessionUpdate::Confirmed
            }
            RecognizerEventKind::Result(text) => SessionUpdate::Transcript(text),
            RecognizerEventKind::Error(code) => {
                warn!(generation = %self.generation, %code, "recognition error");
                self.transition_to(SessionState::Error);
                if let Some(recognizer) = self.recognizer.as_mut() {
                    recognizer.stop();
                }
                self.transition_to(SessionState::Idle);
                SessionUpdate::Failed(VoiceError::RecognitionError { code })
            }
            RecognizerEventKind::Ended => {
                info!(generation = %self.generation, "recognizer ended");
                self.transition_to(SessionState::Idle);
                SessionUpdate::Ended
            }
        }
    }

    /// Perform a state transition
    fn transition_to(&mut self, new_state: SessionState) {
        let old_state = self.state;
        let duration_ms = self
            .listening_since
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        info!(
            from = %old_state,
            to = %new_state,
            generation = %self.generation,
            duration_ms,
            "session transition"
        );

        self.state = new_state;
        self.listening_since = match new_state {
            SessionState::Listening => Some(Instant::now()),
            _ => None,
        };
    }
}
