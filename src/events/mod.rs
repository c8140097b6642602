//! Events emitted by the voice navigation core
//!
//! Every state change the UI needs to reflect is pushed as a `VoiceEvent`
//! on the broadcast bus, so subscribers never have to poll.

use serde::{Deserialize, Serialize};

use crate::commands::CommandId;
use crate::dispatch::Tab;
use crate::error::VoiceError;
use crate::session::SessionState;

/// Events emitted while handling user actions and recognizer events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceEvent {
    /// Recognition session moved to a new state
    SessionStateChanged { state: SessionState },

    /// Latest recognized text for the current utterance
    TranscriptUpdated { text: String },

    /// A command phrase was found in the transcript
    CommandMatched { command: CommandId },

    /// Spoken feedback was muted or unmuted
    MuteChanged { muted: bool },

    /// The dispatcher switched the active tab
    Navigated { tab: Tab },

    /// Discrete, dismissible message for the user
    Notification(Notification),
}

impl std::fmt::Display for VoiceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoiceEvent::SessionStateChanged { state } => write!(f, "SESSION_STATE ({})", state),
            VoiceEvent::TranscriptUpdated { text } => write!(f, "TRANSCRIPT ({:?})", text),
            VoiceEvent::CommandMatched { command } => write!(f, "COMMAND_MATCHED ({})", command),
            VoiceEvent::MuteChanged { muted } => write!(f, "MUTE_CHANGED ({})", muted),
            VoiceEvent::Navigated { tab } => write!(f, "NAVIGATED ({})", tab),
            VoiceEvent::Notification(n) => write!(f, "NOTIFICATION ({})", n.title),
        }
    }
}

/// How prominently a notification should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Destructive,
}

/// User-visible notification; presentation is up to the UI shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub severity: Severity,
}

impl Notification {
    pub fn info(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            severity: Severity::Info,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: Some(description.into()),
            severity: Severity::Destructive,
        }
    }

    /// Build the notification shown for a session error
    pub fn from_error(err: &VoiceError) -> Self {
        let title = match err {
            VoiceError::CapabilityUnavailable => "Speech Recognition Not Available",
            VoiceError::StartFailure(_) => "Couldn't start voice recognition",
            VoiceError::RecognitionError { .. } => "Voice recognition stopped",
            VoiceError::Synthesis(_) => "Voice feedback unavailable",
            VoiceError::Channel(_) => "Voice navigation failed",
        };
        Self::destructive(title, err.user_message())
    }
}
