//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::control::{CommandInfo, ControlAction, ControlStatus};
use crate::events::VoiceEvent;

/// Largest frame either side will accept
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from UI to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current status snapshot
    GetStatus,

    /// Start or stop listening
    ToggleListening,

    /// Mute or unmute spoken feedback
    ToggleMute,

    /// Request the command vocabulary
    ListCommands,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to voice events
    Subscribe,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Action queued for the voice navigator
    Accepted { action: ControlAction },

    /// Command vocabulary in registry order
    Commands { commands: Vec<CommandInfo> },

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Push message from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Push {
    /// Voice event occurred
    Event { event: VoiceEvent },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Uptime in seconds
    pub uptime_secs: u64,

    #[serde(flatten)]
    pub control: ControlStatus,
}

impl DaemonStatus {
    pub fn new(control: ControlStatus) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: 0,
            control,
        }
    }

    /// Fold a voice event into the snapshot
    pub fn apply(&mut self, event: &VoiceEvent) {
        match event {
            VoiceEvent::SessionStateChanged { state } => self.control.state = *state,
            VoiceEvent::TranscriptUpdated { text } => self.control.transcript = text.clone(),
            VoiceEvent::MuteChanged { muted } => self.control.muted = *muted,
            VoiceEvent::CommandMatched { .. }
            | VoiceEvent::Navigated { .. }
            | VoiceEvent::Notification(_) => {}
        }
    }
}
