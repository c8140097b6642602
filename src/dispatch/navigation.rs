//! Command to tab mapping
//!
//! The matcher may deliver the same command several times in quick
//! succession, so dispatch is idempotent: a repeat of the last command
//! inside the repeat window is dropped, and switching to the tab that is
//! already active emits nothing.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::commands::CommandId;
use crate::events::{Notification, VoiceEvent};

/// Application tabs reachable by voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    Home,
    Health,
    Emergency,
    Social,
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tab::Home => write!(f, "home"),
            Tab::Health => write!(f, "health"),
            Tab::Emergency => write!(f, "emergency"),
            Tab::Social => write!(f, "social"),
        }
    }
}

impl From<CommandId> for Tab {
    fn from(command: CommandId) -> Self {
        match command {
            CommandId::Home => Tab::Home,
            CommandId::Health | CommandId::Medication => Tab::Health,
            CommandId::Emergency | CommandId::Help | CommandId::CallEmergency => Tab::Emergency,
            CommandId::Social | CommandId::Contacts => Tab::Social,
        }
    }
}

pub struct NavigationDispatcher {
    active_tab: Tab,
    last_command: Option<(CommandId, Instant)>,
    repeat_window: Duration,
    event_tx: broadcast::Sender<VoiceEvent>,
}

impl NavigationDispatcher {
    pub fn new(repeat_window: Duration, event_tx: broadcast::Sender<VoiceEvent>) -> Self {
        Self {
            active_tab: Tab::default(),
            last_command: None,
            repeat_window,
            event_tx,
        }
    }

    /// Handle one matched command
    pub fn dispatch(&mut self, command: CommandId) {
        let now = Instant::now();
        if let Some((last, at)) = self.last_command {
            if last == command && now.duration_since(at) < self.repeat_window {
                debug!(%command, "suppressing repeated command");
                return;
            }
        }
        self.last_command = Some((command, now));

        self.navigate(Tab::from(command));

        if command == CommandId::CallEmergency {
            info!("emergency call requested (simulated)");
            self.emit(VoiceEvent::Notification(Notification::destructive(
                "Emergency Simulation",
                "In a real application, this would initiate an emergency call to 911.",
            )));
        }
    }

    fn navigate(&mut self, tab: Tab) {
        if tab == self.active_tab {
            debug!(%tab, "tab already active");
            return;
        }

        info!(from = %self.active_tab, to = %tab, "navigating");
        self.active_tab = tab;
        self.emit(VoiceEvent::Navigated { tab });
    }

    fn emit(&self, event: VoiceEvent) {
        debug!(%event, "emitting dispatch event");
        let _ = self.event_tx.send(event);
    }
}
